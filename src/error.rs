use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MmioError>;
pub type PufResult<T> = std::result::Result<T, PufError>;
pub type NandResult<T> = std::result::Result<T, NandError>;

#[derive(Error, Debug)]
pub enum MmioError {
    #[error("failed to write data in offset {:?}", offset)]
    WriteError {
        offset: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to read data from offset {:?}", offset)]
    ReadError {
        offset: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to open register channel {:?}", path)]
    ChannelError {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Errors reported by the PUF engine.
///
/// Every variant is terminal for the current call, nothing is retried internally.
#[derive(Error, Debug)]
pub enum PufError {
    #[error("invalid PUF input parameter")]
    InvalidParam,
    #[error("invalid syndrome mode for the requested operation")]
    InvalidSyndromeMode,
    #[error("timeout while waiting for a syndrome word")]
    SyndromeWordWaitTimeout,
    #[error("timeout while waiting for PUF done after registration")]
    PufDoneWaitTimeout,
    #[error("PUF registration is disabled by eFuse")]
    RegistrationInvalid,
    #[error("MSB of the shutter value does not match the global variation filter option")]
    ShutterGvfMismatch,
    #[error("PUF helper data (CHASH/AUX) is not provided")]
    ChashNotProgrammed,
    #[error("timeout while waiting for PUF done during regeneration")]
    PufStatusDoneTimeout,
    #[error("invalid PUF regeneration type")]
    InvalidRegenerationType,
    #[error("invalid PUF operation")]
    InvalidPufOperation,
    #[error("PUF regeneration is disabled by eFuse")]
    RegenerationInvalid,
    #[error("PUF helper data stored in eFuse is invalidated")]
    RegenPufHdInvalid,
    #[error("invalid helper data read option")]
    InvalidReadHdInput,
    #[error("PUF done but key ready bit is not set")]
    PufDoneKeyIdNotReady,
    #[error("PUF done but ID ready bit is not set")]
    PufDoneIdNotReady,
    #[error("timeout while clearing PUF ID")]
    PufIdZeroTimeout,
    #[error("IRO frequency read back does not match the written value")]
    IroFreqWriteMismatch,
    #[error(transparent)]
    Mmio(#[from] MmioError),
    #[error("failed to decode register: {0:?}")]
    Packing(packed_struct::PackingError),
}

impl From<packed_struct::PackingError> for PufError {
    fn from(err: packed_struct::PackingError) -> Self {
        PufError::Packing(err)
    }
}

impl PufError {
    /// Numeric status code as reported by the PMC firmware for the same condition.
    pub fn code(&self) -> u32 {
        match self {
            PufError::InvalidParam => 0x02,
            PufError::InvalidSyndromeMode => 0x03,
            PufError::SyndromeWordWaitTimeout => 0x04,
            PufError::PufDoneWaitTimeout => 0x07,
            PufError::RegistrationInvalid => 0x08,
            PufError::ShutterGvfMismatch => 0x09,
            PufError::ChashNotProgrammed => 0x10,
            PufError::PufStatusDoneTimeout => 0x11,
            PufError::InvalidRegenerationType => 0x12,
            PufError::InvalidPufOperation => 0x13,
            PufError::RegenerationInvalid => 0x14,
            PufError::RegenPufHdInvalid => 0x15,
            PufError::InvalidReadHdInput => 0x16,
            PufError::PufDoneKeyIdNotReady => 0x17,
            PufError::PufDoneIdNotReady => 0x18,
            PufError::PufIdZeroTimeout => 0x19,
            PufError::IroFreqWriteMismatch => 0x1A,
            PufError::Mmio(_) | PufError::Packing(_) => 0x01,
        }
    }
}

#[derive(Error, Debug)]
pub enum NandError {
    #[error("failed to read {len} bytes at flash offset {offset:#X}")]
    ReadError {
        offset: u64,
        len: usize,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {len} bytes at flash offset {offset:#X}")]
    WriteError {
        offset: u64,
        len: usize,
        #[source]
        source: io::Error,
    },
    #[error("failed to erase block {block} of target {target}")]
    EraseError {
        target: u32,
        block: u32,
        #[source]
        source: io::Error,
    },
    #[error("failed to read spare bytes of page {page}")]
    SpareReadError {
        page: u32,
        #[source]
        source: io::Error,
    },
    #[error("failed to write spare bytes of page {page}")]
    SpareWriteError {
        page: u32,
        #[source]
        source: io::Error,
    },
    #[error("no bad block table found on target {target}")]
    BbtNotFound { target: u32 },
    #[error("no free block left to store the bad block table on target {target}")]
    NoFreeBbtBlock { target: u32 },
    #[error("block {block} is outside of the flash device")]
    InvalidBlock { block: u32 },
    #[error("invalid flash geometry: {0}")]
    InvalidGeometry(String),
}
