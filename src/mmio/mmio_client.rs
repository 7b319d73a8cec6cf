//! This module provides the register access layer used by the PUF engine.
//!
//! The [`RegisterAccess`] trait is the only thing the engines require from the platform: a
//! 32-bit read and a 32-bit write at an absolute address. Everything else (labelled register
//! access, read-modify-write, polling with timeout) is built on top of these two primitives.
//!
use crate::{error::*, utils::open_channel};
use std::{
    fmt::Debug,
    fs::File,
    io,
    os::unix::fs::FileExt,
    thread::sleep,
    time::{Duration, Instant},
};

/// Interval between two reads of a polled status register.
const POLL_INTERVAL: Duration = Duration::from_micros(1);

/// The [`RegisterAccess`] trait defines the interface implemented by every register backend.
pub trait RegisterAccess {
    /// Read a 32-bit value at an absolute address.
    fn read_u32(&self, addr: u64) -> Result<u32>;
    /// Write a 32-bit value at an absolute address.
    fn write_u32(&self, addr: u64, data: u32) -> Result<()>;

    /// Read a 32-bit value at a given base address and offset.
    ///
    /// # Arguments
    ///
    /// * `base_address`: the base address of the register block
    /// * `offset`: an enum which represent the specific offset for given `base_address`.
    ///
    /// returns: u32
    fn read_reg<T: Debug + Into<u64> + Copy>(&self, base_address: u64, offset: T) -> Result<u32> {
        let res = self.read_u32(base_address + offset.into())?;
        log::debug!("Getting data [ {:#X?} ] from label {:?}", res, offset);
        Ok(res)
    }

    /// Write a 32-bit value at a given base address and offset.
    fn write_reg<T: Debug + Into<u64> + Copy>(
        &self,
        base_address: u64,
        offset: T,
        data: u32,
    ) -> Result<()> {
        self.write_u32(base_address + offset.into(), data)?;
        log::debug!("Successfully set data [ {:#X?} ] to label {:?}", data, offset);
        Ok(())
    }

    /// Update only the bits selected by `mask` with the matching bits of `data`.
    fn rmw_reg<T: Debug + Into<u64> + Copy>(
        &self,
        base_address: u64,
        offset: T,
        mask: u32,
        data: u32,
    ) -> Result<()> {
        let old = self.read_reg(base_address, offset)?;
        self.write_reg(base_address, offset, (old & !mask) | (data & mask))
    }

    /// Poll a register until `(value & mask) == expected` or until `timeout` elapses.
    ///
    /// The register is always read at least once. Returns `false` on timeout, the caller
    /// decides which error this maps to.
    fn wait_for_event<T: Debug + Into<u64> + Copy>(
        &self,
        base_address: u64,
        offset: T,
        mask: u32,
        expected: u32,
        timeout: Duration,
    ) -> Result<bool> {
        let start = Instant::now();
        loop {
            let value = self.read_u32(base_address + offset.into())?;
            if value & mask == expected {
                return Ok(true);
            }
            if start.elapsed() >= timeout {
                log::debug!(
                    "Timeout waiting for {:#X?} in label {:?}, last value {:#X?}",
                    expected,
                    offset,
                    value
                );
                return Ok(false);
            }
            sleep(POLL_INTERVAL);
        }
    }
}

/// The [`DevMemClient`] gives access to physical registers through a memory file
/// (`/dev/mem`, a UIO node or a PCIe BAR resource file) opened with synchronous I/O.
pub struct DevMemClient {
    /// Read and write file descriptor of the register space.
    pub ctrl: File,
    /// Address of the first byte of `ctrl`, subtracted from every absolute address.
    pub window_base: u64,
}

impl DevMemClient {
    /// The function creates a new instance of [`DevMemClient`].
    ///
    /// # Arguments
    ///
    /// * `path` - path of the register file.
    /// * `window_base` - physical address mapped at file offset zero, `0` for `/dev/mem`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use xlnx_puf_bbm::mmio::DevMemClient;
    ///
    /// let regs = DevMemClient::new("/dev/mem", 0).unwrap();
    /// ```
    pub fn new(path: &str, window_base: u64) -> Result<Self> {
        let ctrl = open_channel(path).map_err(|e| MmioError::ChannelError {
            path: path.to_string(),
            source: e,
        })?;
        Ok(DevMemClient { ctrl, window_base })
    }

    fn file_offset(&self, addr: u64) -> io::Result<u64> {
        addr.checked_sub(self.window_base).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("address {:#X} is below the register window", addr),
            )
        })
    }
}

impl RegisterAccess for DevMemClient {
    fn read_u32(&self, addr: u64) -> Result<u32> {
        let mut word = [0, 0, 0, 0];
        self.file_offset(addr)
            .and_then(|offset| self.ctrl.read_exact_at(&mut word, offset))
            .map_err(|e| MmioError::ReadError {
                offset: format!("{:#X?}", addr),
                source: e,
            })?;
        Ok(u32::from_le_bytes(word))
    }

    fn write_u32(&self, addr: u64, data: u32) -> Result<()> {
        self.file_offset(addr)
            .and_then(|offset| self.ctrl.write_all_at(&data.to_le_bytes(), offset))
            .map_err(|e| MmioError::WriteError {
                offset: format!("{:#X?}", addr),
                source: e,
            })
    }
}
