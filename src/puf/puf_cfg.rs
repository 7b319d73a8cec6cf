use crate::error::PufError;
use std::{convert::TryFrom, time::Duration};
use strum_macros::{Display, EnumString};

use super::puf_hw_code::{CFG1_INIT_VAL_12K, CFG1_INIT_VAL_4K};

pub const PUF_4K_SYN_LEN_IN_WORDS: usize = 140;
pub const PUF_12K_SYN_LEN_IN_WORDS: usize = 350;
pub const MAX_SYN_LEN_IN_WORDS: usize = PUF_12K_SYN_LEN_IN_WORDS;
pub const PUF_ID_LEN_IN_WORDS: usize = 8;
pub const EFUSE_TRIM_SYN_DATA_IN_WORDS: usize = 127;
/// Syndrome area of the boot header helper data, in words.
pub const BOOT_HDR_SYN_LEN_IN_WORDS: usize = 384;
/// Boot header helper data: syndrome area followed by CHASH and AUX.
pub const BOOT_HDR_HD_LEN_IN_WORDS: usize = BOOT_HDR_SYN_LEN_IN_WORDS + 2;

/// Shutter value used by the boot ROM, global variation filter enabled.
pub const PUF_SHUTTER_VALUE: u32 = 0x8100_0100;
pub const PUF_STATUS_WAIT_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, PartialEq, Eq, Clone, Copy, EnumString, Display)]
pub enum Platform {
    Versal,
    VersalNet,
}

/// Size of the generated syndrome.
#[derive(Debug, PartialEq, Eq, Clone, Copy, EnumString, Display)]
pub enum RegMode {
    #[strum(serialize = "4K")]
    Mode4K = 0,
    #[strum(serialize = "12K")]
    Mode12K = 1,
}

impl RegMode {
    pub fn syndrome_len_in_words(&self) -> usize {
        match self {
            RegMode::Mode4K => PUF_4K_SYN_LEN_IN_WORDS,
            RegMode::Mode12K => PUF_12K_SYN_LEN_IN_WORDS,
        }
    }

    pub(crate) fn cfg1_init_value(&self) -> u32 {
        match self {
            RegMode::Mode4K => CFG1_INIT_VAL_4K,
            RegMode::Mode12K => CFG1_INIT_VAL_12K,
        }
    }
}

impl TryFrom<u32> for RegMode {
    type Error = PufError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RegMode::Mode4K),
            1 => Ok(RegMode::Mode12K),
            _ => Err(PufError::InvalidSyndromeMode),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, EnumString, Display)]
pub enum PufOperation {
    Registration = 0,
    RegenOnDemand = 1,
    RegenIdOnly = 2,
}

impl TryFrom<u32> for PufOperation {
    type Error = PufError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PufOperation::Registration),
            1 => Ok(PufOperation::RegenOnDemand),
            2 => Ok(PufOperation::RegenIdOnly),
            _ => Err(PufError::InvalidPufOperation),
        }
    }
}

/// Source of the helper data used by regeneration.
#[derive(Debug, PartialEq, Eq, Clone, Copy, EnumString, Display)]
pub enum ReadOption {
    FromRam = 0,
    FromEfuseCache = 1,
}

impl TryFrom<u32> for ReadOption {
    type Error = PufError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ReadOption::FromRam),
            1 => Ok(ReadOption::FromEfuseCache),
            _ => Err(PufError::InvalidReadHdInput),
        }
    }
}

/// The [`PufConfig`] holds base addresses and platform features of the PUF controller.
#[derive(Copy, Clone, Debug)]
pub struct PufConfig {
    pub pmc_global_baseaddr: u64,
    pub efuse_cache_baseaddr: u64,
    pub efuse_ctrl_baseaddr: u64,
    /// Absolute address of the trimmed syndrome inside the eFuse cache.
    pub efuse_syn_addr: u32,
    pub status_wait_timeout: Duration,
    /// Registration disable fuse is present.
    pub has_regis_dis: bool,
    /// `PUF_RO_SWAP` register is present.
    pub has_ro_swap: bool,
    /// Bit 31 of the shutter value must agree with the global variation filter option.
    pub check_shutter_gvf: bool,
    /// The ring oscillator must run at 320 MHz while the PUF is active.
    pub manage_iro_freq: bool,
}

impl PufConfig {
    pub fn puf_cfg(platform: Platform) -> Self {
        match platform {
            Platform::Versal => versal_cfg(),
            Platform::VersalNet => versal_net_cfg(),
        }
    }

    pub fn with_status_wait_timeout(mut self, timeout: Duration) -> Self {
        self.status_wait_timeout = timeout;
        self
    }
}

fn versal_cfg() -> PufConfig {
    PufConfig {
        pmc_global_baseaddr: 0xF111_0000,
        efuse_cache_baseaddr: 0xF125_0000,
        efuse_ctrl_baseaddr: 0xF124_0000,
        efuse_syn_addr: 0xF125_0A04,
        status_wait_timeout: PUF_STATUS_WAIT_TIMEOUT,
        has_regis_dis: false,
        has_ro_swap: false,
        check_shutter_gvf: true,
        manage_iro_freq: true,
    }
}

fn versal_net_cfg() -> PufConfig {
    PufConfig {
        pmc_global_baseaddr: 0xF111_0000,
        efuse_cache_baseaddr: 0xF125_0000,
        efuse_ctrl_baseaddr: 0xF124_0000,
        efuse_syn_addr: 0xF125_0A04,
        status_wait_timeout: PUF_STATUS_WAIT_TIMEOUT,
        has_regis_dis: true,
        has_ro_swap: true,
        check_shutter_gvf: true,
        manage_iro_freq: false,
    }
}

/// Caller owned state of one PUF operation: inputs are set before the call,
/// outputs are filled by the engine.
#[derive(Debug, Clone)]
pub struct PufSession {
    // inputs
    pub reg_mode: RegMode,
    pub operation: PufOperation,
    pub global_var_filter: bool,
    pub shutter_value: u32,
    pub read_option: ReadOption,
    /// Address of the syndrome data in RAM, used by regeneration from RAM.
    pub syndrome_addr: u32,
    pub ro_swap: u32,

    // outputs, `chash` and `aux` are also inputs of regeneration from RAM
    pub syndrome_data: [u32; MAX_SYN_LEN_IN_WORDS],
    pub chash: u32,
    pub aux: u32,
    pub puf_id: [u32; PUF_ID_LEN_IN_WORDS],
    pub efuse_syn_data: [u32; EFUSE_TRIM_SYN_DATA_IN_WORDS],
}

impl PufSession {
    pub fn new(operation: PufOperation) -> Self {
        PufSession {
            reg_mode: RegMode::Mode4K,
            operation,
            global_var_filter: true,
            shutter_value: PUF_SHUTTER_VALUE,
            read_option: ReadOption::FromRam,
            syndrome_addr: 0,
            ro_swap: 0,
            syndrome_data: [0; MAX_SYN_LEN_IN_WORDS],
            chash: 0,
            aux: 0,
            puf_id: [0; PUF_ID_LEN_IN_WORDS],
            efuse_syn_data: [0; EFUSE_TRIM_SYN_DATA_IN_WORDS],
        }
    }

    /// The syndrome words produced for the current mode.
    pub fn syndrome(&self) -> &[u32] {
        &self.syndrome_data[..self.reg_mode.syndrome_len_in_words()]
    }
}

impl Default for PufSession {
    fn default() -> Self {
        PufSession::new(PufOperation::Registration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn session_codes() {
        assert_eq!(RegMode::try_from(1).unwrap(), RegMode::Mode12K);
        assert!(matches!(
            RegMode::try_from(2),
            Err(PufError::InvalidSyndromeMode)
        ));
        assert!(matches!(
            PufOperation::try_from(3),
            Err(PufError::InvalidPufOperation)
        ));
        assert!(matches!(
            ReadOption::try_from(7),
            Err(PufError::InvalidReadHdInput)
        ));
        assert_eq!(RegMode::from_str("12K").unwrap(), RegMode::Mode12K);
        assert_eq!(Platform::from_str("VersalNet").unwrap(), Platform::VersalNet);
    }

    #[test]
    fn default_session() {
        let session = PufSession::default();
        assert_eq!(session.shutter_value >> 31, 1);
        assert!(session.global_var_filter);
        assert_eq!(session.syndrome().len(), PUF_4K_SYN_LEN_IN_WORDS);
    }
}
