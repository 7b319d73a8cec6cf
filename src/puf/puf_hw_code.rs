//! This module provides offsets and bit definitions of the PUF controller and of the eFuse
//! cache/control blocks consulted by it.
#![allow(non_camel_case_types)]
use strum_macros::EnumIter;

/// PUF controller registers inside the PMC global register block.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PMC_GLOBAL_ADDR {
    GLOBAL_CNTRL = 0x0,
    // CPU2HIF
    PUF_CMD = 0x40000,
    PUF_CFG0 = 0x40004,
    PUF_CFG1 = 0x40008,
    PUF_SHUT = 0x4000C,
    PUF_SYN_ADDR = 0x40020,
    PUF_CLEAR = 0x4002C,
    PUF_RO_SWAP = 0x40050,
    // HIF2CPU
    PUF_STATUS = 0x40010,
    PUF_WORD = 0x40018,
    // Written before regeneration, latched after registration
    PUF_AUX = 0x40024,
    PUF_CHASH = 0x40028,
    PUF_ID_0 = 0x40030,
}

impl From<PMC_GLOBAL_ADDR> for u64 {
    fn from(addr: PMC_GLOBAL_ADDR) -> Self {
        addr as u64
    }
}

/// Read-only mirror of the programmed eFuses.
#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter)]
pub enum EFUSE_CACHE_ADDR {
    PUF_ECC_PUF_CTRL = 0xA4,
    SECURITY_CONTROL = 0xAC,
}

impl From<EFUSE_CACHE_ADDR> for u64 {
    fn from(addr: EFUSE_CACHE_ADDR) -> Self {
        addr as u64
    }
}

/// eFuse controller registers, used here only for the ring oscillator trim select.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EFUSE_CTRL_ADDR {
    WR_LOCK = 0x0,
    ANLG_OSC_SW_1LP = 0x60,
}

impl From<EFUSE_CTRL_ADDR> for u64 {
    fn from(addr: EFUSE_CTRL_ADDR) -> Self {
        addr as u64
    }
}

// PUF_CMD
pub(crate) const CMD_REGISTRATION: u32 = 0x1;
pub(crate) const CMD_REGEN_ON_DEMAND: u32 = 0x2;
pub(crate) const CMD_REGEN_ID_ONLY: u32 = 0x3;

// PUF_CFG0
pub(crate) const CFG0_GLOBAL_FILTER_ENABLE: u32 = 0x1;
pub(crate) const CFG0_HASH_SEL: u32 = 0x2;

// PUF_CFG1
pub(crate) const CFG1_INIT_VAL_4K: u32 = 0x0C23_0090;
pub(crate) const CFG1_INIT_VAL_12K: u32 = 0x0023_0150;

// PUF_STATUS
pub(crate) const STATUS_SYNDROME_WORD_RDY: u32 = 0x1;
pub(crate) const STATUS_ID_ZERO: u32 = 0x2;
pub(crate) const STATUS_PUF_DONE: u32 = 0x4000_0000;

// PUF_CLEAR
pub(crate) const CLEAR_ID: u32 = 0x1;

// PUF_AUX, value latched after registration
pub(crate) const AUX_MASK_VALUE: u32 = 0x0FFF_FFF0;
pub(crate) const AUX_SHIFT_VALUE: u32 = 4;

// GLOBAL_CNTRL
pub(crate) const SLVERR_ENABLE_MASK: u32 = 0x2;

// PUF_SHUT
pub(crate) const SHUT_GLB_VAR_FLTR_ENABLED_SHIFT: u32 = 31;

// EFUSE_CTRL
pub(crate) const EFUSE_CTRL_WR_UNLOCK_VAL: u32 = 0xDF0D;
pub(crate) const EFUSE_CTRL_WR_LOCK_VAL: u32 = 0x1;
pub(crate) const IRO_TRIM_FUSE_SEL_BIT: u32 = 0x1;
pub(crate) const IRO_FREQ_320MHZ: u32 = 0x1;
