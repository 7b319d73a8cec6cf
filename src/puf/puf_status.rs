use crate::error::PufResult;
use packed_struct::prelude::*;

/// A trait for decoding a 32-bit hardware register into named fields.
pub trait RegisterFields: Sized {
    /// Parses the raw register value.
    fn parse_register(value: u32) -> PufResult<Self>;
    /// Print all fields in user friendly mode.
    fn debug_information(&self);
}

/// Bits of the `PUF_STATUS` register.
#[derive(PackedStruct, Debug, Clone, Copy, PartialEq, Eq)]
#[packed_struct(bit_numbering = "msb0")]
pub struct PufStatus {
    #[packed_field(bits = "0")]
    pub syndrome_word_rdy: bool,
    #[packed_field(bits = "1")]
    pub id_zero: bool,
    #[packed_field(bits = "2")]
    pub id_rdy: bool,
    #[packed_field(bits = "3")]
    pub key_rdy: bool,
    #[packed_field(bits = "4..=29", endian = "lsb")]
    pub reserved_0: u32,
    #[packed_field(bits = "30")]
    pub puf_done: bool,
    #[packed_field(bits = "31")]
    pub reserved_1: bool,
}

impl RegisterFields for PufStatus {
    fn parse_register(value: u32) -> PufResult<Self> {
        let buf = value.reverse_bits().to_be_bytes();
        Ok(PufStatus::unpack(&buf)?)
    }

    fn debug_information(&self) {
        log::debug!("Syndrome word ready: {:?}", self.syndrome_word_rdy);
        log::debug!("ID zero: {:?}", self.id_zero);
        log::debug!("ID ready: {:?}", self.id_rdy);
        log::debug!("Key ready: {:?}", self.key_rdy);
        log::debug!("PUF done: {:?}", self.puf_done);
    }
}

/// PUF related bits of the eFuse cache `SECURITY_CONTROL` register.
#[derive(PackedStruct, Debug, Clone, Copy, PartialEq, Eq)]
#[packed_struct(bit_numbering = "msb0")]
pub struct SecurityControl {
    #[packed_field(bits = "0..=15", endian = "lsb")]
    pub reserved_0: u16,
    #[packed_field(bits = "16")]
    pub puf_syn_lk: bool,
    #[packed_field(bits = "17")]
    pub reserved_1: bool,
    #[packed_field(bits = "18")]
    pub puf_dis: bool,
    #[packed_field(bits = "19..=31", endian = "lsb")]
    pub reserved_2: u16,
}

impl RegisterFields for SecurityControl {
    fn parse_register(value: u32) -> PufResult<Self> {
        let buf = value.reverse_bits().to_be_bytes();
        Ok(SecurityControl::unpack(&buf)?)
    }

    fn debug_information(&self) {
        log::debug!("PUF syndrome locked: {:?}", self.puf_syn_lk);
        log::debug!("PUF disabled: {:?}", self.puf_dis);
    }
}

/// The eFuse cache `PUF_ECC_PUF_CTRL` register.
#[derive(PackedStruct, Debug, Clone, Copy, PartialEq, Eq)]
#[packed_struct(bit_numbering = "msb0")]
pub struct PufEccCtrl {
    #[packed_field(bits = "0..=28", endian = "lsb")]
    pub reserved_0: u32,
    #[packed_field(bits = "29")]
    pub regis_dis: bool,
    #[packed_field(bits = "30")]
    pub hd_invld: bool,
    #[packed_field(bits = "31")]
    pub regen_dis: bool,
}

impl RegisterFields for PufEccCtrl {
    fn parse_register(value: u32) -> PufResult<Self> {
        let buf = value.reverse_bits().to_be_bytes();
        Ok(PufEccCtrl::unpack(&buf)?)
    }

    fn debug_information(&self) {
        log::debug!("Registration disabled: {:?}", self.regis_dis);
        log::debug!("Helper data invalidated: {:?}", self.hd_invld);
        log::debug!("Regeneration disabled: {:?}", self.regen_dis);
    }
}

/// PUF eFuse secure control bits as seen from software.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PufSecCtrlBits {
    pub puf_dis: bool,
    pub regen_dis: bool,
    pub hd_invalid: bool,
    pub syn_lock: bool,
    /// Always `false` on platforms without a registration disable fuse.
    pub regis_dis: bool,
}

impl PufSecCtrlBits {
    pub(crate) fn from_registers(
        sec_ctrl: &SecurityControl,
        ecc_ctrl: &PufEccCtrl,
        has_regis_dis: bool,
    ) -> Self {
        PufSecCtrlBits {
            puf_dis: sec_ctrl.puf_dis,
            regen_dis: ecc_ctrl.regen_dis,
            hd_invalid: ecc_ctrl.hd_invld,
            syn_lock: sec_ctrl.puf_syn_lk,
            regis_dis: has_regis_dis && ecc_ctrl.regis_dis,
        }
    }
}
