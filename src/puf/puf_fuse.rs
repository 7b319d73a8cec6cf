//! Conversion of a registered 4K syndrome into the layouts consumed outside of the PUF:
//! the trimmed eFuse image and the boot header helper data.
//!
use super::puf_cfg::*;
use crate::{
    error::{PufError, PufResult},
    utils::u32_arr_to_u8_vec,
};

const TRIM_MASK: u32 = 0xFFFF_F000;
/// Low nibble of the last eFuse word is not part of the syndrome.
const LAST_WORD_MASK: u32 = 0xFFFF_FFF0;
const SUB_BLOCKS: usize = 5;
const LAST_SUB_BLOCK: usize = SUB_BLOCKS - 1;

/// Trims the 4K syndrome of `session` and stores it in `session.efuse_syn_data`.
///
/// Every fourth syndrome word carries only 20 meaningful bits, the trimmed stream drops the low
/// 12 bits of these words and packs the rest without gaps: 140 words become 127.
pub fn generate_fuse_format(session: &mut PufSession) -> PufResult<()> {
    if session.reg_mode != RegMode::Mode4K {
        log::error!("Only 4K syndrome can be programmed into eFuses");
        return Err(PufError::InvalidSyndromeMode);
    }
    session.efuse_syn_data = trim_syndrome(&session.syndrome_data[..PUF_4K_SYN_LEN_IN_WORDS]);
    log::debug!(
        "Trimmed {} syndrome words into {} eFuse words",
        PUF_4K_SYN_LEN_IN_WORDS,
        EFUSE_TRIM_SYN_DATA_IN_WORDS
    );
    Ok(())
}

fn trim_syndrome(syn: &[u32]) -> [u32; EFUSE_TRIM_SYN_DATA_IN_WORDS] {
    let mut out = [0u32; EFUSE_TRIM_SYN_DATA_IN_WORDS];
    let mut s = 0;
    let mut d = 0;

    for idx in 0..SUB_BLOCKS {
        for sub in 0..4 {
            out[d] = if sub == 3 {
                (syn[s] & TRIM_MASK) | (syn[s + 1] >> 20)
            } else {
                syn[s]
            };
            s += 1;
            d += 1;
        }
        for sub in 0..4 {
            out[d] = if sub == 3 {
                ((syn[s] & TRIM_MASK) << 12) | (syn[s + 1] >> 8)
            } else {
                (syn[s] << 12) | (syn[s + 1] >> 20)
            };
            s += 1;
            d += 1;
        }
        for sub in 0..3 {
            out[d] = if sub == 2 {
                let word = (syn[s] << 24) | ((syn[s + 1] & TRIM_MASK) >> 8);
                if d < EFUSE_TRIM_SYN_DATA_IN_WORDS - 1 {
                    word | (syn[s + 2] >> 28)
                } else {
                    word
                }
            } else {
                (syn[s] << 24) | (syn[s + 1] >> 8)
            };
            s += 1;
            d += 1;
        }
        s += 1;

        if idx == LAST_SUB_BLOCK {
            break;
        }

        for sub in 0..4 {
            out[d] = if sub == 3 {
                ((syn[s] & TRIM_MASK) << 4) | (syn[s + 1] >> 16)
            } else {
                (syn[s] << 4) | (syn[s + 1] >> 28)
            };
            s += 1;
            d += 1;
        }
        for sub in 0..4 {
            out[d] = if sub == 3 {
                ((syn[s] & TRIM_MASK) << 16) | (syn[s + 1] >> 4)
            } else {
                (syn[s] << 16) | (syn[s + 1] >> 16)
            };
            s += 1;
            d += 1;
        }
        for sub in 0..3 {
            out[d] = if sub == 2 {
                (syn[s] << 28) | ((syn[s + 1] & TRIM_MASK) >> 4) | (syn[s + 2] >> 24)
            } else {
                (syn[s] << 28) | (syn[s + 1] >> 4)
            };
            s += 1;
            d += 1;
        }
        s += 1;
        for sub in 0..4 {
            out[d] = if sub == 3 {
                ((syn[s] & TRIM_MASK) << 8) | (syn[s + 1] >> 12)
            } else {
                (syn[s] << 8) | (syn[s + 1] >> 24)
            };
            s += 1;
            d += 1;
        }
        for sub in 0..3 {
            out[d] = if sub == 2 {
                (syn[s] << 20) | ((syn[s + 1] & TRIM_MASK) >> 12)
            } else {
                (syn[s] << 20) | (syn[s + 1] >> 12)
            };
            s += 1;
            d += 1;
        }
        s += 1;
    }
    debug_assert_eq!(s, PUF_4K_SYN_LEN_IN_WORDS);
    debug_assert_eq!(d, EFUSE_TRIM_SYN_DATA_IN_WORDS);

    out[EFUSE_TRIM_SYN_DATA_IN_WORDS - 1] &= LAST_WORD_MASK;
    out
}

/// Helper data in the layout expected by the boot header: syndrome zero padded to
/// [`BOOT_HDR_SYN_LEN_IN_WORDS`] words, CHASH, then AUX shifted back into bits 4..28.
pub fn boot_header_helper_data(session: &PufSession) -> [u32; BOOT_HDR_HD_LEN_IN_WORDS] {
    let mut hd = [0u32; BOOT_HDR_HD_LEN_IN_WORDS];
    let syn = session.syndrome();
    hd[..syn.len()].copy_from_slice(syn);
    hd[BOOT_HDR_SYN_LEN_IN_WORDS] = session.chash;
    hd[BOOT_HDR_SYN_LEN_IN_WORDS + 1] = session.aux << 4;
    hd
}

/// The record programmed into the PUF eFuses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EfuseHelperData {
    pub syn_data: [u32; EFUSE_TRIM_SYN_DATA_IN_WORDS],
    pub chash: u32,
    pub aux: u32,
}

impl EfuseHelperData {
    /// Trims the syndrome of `session` and collects it with CHASH and AUX.
    pub fn from_session(session: &mut PufSession) -> PufResult<Self> {
        generate_fuse_format(session)?;
        Ok(EfuseHelperData {
            syn_data: session.efuse_syn_data,
            chash: session.chash,
            aux: session.aux,
        })
    }

    /// Little endian image: syndrome words, CHASH, AUX.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut words = self.syn_data.to_vec();
        words.push(self.chash);
        words.push(self.aux);
        u32_arr_to_u8_vec(&words)
    }
}
