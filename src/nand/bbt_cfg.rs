use super::nand_flash::{EccMode, NandGeometry};

pub const BBT_BLOCK_TYPE_MASK: u8 = 0x3;
/// Blocks described by one bitmap byte.
pub const BBT_BLOCKS_PER_BYTE: u32 = 4;
pub const BBT_DESC_MAX_BLOCKS: u32 = 64;
/// Search window used when a target has fewer blocks than [`BBT_DESC_MAX_BLOCKS`].
pub const BBT_DESC_MIN_BLOCKS: u32 = 4;
pub const BBT_DESC_SIG_LEN: u32 = 4;
pub const BBT_PRIMARY_SIG: [u8; 4] = *b"Bbt0";
pub const BBT_MIRROR_SIG: [u8; 4] = *b"1tbB";
pub const BB_PATTERN: u8 = 0xFF;
pub const BB_PATTERN_OFFSET_SMALL_PAGE: u32 = 5;
pub const BB_PATTERN_LENGTH_SMALL_PAGE: u32 = 1;
pub const BB_PATTERN_OFFSET_LARGE_PAGE: u32 = 0;
pub const BB_PATTERN_LENGTH_LARGE_PAGE: u32 = 2;
pub const SMALL_PAGE_SIZE: u32 = 512;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BlockType {
    Good = 0,
    Bad = 1,
    Reserved = 2,
    FactoryBad = 3,
}

impl BlockType {
    /// Bad and factory bad blocks must not be used, reserved blocks hold the table itself.
    pub fn is_bad(&self) -> bool {
        matches!(self, BlockType::Bad | BlockType::FactoryBad)
    }
}

impl From<u8> for BlockType {
    fn from(code: u8) -> Self {
        match code & BBT_BLOCK_TYPE_MASK {
            0 => BlockType::Good,
            1 => BlockType::Bad,
            2 => BlockType::Reserved,
            _ => BlockType::FactoryBad,
        }
    }
}

/// Primary or mirror copy of the table.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BbtDescKind {
    Primary,
    Mirror,
}

impl BbtDescKind {
    pub fn companion(&self) -> Self {
        match self {
            BbtDescKind::Primary => BbtDescKind::Mirror,
            BbtDescKind::Mirror => BbtDescKind::Primary,
        }
    }
}

/// Where a table copy lives on each target and how it is recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BbtDesc {
    pub signature: [u8; 4],
    /// Absolute page holding the table, meaningful only when `valid`.
    pub page_offset: Vec<u32>,
    pub version: Vec<u8>,
    pub valid: Vec<bool>,
    pub max_blocks: u32,
    pub sig_offset: u32,
    pub ver_offset: u32,
    pub sig_len: u32,
}

/// Spare area signature and version positions for a given ECC mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BbtConfig {
    pub sig_offset: u32,
    pub ver_offset: u32,
    pub sig_len: u32,
}

impl BbtConfig {
    pub fn bbt_cfg(ecc_mode: EccMode) -> Self {
        match ecc_mode {
            EccMode::OnDie => on_die_ecc_cfg(),
            EccMode::Hw | EccMode::Sw => controller_ecc_cfg(),
        }
    }
}

fn controller_ecc_cfg() -> BbtConfig {
    BbtConfig {
        sig_offset: 8,
        ver_offset: 12,
        sig_len: BBT_DESC_SIG_LEN,
    }
}

// on-die ECC keeps bytes 8..16 of the spare area for itself
fn on_die_ecc_cfg() -> BbtConfig {
    BbtConfig {
        sig_offset: 4,
        ver_offset: 20,
        sig_len: BBT_DESC_SIG_LEN,
    }
}

impl BbtDesc {
    pub fn new(signature: [u8; 4], cfg: &BbtConfig, geometry: &NandGeometry) -> Self {
        let targets = geometry.num_targets as usize;
        let max_blocks = if geometry.blocks_per_target < BBT_DESC_MAX_BLOCKS {
            BBT_DESC_MIN_BLOCKS
        } else {
            BBT_DESC_MAX_BLOCKS
        };
        BbtDesc {
            signature,
            page_offset: vec![0; targets],
            version: vec![0; targets],
            valid: vec![false; targets],
            max_blocks,
            sig_offset: cfg.sig_offset,
            ver_offset: cfg.ver_offset,
            sig_len: cfg.sig_len,
        }
    }

    /// Spare bytes needed to hold the signature and the version.
    pub fn spare_len(&self) -> u32 {
        std::cmp::max(self.sig_offset + self.sig_len, self.ver_offset + 1)
    }
}

/// Factory marker of good blocks in the spare area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BbPattern {
    pub scan_second_page: bool,
    pub offset: u32,
    pub length: u32,
    pub pattern: u8,
}

impl BbPattern {
    pub fn new(geometry: &NandGeometry) -> Self {
        let (offset, length) = if geometry.bytes_per_page > SMALL_PAGE_SIZE {
            (BB_PATTERN_OFFSET_LARGE_PAGE, BB_PATTERN_LENGTH_LARGE_PAGE)
        } else {
            (BB_PATTERN_OFFSET_SMALL_PAGE, BB_PATTERN_LENGTH_SMALL_PAGE)
        };
        BbPattern {
            scan_second_page: true,
            offset,
            length,
            pattern: BB_PATTERN,
        }
    }
}
