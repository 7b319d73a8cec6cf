//! This module keeps the bad block table (BBT) of a NAND device.
//!
//! The table holds two bits per block for every block of every target. Each target stores two
//! copies of its part of the table, a primary and a mirror, in blocks taken from the end of the
//! target. A copy is identified by a signature in the spare area of its first page, next to an
//! 8-bit version; the bitmap itself is stored inverted so that an erased block reads as all
//! good.
//!
//! Flash errors are propagated as they are. A copy that cannot be written leaves the two copies
//! with different versions, the next [`BbtManager::scan_bbt`] repairs that.
//!
use super::{bbt_cfg::*, nand_flash::*};
use crate::error::{NandError, NandResult};

pub struct BbtManager<F: NandFlash> {
    flash: F,
    bbt: Vec<u8>,
    primary: BbtDesc,
    mirror: BbtDesc,
    pattern: BbPattern,
}

fn default_descs<F: NandFlash>(flash: &F) -> (BbtDesc, BbtDesc, BbPattern) {
    let geometry = flash.geometry();
    let cfg = BbtConfig::bbt_cfg(flash.ecc_mode());
    (
        BbtDesc::new(BBT_PRIMARY_SIG, &cfg, geometry),
        BbtDesc::new(BBT_MIRROR_SIG, &cfg, geometry),
        BbPattern::new(geometry),
    )
}

impl<F: NandFlash> BbtManager<F> {
    /// Creates a manager with an all good in-memory table and default descriptors.
    /// Nothing is read from the flash until [`BbtManager::scan_bbt`].
    pub fn new(flash: F) -> NandResult<Self> {
        let geometry = *flash.geometry();
        geometry.validate()?;
        let (primary, mirror, pattern) = default_descs(&flash);

        let spare_needed = std::cmp::max(primary.spare_len(), pattern.offset + pattern.length);
        if geometry.spare_bytes_per_page < spare_needed {
            return Err(NandError::InvalidGeometry(format!(
                "spare area of {} bytes is too small, {} needed",
                geometry.spare_bytes_per_page, spare_needed
            )));
        }
        let bbt_len = geometry.blocks_per_target / BBT_BLOCKS_PER_BYTE;
        if bbt_len as u64 > geometry.block_size() {
            return Err(NandError::InvalidGeometry(format!(
                "table of {} bytes does not fit into one block",
                bbt_len
            )));
        }

        Ok(BbtManager {
            flash,
            bbt: vec![0; (geometry.num_blocks() / BBT_BLOCKS_PER_BYTE) as usize],
            primary,
            mirror,
            pattern,
        })
    }

    /// Resets both descriptors and the factory bad block pattern to their defaults.
    pub fn init_bbt_desc(&mut self) {
        let (primary, mirror, pattern) = default_descs(&self.flash);
        self.primary = primary;
        self.mirror = mirror;
        self.pattern = pattern;
    }

    /// Loads the table of every target from flash, building and persisting a new one from the
    /// factory markers where no copy exists, then reserves the table blocks.
    ///
    /// Only a missing table leads to a factory scan. Any flash error, including a failed
    /// repair of a stale copy, is returned and the copy found on flash stays untouched.
    pub fn scan_bbt(&mut self) -> NandResult<()> {
        for target in 0..self.geometry().num_targets {
            match self.read_bbt(target) {
                Ok(()) => {}
                Err(NandError::BbtNotFound { .. }) => {
                    log::info!(
                        "No bad block table on target {}, scanning factory markers",
                        target
                    );
                    self.create_bbt(target);
                    self.write_bbt(BbtDescKind::Primary, target)?;
                    self.write_bbt(BbtDescKind::Mirror, target)?;
                }
                Err(e) => return Err(e),
            }
            self.mark_bbt(BbtDescKind::Primary, target)?;
            self.mark_bbt(BbtDescKind::Mirror, target)?;
        }
        Ok(())
    }

    /// Fills the table of `target` from the factory bad block markers.
    pub fn create_bbt(&mut self, target: u32) {
        let geometry = *self.geometry();
        let spare_len = geometry.spare_bytes_per_page as usize;
        let pattern = self.pattern;
        let range = pattern.offset as usize..(pattern.offset + pattern.length) as usize;
        let pages = if pattern.scan_second_page { 2 } else { 1 };
        let mut spare = vec![0u8; spare_len];

        for block in 0..geometry.blocks_per_target {
            let first_page = geometry.first_page(target, block);
            let mut factory_bad = false;
            for page in first_page..first_page + std::cmp::min(pages, geometry.pages_per_block) {
                match self.flash.read_spare_bytes(page, &mut spare) {
                    Ok(()) => {
                        factory_bad = spare[range.clone()].iter().any(|b| *b != pattern.pattern)
                    }
                    Err(e) => {
                        log::warn!("Block {} of target {}: {}", block, target, e);
                        factory_bad = true;
                    }
                }
                if factory_bad {
                    break;
                }
            }

            let block_num = target * geometry.blocks_per_target + block;
            if factory_bad {
                log::debug!("Factory bad block {}", block_num);
                self.set_block_type(block_num, BlockType::FactoryBad);
            } else {
                self.set_block_type(block_num, BlockType::Good);
            }
        }
    }

    /// Loads the table of `target` from the newest copy found on flash and brings the other
    /// copy to the same version.
    ///
    /// Versions are compared as plain numbers, so after a wrap from 255 to 0 was interrupted
    /// half way the stale copy at 255 wins.
    pub fn read_bbt(&mut self, target: u32) -> NandResult<()> {
        let t = target as usize;
        let primary_found = self.found(BbtDescKind::Primary, target)?;
        let mirror_found = self.found(BbtDescKind::Mirror, target)?;

        let (source, stale) = match (primary_found, mirror_found) {
            (false, false) => return Err(NandError::BbtNotFound { target }),
            (true, true) => {
                let primary_ver = self.primary.version[t];
                let mirror_ver = self.mirror.version[t];
                if mirror_ver > primary_ver {
                    (BbtDescKind::Mirror, Some(BbtDescKind::Primary))
                } else if primary_ver > mirror_ver {
                    (BbtDescKind::Primary, Some(BbtDescKind::Mirror))
                } else {
                    (BbtDescKind::Primary, None)
                }
            }
            (true, false) => (BbtDescKind::Primary, Some(BbtDescKind::Mirror)),
            (false, true) => (BbtDescKind::Mirror, Some(BbtDescKind::Primary)),
        };

        self.load_bbt(source, target)?;
        log::info!(
            "Loaded bad block table of target {} from {:?} version {}",
            target,
            source,
            self.desc(source).version[t]
        );
        if let Some(stale) = stale {
            let version = self.desc(source).version[t];
            log::warn!("Rewriting {:?} table of target {} to version {}", stale, target, version);
            self.desc_mut(stale).version[t] = version;
            self.write_bbt(stale, target)?;
        }
        Ok(())
    }

    /// Looks for a copy in the last `max_blocks` blocks of `target`, newest block first.
    /// Candidates with an unreadable spare area are skipped.
    pub fn search_bbt(&mut self, kind: BbtDescKind, target: u32) -> NandResult<()> {
        let geometry = *self.geometry();
        let t = target as usize;
        let mut spare = vec![0u8; geometry.spare_bytes_per_page as usize];
        self.desc_mut(kind).valid[t] = false;

        let desc = self.desc(kind);
        let sig_start = desc.sig_offset as usize;
        let sig_end = (desc.sig_offset + desc.sig_len) as usize;
        let ver_offset = desc.ver_offset as usize;
        let signature = desc.signature;
        let last_block = geometry.blocks_per_target - 1;

        for idx in 0..desc.max_blocks {
            let page = geometry.first_page(target, last_block - idx);
            if let Err(e) = self.flash.read_spare_bytes(page, &mut spare) {
                log::warn!("Skipping table candidate at page {}: {}", page, e);
                continue;
            }
            if spare[sig_start..sig_end] == signature[..sig_end - sig_start] {
                let desc = self.desc_mut(kind);
                desc.page_offset[t] = page;
                desc.version[t] = spare[ver_offset];
                desc.valid[t] = true;
                log::debug!(
                    "Found {:?} table of target {} at page {} version {}",
                    kind,
                    target,
                    page,
                    spare[ver_offset]
                );
                return Ok(());
            }
        }
        Err(NandError::BbtNotFound { target })
    }

    /// Writes one copy of the table of `target`, choosing a block for it first if it has none.
    pub fn write_bbt(&mut self, kind: BbtDescKind, target: u32) -> NandResult<()> {
        let geometry = *self.geometry();
        let t = target as usize;

        if !self.desc(kind).valid[t] {
            let companion_page = self.desc(kind.companion()).page_offset[t];
            let last_block = geometry.blocks_per_target - 1;
            let block = (0..self.desc(kind).max_blocks)
                .map(|idx| last_block - idx)
                .find(|block| {
                    let block_num = target * geometry.blocks_per_target + block;
                    !self.get_block_type(block_num).is_bad()
                        && geometry.first_page(target, *block) != companion_page
                })
                .ok_or(NandError::NoFreeBbtBlock { target })?;
            let desc = self.desc_mut(kind);
            desc.page_offset[t] = geometry.first_page(target, block);
            desc.valid[t] = true;
        }

        let desc = self.desc(kind);
        let page = desc.page_offset[t];
        let version = desc.version[t];
        let sig_start = desc.sig_offset as usize;
        let sig_end = (desc.sig_offset + desc.sig_len) as usize;
        let ver_offset = desc.ver_offset as usize;
        let signature = desc.signature;

        let len = self.bbt_len_per_target();
        let data: Vec<u8> = self.bbt[t * len..(t + 1) * len].iter().map(|b| !b).collect();

        let block = page / geometry.pages_per_block - target * geometry.blocks_per_target;
        self.flash.erase_block(target, block)?;
        self.flash
            .write(page as u64 * geometry.bytes_per_page as u64, &data)?;

        let mut spare = vec![0u8; geometry.spare_bytes_per_page as usize];
        self.flash.read_spare_bytes(page, &mut spare)?;
        spare[sig_start..sig_end].copy_from_slice(&signature[..sig_end - sig_start]);
        spare[ver_offset] = version;
        self.flash.write_spare_bytes(page, &spare)?;

        log::debug!(
            "Wrote {:?} table of target {} at page {} version {}",
            kind,
            target,
            page,
            version
        );
        Ok(())
    }

    /// Bumps the version of both copies and writes them, primary first. The mirror is not
    /// written when the primary fails.
    pub fn update_bbt(&mut self, target: u32) -> NandResult<()> {
        let t = target as usize;
        self.primary.version[t] = self.primary.version[t].wrapping_add(1);
        self.mirror.version[t] = self.mirror.version[t].wrapping_add(1);
        self.write_bbt(BbtDescKind::Primary, target)?;
        self.write_bbt(BbtDescKind::Mirror, target)
    }

    /// Marks the good blocks of the search window of `kind` as reserved and persists the table
    /// when anything changed.
    pub fn mark_bbt(&mut self, kind: BbtDescKind, target: u32) -> NandResult<()> {
        let blocks_per_target = self.geometry().blocks_per_target;
        let start_block = (target + 1) * blocks_per_target - 1;
        let mut changed = false;

        for idx in 0..self.desc(kind).max_blocks {
            let block_num = start_block - idx;
            if self.get_block_type(block_num) == BlockType::Good {
                self.set_block_type(block_num, BlockType::Reserved);
                changed = true;
            }
        }
        if changed {
            self.update_bbt(target)?;
        }
        Ok(())
    }

    /// Marks `block` as bad, the table on flash is updated only if the block was not bad yet.
    pub fn mark_block_bad(&mut self, block: u32) -> NandResult<()> {
        if self.block_type(block)?.is_bad() {
            return Ok(());
        }
        log::info!("Marking block {} bad", block);
        self.set_block_type(block, BlockType::Bad);
        self.update_bbt(block / self.geometry().blocks_per_target)
    }

    pub fn is_block_bad(&self, block: u32) -> NandResult<bool> {
        Ok(self.block_type(block)?.is_bad())
    }

    pub fn block_type(&self, block: u32) -> NandResult<BlockType> {
        if block >= self.geometry().num_blocks() {
            return Err(NandError::InvalidBlock { block });
        }
        Ok(self.get_block_type(block))
    }

    /// All blocks that must not be used, factory bad ones included.
    pub fn bad_blocks(&self) -> Vec<u32> {
        (0..self.geometry().num_blocks())
            .filter(|block| self.get_block_type(*block).is_bad())
            .collect()
    }

    pub fn desc(&self, kind: BbtDescKind) -> &BbtDesc {
        match kind {
            BbtDescKind::Primary => &self.primary,
            BbtDescKind::Mirror => &self.mirror,
        }
    }

    pub fn pattern(&self) -> &BbPattern {
        &self.pattern
    }

    /// The in-memory table, two bits per block.
    pub fn bbt(&self) -> &[u8] {
        &self.bbt
    }

    pub fn flash(&self) -> &F {
        &self.flash
    }

    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    pub fn into_flash(self) -> F {
        self.flash
    }

    fn geometry(&self) -> &NandGeometry {
        self.flash.geometry()
    }

    fn desc_mut(&mut self, kind: BbtDescKind) -> &mut BbtDesc {
        match kind {
            BbtDescKind::Primary => &mut self.primary,
            BbtDescKind::Mirror => &mut self.mirror,
        }
    }

    fn found(&mut self, kind: BbtDescKind, target: u32) -> NandResult<bool> {
        match self.search_bbt(kind, target) {
            Ok(()) => Ok(true),
            Err(NandError::BbtNotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn load_bbt(&mut self, kind: BbtDescKind, target: u32) -> NandResult<()> {
        let t = target as usize;
        let len = self.bbt_len_per_target();
        let offset = self.desc(kind).page_offset[t] as u64 * self.geometry().bytes_per_page as u64;
        let mut data = vec![0u8; len];
        self.flash.read(offset, &mut data)?;
        self.bbt[t * len..(t + 1) * len]
            .iter_mut()
            .zip(data)
            .for_each(|(dst, src)| *dst = !src);
        Ok(())
    }

    fn bbt_len_per_target(&self) -> usize {
        (self.geometry().blocks_per_target / BBT_BLOCKS_PER_BYTE) as usize
    }

    fn get_block_type(&self, block: u32) -> BlockType {
        let shift = (block & 0x3) << 1;
        BlockType::from(self.bbt[(block >> 2) as usize] >> shift)
    }

    fn set_block_type(&mut self, block: u32, block_type: BlockType) {
        let shift = (block & 0x3) << 1;
        let byte = &mut self.bbt[(block >> 2) as usize];
        *byte = (*byte & !(BBT_BLOCK_TYPE_MASK << shift)) | ((block_type as u8) << shift);
    }
}
