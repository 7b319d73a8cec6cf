//! Raw NAND access used by the bad block table manager.
//!
//! Addresses follow the controller conventions: main area transfers take a byte offset in the
//! main area address space of the whole device (spare bytes are not counted), spare area
//! transfers take an absolute page number, erase takes a target and a block inside it.
//!
use crate::error::{NandError, NandResult};
use std::io;
use strum_macros::{Display, EnumString};

#[derive(Debug, PartialEq, Eq, Clone, Copy, EnumString, Display)]
pub enum EccMode {
    Hw,
    Sw,
    OnDie,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct NandGeometry {
    pub bytes_per_page: u32,
    pub spare_bytes_per_page: u32,
    pub pages_per_block: u32,
    pub blocks_per_target: u32,
    pub num_targets: u32,
}

impl NandGeometry {
    pub fn num_blocks(&self) -> u32 {
        self.blocks_per_target * self.num_targets
    }

    pub fn num_pages(&self) -> u32 {
        self.num_blocks() * self.pages_per_block
    }

    pub fn block_size(&self) -> u64 {
        self.bytes_per_page as u64 * self.pages_per_block as u64
    }

    /// Size of the main area of the whole device.
    pub fn device_size(&self) -> u64 {
        self.block_size() * self.num_blocks() as u64
    }

    /// Main plus spare bytes of one page.
    pub fn raw_page_size(&self) -> u64 {
        (self.bytes_per_page + self.spare_bytes_per_page) as u64
    }

    /// First absolute page of a block given by target and block inside the target.
    pub fn first_page(&self, target: u32, block: u32) -> u32 {
        (target * self.blocks_per_target + block) * self.pages_per_block
    }

    pub fn validate(&self) -> NandResult<()> {
        if self.bytes_per_page == 0
            || self.spare_bytes_per_page == 0
            || self.pages_per_block == 0
            || self.num_targets == 0
        {
            return Err(NandError::InvalidGeometry(format!(
                "zero sized field in {:?}",
                self
            )));
        }
        if self.blocks_per_target < 4 || self.blocks_per_target % 4 != 0 {
            return Err(NandError::InvalidGeometry(format!(
                "blocks per target must be a non zero multiple of 4, got {}",
                self.blocks_per_target
            )));
        }
        Ok(())
    }

    /// Splits a main area transfer into `(page, column, buffer range)` pieces that never cross
    /// a page boundary.
    pub(crate) fn page_chunks(
        &self,
        offset: u64,
        len: usize,
    ) -> io::Result<Vec<(u32, u64, std::ops::Range<usize>)>> {
        let end = offset.checked_add(len as u64).filter(|e| *e <= self.device_size());
        if end.is_none() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} bytes at {:#X} exceed the device", len, offset),
            ));
        }

        let page_size = self.bytes_per_page as u64;
        let mut chunks = Vec::new();
        let mut done = 0usize;
        while done < len {
            let pos = offset + done as u64;
            let column = pos % page_size;
            let n = std::cmp::min((page_size - column) as usize, len - done);
            chunks.push(((pos / page_size) as u32, column, done..done + n));
            done += n;
        }
        Ok(chunks)
    }

    pub(crate) fn check_page(&self, page: u32) -> io::Result<()> {
        if page >= self.num_pages() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("page {} is outside of the device", page),
            ));
        }
        Ok(())
    }

    pub(crate) fn check_block(&self, target: u32, block: u32) -> io::Result<()> {
        if target >= self.num_targets || block >= self.blocks_per_target {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("block {} of target {} is outside of the device", block, target),
            ));
        }
        Ok(())
    }
}

/// The [`NandFlash`] trait defines the raw operations a NAND backend has to provide.
///
/// Programming only clears bits, like the flash cells do; erase sets a whole block to `0xFF`.
pub trait NandFlash {
    fn geometry(&self) -> &NandGeometry;
    fn ecc_mode(&self) -> EccMode;

    /// Reads main area bytes starting at `offset`.
    fn read(&mut self, offset: u64, buf: &mut [u8]) -> NandResult<()>;
    /// Programs main area bytes starting at `offset`.
    fn write(&mut self, offset: u64, data: &[u8]) -> NandResult<()>;
    fn erase_block(&mut self, target: u32, block: u32) -> NandResult<()>;
    /// Reads the beginning of the spare area of `page`, `buf` is at most one spare area long.
    fn read_spare_bytes(&mut self, page: u32, buf: &mut [u8]) -> NandResult<()>;
    fn write_spare_bytes(&mut self, page: u32, buf: &[u8]) -> NandResult<()>;
}
