//! A NAND device backed by a raw image file.
//!
//! The image stores every page as its main area immediately followed by its spare area, the
//! layout produced by most NAND dump tools.
//!
use super::nand_flash::*;
use crate::{
    error::{NandError, NandResult},
    getter_log, setter_log,
    utils::open_channel,
};
use std::{fs::File, io, os::unix::fs::FileExt};

pub struct FileNand {
    image: File,
    geometry: NandGeometry,
    ecc_mode: EccMode,
}

impl FileNand {
    /// Creates a fully erased image at `path`, truncating any existing file.
    pub fn create(path: &str, geometry: NandGeometry, ecc_mode: EccMode) -> NandResult<Self> {
        geometry.validate()?;
        File::create(path).map_err(|e| NandError::WriteError {
            offset: 0,
            len: 0,
            source: e,
        })?;
        let mut nand = FileNand {
            image: Self::open_image(path)?,
            geometry,
            ecc_mode,
        };
        for target in 0..geometry.num_targets {
            for block in 0..geometry.blocks_per_target {
                nand.erase_block(target, block)?;
            }
        }
        log::info!(
            "Created NAND image {:?} with {} blocks",
            path,
            geometry.num_blocks()
        );
        Ok(nand)
    }

    /// Opens an existing image, its size must match `geometry`.
    pub fn open(path: &str, geometry: NandGeometry, ecc_mode: EccMode) -> NandResult<Self> {
        geometry.validate()?;
        let image = Self::open_image(path)?;
        let expected = geometry.raw_page_size() * geometry.num_pages() as u64;
        let len = image
            .metadata()
            .map_err(|e| NandError::ReadError {
                offset: 0,
                len: 0,
                source: e,
            })?
            .len();
        if len != expected {
            return Err(NandError::InvalidGeometry(format!(
                "image {:?} has {} bytes, geometry needs {}",
                path, len, expected
            )));
        }
        Ok(FileNand {
            image,
            geometry,
            ecc_mode,
        })
    }

    fn open_image(path: &str) -> NandResult<File> {
        open_channel(path).map_err(|e| NandError::ReadError {
            offset: 0,
            len: 0,
            source: e,
        })
    }

    fn raw_offset(&self, page: u32, column: u64) -> u64 {
        page as u64 * self.geometry.raw_page_size() + column
    }

    /// Programs `data` at a raw image offset, bits already cleared stay cleared.
    fn program(&self, raw_offset: u64, data: &[u8]) -> io::Result<()> {
        let mut cells = vec![0u8; data.len()];
        self.image.read_exact_at(&mut cells, raw_offset)?;
        cells.iter_mut().zip(data).for_each(|(cell, d)| *cell &= *d);
        self.image.write_all_at(&cells, raw_offset)
    }

    fn spare_range_check(&self, page: u32, len: usize) -> io::Result<()> {
        self.geometry.check_page(page)?;
        if len > self.geometry.spare_bytes_per_page as usize {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} bytes exceed the spare area", len),
            ));
        }
        Ok(())
    }
}

impl NandFlash for FileNand {
    fn geometry(&self) -> &NandGeometry {
        &self.geometry
    }

    fn ecc_mode(&self) -> EccMode {
        self.ecc_mode
    }

    fn read(&mut self, offset: u64, buf: &mut [u8]) -> NandResult<()> {
        let len = buf.len();
        let chunks = self
            .geometry
            .page_chunks(offset, len)
            .map_err(|e| NandError::ReadError {
                offset,
                len,
                source: e,
            })?;
        for (page, column, range) in chunks {
            self.image
                .read_exact_at(&mut buf[range], self.raw_offset(page, column))
                .map_err(|e| NandError::ReadError {
                    offset,
                    len,
                    source: e,
                })?;
        }
        getter_log!(buf, offset);
        Ok(())
    }

    fn write(&mut self, offset: u64, data: &[u8]) -> NandResult<()> {
        let len = data.len();
        let chunks = self
            .geometry
            .page_chunks(offset, len)
            .map_err(|e| NandError::WriteError {
                offset,
                len,
                source: e,
            })?;
        for (page, column, range) in chunks {
            self.program(self.raw_offset(page, column), &data[range])
                .map_err(|e| NandError::WriteError {
                    offset,
                    len,
                    source: e,
                })?;
        }
        setter_log!(data, offset);
        Ok(())
    }

    fn erase_block(&mut self, target: u32, block: u32) -> NandResult<()> {
        let erase = || -> io::Result<()> {
            self.geometry.check_block(target, block)?;
            let first = self.geometry.first_page(target, block);
            let erased = vec![0xFFu8; self.geometry.raw_page_size() as usize];
            for page in first..first + self.geometry.pages_per_block {
                self.image.write_all_at(&erased, self.raw_offset(page, 0))?;
            }
            Ok(())
        };
        erase().map_err(|e| NandError::EraseError {
            target,
            block,
            source: e,
        })?;
        log::debug!("Erased block {} of target {}", block, target);
        Ok(())
    }

    fn read_spare_bytes(&mut self, page: u32, buf: &mut [u8]) -> NandResult<()> {
        let column = self.geometry.bytes_per_page as u64;
        self.spare_range_check(page, buf.len())
            .and_then(|_| self.image.read_exact_at(buf, self.raw_offset(page, column)))
            .map_err(|e| NandError::SpareReadError { page, source: e })?;
        getter_log!(buf, page);
        Ok(())
    }

    fn write_spare_bytes(&mut self, page: u32, buf: &[u8]) -> NandResult<()> {
        let column = self.geometry.bytes_per_page as u64;
        self.spare_range_check(page, buf.len())
            .and_then(|_| self.program(self.raw_offset(page, column), buf))
            .map_err(|e| NandError::SpareWriteError { page, source: e })?;
        setter_log!(buf, page);
        Ok(())
    }
}
