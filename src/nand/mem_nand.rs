//! In memory NAND emulator with operation counters and fault injection.
//!
use super::nand_flash::*;
use crate::{
    error::{NandError, NandResult},
    getter_log, setter_log,
};
use std::{collections::HashSet, io};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NandCounters {
    pub reads: usize,
    pub writes: usize,
    pub erases: usize,
    pub spare_reads: usize,
    pub spare_writes: usize,
}

pub struct MemNand {
    cells: Vec<u8>,
    geometry: NandGeometry,
    ecc_mode: EccMode,
    pub counters: NandCounters,
    failing_spare_reads: HashSet<u32>,
    failing_erases: HashSet<(u32, u32)>,
    /// Number of main area programs that still succeed, `None` for no limit.
    writes_before_failure: Option<usize>,
}

fn injected(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("injected {} failure", what))
}

impl MemNand {
    /// Creates a fully erased device.
    pub fn new(geometry: NandGeometry, ecc_mode: EccMode) -> NandResult<Self> {
        geometry.validate()?;
        let size = geometry.raw_page_size() as usize * geometry.num_pages() as usize;
        Ok(MemNand {
            cells: vec![0xFF; size],
            geometry,
            ecc_mode,
            counters: NandCounters::default(),
            failing_spare_reads: HashSet::new(),
            failing_erases: HashSet::new(),
            writes_before_failure: None,
        })
    }

    /// Clears the first spare bytes of the first page of `block`, the way a factory marks it.
    pub fn mark_factory_bad(&mut self, block: u32) -> NandResult<()> {
        if block >= self.geometry.num_blocks() {
            return Err(NandError::InvalidBlock { block });
        }
        let page = block * self.geometry.pages_per_block;
        let start = self.spare_start(page);
        let end = start + self.geometry.spare_bytes_per_page as usize;
        self.cells[start..end].iter_mut().for_each(|b| *b = 0);
        Ok(())
    }

    pub fn fail_spare_read(&mut self, page: u32) {
        self.failing_spare_reads.insert(page);
    }

    pub fn fail_erase(&mut self, target: u32, block: u32) {
        self.failing_erases.insert((target, block));
    }

    /// Lets `count` more main area programs succeed, every later one fails.
    pub fn fail_writes_after(&mut self, count: usize) {
        self.writes_before_failure = Some(count);
    }

    pub fn clear_faults(&mut self) {
        self.failing_spare_reads.clear();
        self.failing_erases.clear();
        self.writes_before_failure = None;
    }

    /// Raw view of the device, main and spare areas interleaved per page.
    pub fn raw(&self) -> &[u8] {
        &self.cells
    }

    fn main_start(&self, page: u32, column: u64) -> usize {
        (page as u64 * self.geometry.raw_page_size() + column) as usize
    }

    fn spare_start(&self, page: u32) -> usize {
        self.main_start(page, self.geometry.bytes_per_page as u64)
    }

    fn program(&mut self, start: usize, data: &[u8]) {
        self.cells[start..start + data.len()]
            .iter_mut()
            .zip(data)
            .for_each(|(cell, d)| *cell &= *d);
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

impl NandFlash for MemNand {
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
            let start = self.main_start(page, column);
            let n = range.len();
            buf[range].copy_from_slice(&self.cells[start..start + n]);
        }
        self.counters.reads += 1;
        getter_log!(buf, offset);
        Ok(())
    }

    fn write(&mut self, offset: u64, data: &[u8]) -> NandResult<()> {
        let len = data.len();
        if let Some(left) = self.writes_before_failure {
            if left == 0 {
                return Err(NandError::WriteError {
                    offset,
                    len,
                    source: injected("write"),
                });
            }
            self.writes_before_failure = Some(left - 1);
        }
        let chunks = self
            .geometry
            .page_chunks(offset, len)
            .map_err(|e| NandError::WriteError {
                offset,
                len,
                source: e,
            })?;
        for (page, column, range) in chunks {
            let start = self.main_start(page, column);
            self.program(start, &data[range]);
        }
        self.counters.writes += 1;
        setter_log!(data, offset);
        Ok(())
    }

    fn erase_block(&mut self, target: u32, block: u32) -> NandResult<()> {
        let check = if self.failing_erases.contains(&(target, block)) {
            Err(injected("erase"))
        } else {
            self.geometry.check_block(target, block)
        };
        check.map_err(|e| NandError::EraseError {
            target,
            block,
            source: e,
        })?;

        let start = self.main_start(self.geometry.first_page(target, block), 0);
        let len = self.geometry.raw_page_size() as usize * self.geometry.pages_per_block as usize;
        self.cells[start..start + len]
            .iter_mut()
            .for_each(|b| *b = 0xFF);
        self.counters.erases += 1;
        log::debug!("Erased block {} of target {}", block, target);
        Ok(())
    }

    fn read_spare_bytes(&mut self, page: u32, buf: &mut [u8]) -> NandResult<()> {
        let check = if self.failing_spare_reads.contains(&page) {
            Err(injected("spare read"))
        } else {
            self.spare_range_check(page, buf.len())
        };
        check.map_err(|e| NandError::SpareReadError { page, source: e })?;

        let start = self.spare_start(page);
        buf.copy_from_slice(&self.cells[start..start + buf.len()]);
        self.counters.spare_reads += 1;
        getter_log!(buf, page);
        Ok(())
    }

    fn write_spare_bytes(&mut self, page: u32, buf: &[u8]) -> NandResult<()> {
        self.spare_range_check(page, buf.len())
            .map_err(|e| NandError::SpareWriteError { page, source: e })?;
        let start = self.spare_start(page);
        self.program(start, buf);
        self.counters.spare_writes += 1;
        setter_log!(buf, page);
        Ok(())
    }
}
