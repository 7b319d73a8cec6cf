use log::info;
use xlnx_puf_bbm::{error::NandResult, nand::*};

/// 2 KiB pages, one target of 32 blocks: the table search window is 4 blocks.
pub fn small_device() -> NandGeometry {
    NandGeometry {
        bytes_per_page: 2048,
        spare_bytes_per_page: 64,
        pages_per_block: 4,
        blocks_per_target: 32,
        num_targets: 1,
    }
}

/// Two targets of 128 blocks: the table search window is 64 blocks.
pub fn dual_target_device() -> NandGeometry {
    NandGeometry {
        bytes_per_page: 2048,
        spare_bytes_per_page: 64,
        pages_per_block: 2,
        blocks_per_target: 128,
        num_targets: 2,
    }
}

pub fn small_page_device() -> NandGeometry {
    NandGeometry {
        bytes_per_page: 512,
        spare_bytes_per_page: 16,
        pages_per_block: 8,
        blocks_per_target: 16,
        num_targets: 1,
    }
}

pub fn bbt_manager(geometry: NandGeometry, ecc_mode: EccMode) -> NandResult<BbtManager<MemNand>> {
    let _ = env_logger::try_init();
    info!("Create emulated NAND {:?}", geometry);
    BbtManager::new(MemNand::new(geometry, ecc_mode)?)
}

pub fn first_page(geometry: &NandGeometry, block: u32) -> u32 {
    block * geometry.pages_per_block
}

pub fn spare(flash: &mut MemNand, page: u32) -> NandResult<Vec<u8>> {
    let mut buf = vec![0u8; flash.geometry().spare_bytes_per_page as usize];
    flash.read_spare_bytes(page, &mut buf)?;
    Ok(buf)
}

/// Clears bits of a stored version byte, the only change programming can make in place.
pub fn program_version(
    flash: &mut MemNand,
    page: u32,
    ver_offset: u32,
    value: u8,
) -> NandResult<()> {
    let mut buf = vec![0xFFu8; ver_offset as usize + 1];
    buf[ver_offset as usize] = value;
    flash.write_spare_bytes(page, &buf)
}

/// Makes block 0 read as bad in the copy of the table stored at `page`.
pub fn corrupt_first_entry(flash: &mut MemNand, page: u32) -> NandResult<()> {
    let offset = page as u64 * flash.geometry().bytes_per_page as u64;
    flash.write(offset, &[0xFE])
}
