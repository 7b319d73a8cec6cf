use std::error::Error;
use tempfile::tempdir;
use xlnx_puf_bbm::{error::NandError, nand::*};

fn geometry() -> NandGeometry {
    NandGeometry {
        bytes_per_page: 512,
        spare_bytes_per_page: 16,
        pages_per_block: 4,
        blocks_per_target: 16,
        num_targets: 1,
    }
}

#[test]
fn bbt_persists_in_image() -> Result<(), Box<dyn Error>> {
    let _ = env_logger::try_init();
    let dir = tempdir()?;
    let path = dir.path().join("nand.img");
    let path = path.to_str().ok_or("temporary path is not UTF-8")?;

    let mut nand = FileNand::create(path, geometry(), EccMode::Hw)?;
    // factory marker of block 6 on a small page device
    nand.write_spare_bytes(6 * 4, &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00])?;

    let mut manager = BbtManager::new(nand)?;
    manager.scan_bbt()?;
    manager.mark_block_bad(2)?;
    assert_eq!(manager.bad_blocks(), vec![2, 6]);
    let table = manager.bbt().to_vec();
    drop(manager);

    let nand = FileNand::open(path, geometry(), EccMode::Hw)?;
    let mut manager = BbtManager::new(nand)?;
    manager.scan_bbt()?;
    assert_eq!(manager.bbt(), &table[..]);
    assert_eq!(manager.block_type(6)?, BlockType::FactoryBad);
    assert_eq!(manager.block_type(2)?, BlockType::Bad);
    assert_eq!(manager.block_type(15)?, BlockType::Reserved);
    assert_eq!(manager.desc(BbtDescKind::Primary).version[0], 2);
    Ok(())
}

#[test]
fn programming_only_clears_bits() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("cells.img");
    let path = path.to_str().ok_or("temporary path is not UTF-8")?;
    let mut nand = FileNand::create(path, geometry(), EccMode::Hw)?;

    // crosses the boundary between page 0 and page 1
    let offset = 510;
    nand.write(offset, &[0xF0, 0xF0, 0xF0, 0xF0])?;
    nand.write(offset, &[0x0F, 0xFF, 0x3C, 0xFF])?;
    let mut buf = [0u8; 4];
    nand.read(offset, &mut buf)?;
    assert_eq!(buf, [0x00, 0xF0, 0x30, 0xF0]);

    // the spare area in between is not part of the main address space
    let mut spare = [0u8; 16];
    nand.read_spare_bytes(0, &mut spare)?;
    assert!(spare.iter().all(|b| *b == 0xFF));

    nand.erase_block(0, 0)?;
    nand.read(offset, &mut buf)?;
    assert_eq!(buf, [0xFF; 4]);
    Ok(())
}

#[test]
fn out_of_range_accesses() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("range.img");
    let path = path.to_str().ok_or("temporary path is not UTF-8")?;
    let mut nand = FileNand::create(path, geometry(), EccMode::Hw)?;

    let size = geometry().device_size();
    let mut buf = [0u8; 2];
    assert!(matches!(
        nand.read(size - 1, &mut buf),
        Err(NandError::ReadError { .. })
    ));
    assert!(matches!(
        nand.erase_block(0, 16),
        Err(NandError::EraseError { target: 0, block: 16, .. })
    ));
    let mut spare = [0u8; 17];
    assert!(matches!(
        nand.read_spare_bytes(0, &mut spare),
        Err(NandError::SpareReadError { page: 0, .. })
    ));
    Ok(())
}

#[test]
fn image_size_must_match_geometry() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("short.img");
    let path = path.to_str().ok_or("temporary path is not UTF-8")?;
    FileNand::create(path, geometry(), EccMode::Hw)?;

    let mut larger = geometry();
    larger.blocks_per_target = 32;
    assert!(matches!(
        FileNand::open(path, larger, EccMode::Hw),
        Err(NandError::InvalidGeometry(_))
    ));
    Ok(())
}
