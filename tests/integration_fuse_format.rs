use rand::{rngs::StdRng, Rng, SeedableRng};
use std::error::Error;
use xlnx_puf_bbm::{error::PufError, puf::*, utils::u8_arr_to_u32_vec};

fn parse_words(field: &str) -> Result<Vec<u32>, Box<dyn Error>> {
    field
        .split_whitespace()
        .map(|w| u32::from_str_radix(w, 16).map_err(|e| Box::new(e) as Box<dyn Error>))
        .collect()
}

fn session_with_syndrome(syndrome: &[u32]) -> PufSession {
    let mut session = PufSession::default();
    session.syndrome_data[..syndrome.len()].copy_from_slice(syndrome);
    session
}

/// Bit stream reference: every fourth word keeps its 20 upper bits, the stream is packed
/// MSB first and zero padded.
fn packed_reference(syndrome: &[u32]) -> Vec<u32> {
    let mut bits: Vec<bool> = Vec::with_capacity(EFUSE_TRIM_SYN_DATA_IN_WORDS * 32);
    for (idx, word) in syndrome.iter().enumerate() {
        let kept = if idx % 4 == 3 { 20 } else { 32 };
        bits.extend((0..kept).map(|bit| word & (1 << (31 - bit)) != 0));
    }
    bits.resize(EFUSE_TRIM_SYN_DATA_IN_WORDS * 32, false);
    bits.chunks(32)
        .map(|chunk| chunk.iter().fold(0u32, |acc, b| (acc << 1) | *b as u32))
        .collect()
}

#[test]
fn fuse_format_reference_vectors() -> Result<(), Box<dyn Error>> {
    let _ = env_logger::try_init();
    let path = concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/test_data/fuse_format_vectors.csv"
    );
    let mut reader = csv::Reader::from_path(path)?;

    let mut checked = 0;
    for record in reader.records() {
        let record = record?;
        let name = &record[0];
        let syndrome = parse_words(&record[1])?;
        let expected = parse_words(&record[2])?;
        assert_eq!(syndrome.len(), PUF_4K_SYN_LEN_IN_WORDS, "{}", name);
        assert_eq!(expected.len(), EFUSE_TRIM_SYN_DATA_IN_WORDS, "{}", name);

        let mut session = session_with_syndrome(&syndrome);
        generate_fuse_format(&mut session)?;
        assert_eq!(session.efuse_syn_data.to_vec(), expected, "vector {}", name);
        checked += 1;
    }
    assert_eq!(checked, 5);
    Ok(())
}

#[test]
fn fuse_format_packs_trimmed_words() -> Result<(), Box<dyn Error>> {
    let mut rng = StdRng::seed_from_u64(0x5EED);
    for _ in 0..32 {
        let syndrome: Vec<u32> = (0..PUF_4K_SYN_LEN_IN_WORDS).map(|_| rng.gen()).collect();
        let mut session = session_with_syndrome(&syndrome);
        generate_fuse_format(&mut session)?;
        assert_eq!(session.efuse_syn_data.to_vec(), packed_reference(&syndrome));
        assert_eq!(session.efuse_syn_data[EFUSE_TRIM_SYN_DATA_IN_WORDS - 1] & 0xF, 0);
    }
    Ok(())
}

#[test]
fn fuse_format_all_ones() -> Result<(), Box<dyn Error>> {
    let mut session = session_with_syndrome(&[0xFFFF_FFFF; PUF_4K_SYN_LEN_IN_WORDS]);
    generate_fuse_format(&mut session)?;
    let (last, head) = session.efuse_syn_data.split_last().unwrap();
    assert!(head.iter().all(|w| *w == 0xFFFF_FFFF));
    assert_eq!(*last, 0xFFFF_FFF0);
    Ok(())
}

#[test]
fn fuse_format_rejects_12k() {
    let mut session = PufSession::default();
    session.reg_mode = RegMode::Mode12K;
    let err = generate_fuse_format(&mut session).unwrap_err();
    assert!(matches!(err, PufError::InvalidSyndromeMode));
    assert_eq!(err.code(), 0x03);
}

#[test]
fn boot_header_layout() {
    let syndrome: Vec<u32> = (1..=PUF_4K_SYN_LEN_IN_WORDS as u32).collect();
    let mut session = session_with_syndrome(&syndrome);
    session.chash = 0xCAFE_F00D;
    session.aux = 0x00AB_CDEF;

    let hd = boot_header_helper_data(&session);
    assert_eq!(hd.len(), BOOT_HDR_HD_LEN_IN_WORDS);
    assert_eq!(&hd[..PUF_4K_SYN_LEN_IN_WORDS], &syndrome[..]);
    assert!(hd[PUF_4K_SYN_LEN_IN_WORDS..BOOT_HDR_SYN_LEN_IN_WORDS]
        .iter()
        .all(|w| *w == 0));
    assert_eq!(hd[384], 0xCAFE_F00D);
    assert_eq!(hd[385], 0x0ABC_DEF0);
}

#[test]
fn efuse_helper_data_image() -> Result<(), Box<dyn Error>> {
    let mut rng = StdRng::seed_from_u64(2023);
    let syndrome: Vec<u32> = (0..PUF_4K_SYN_LEN_IN_WORDS).map(|_| rng.gen()).collect();
    let mut session = session_with_syndrome(&syndrome);
    session.chash = 0x1122_3344;
    session.aux = 0x0055_6677;

    let helper = EfuseHelperData::from_session(&mut session)?;
    assert_eq!(helper.syn_data, session.efuse_syn_data);

    let bytes = helper.to_bytes();
    assert_eq!(bytes.len(), (EFUSE_TRIM_SYN_DATA_IN_WORDS + 2) * 4);
    let words = u8_arr_to_u32_vec(&bytes);
    assert_eq!(&words[..EFUSE_TRIM_SYN_DATA_IN_WORDS], &helper.syn_data[..]);
    assert_eq!(words[EFUSE_TRIM_SYN_DATA_IN_WORDS], 0x1122_3344);
    assert_eq!(words[EFUSE_TRIM_SYN_DATA_IN_WORDS + 1], 0x0055_6677);
    Ok(())
}
