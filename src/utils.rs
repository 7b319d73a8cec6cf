use std::{
    fs::{File, OpenOptions},
    io::Result,
    os::unix::prelude::OpenOptionsExt,
};

#[macro_export]
macro_rules! getter_log {
    ($data:expr, $from: expr) => {
        if $data.len() < 256 {
            log::debug!("Getting data [ {:#X?} ] from {:#X?}", $data, $from);
        } else {
            log::debug!(
                "Getting data of size [ {:?} ] from {:#X?}",
                $data.len(),
                $from
            );
        }
    };
}

#[macro_export]
macro_rules! setter_log {
    ($data:expr, $from: expr) => {
        if $data.len() < 256 {
            log::trace!("Successfully set data [ {:?} ] to {:#X?}", $data, $from);
        } else {
            log::trace!(
                "Successfully set data of size [ {:?} ] to {:#X?}",
                $data.len(),
                $from
            );
        }
    };
}

// ==== read/write ====
/// Opens a register file or a flash image for reading and writing with synchronous writes.
pub fn open_channel(path: &str) -> Result<File> {
    let mut options = OpenOptions::new();
    options.read(true).write(true);

    if cfg!(unix) {
        options.custom_flags(libc::O_SYNC);
    }
    log::debug!("Trying to open channel: {:?}", path);
    options.open(path)
}

// ==== conversions ====

pub fn u32_arr_to_u8_vec(input: &[u32]) -> Vec<u8> {
    input
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect::<Vec<u8>>()
}

/// Trailing bytes that do not fill a whole word are dropped.
pub fn u8_arr_to_u32_vec(arr: &[u8]) -> Vec<u32> {
    arr.chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect::<Vec<u32>>()
}
