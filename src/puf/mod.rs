pub mod puf_api;
pub mod puf_cfg;
pub mod puf_fuse;
mod puf_hw_code;
pub mod puf_status;

pub use puf_api::*;
pub use puf_cfg::*;
pub use puf_fuse::*;
pub use puf_hw_code::{EFUSE_CACHE_ADDR, EFUSE_CTRL_ADDR, PMC_GLOBAL_ADDR};
pub use puf_status::*;
