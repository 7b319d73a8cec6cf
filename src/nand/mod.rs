pub mod bbt_api;
pub mod bbt_cfg;
pub mod file_nand;
pub mod mem_nand;
pub mod nand_flash;

pub use bbt_api::*;
pub use bbt_cfg::*;
pub use file_nand::*;
pub use mem_nand::*;
pub use nand_flash::*;
