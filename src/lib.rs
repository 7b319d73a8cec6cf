//! This Rust package drives the security and boot storage blocks of Xilinx adaptive SoCs.
//! The [PUF](crate::puf) module registers and regenerates the physically unclonable function
//! key through the PMC registers and formats its syndrome for eFuse programming.
//! The [NAND](crate::nand) module keeps the bad block table of a raw NAND device, stored on the
//! flash itself as a primary and a mirror copy.
//!
//! Both engines are generic over their hardware backend, see [`mmio::RegisterAccess`] and
//! [`nand::NandFlash`].
//!
pub mod error;
pub mod mmio;
pub mod nand;
pub mod puf;
pub mod utils;
