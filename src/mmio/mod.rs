pub mod mmio_client;

pub use mmio_client::*;
