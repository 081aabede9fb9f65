pub mod device;
pub mod host;

pub use device::*;
pub use host::*;
