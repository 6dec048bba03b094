//! Transport over the native scanner library.

mod backend;
mod device;
mod handle;
mod status;
mod utils;

pub use backend::Backend;
pub use device::Device;
pub use status::from_status;
