//! Configuration for the bridge: paired device identity and link tuning.

mod device;
mod link;

pub use device::{DeviceStore, DeviceTarget};
pub use link::LinkConfig;
