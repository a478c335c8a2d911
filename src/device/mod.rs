//! GPU device inventory.
//!
//! - [`annotated`]: replica-annotated device IDs
//! - [`info`]: hardware description consumed when building devices
//! - [`registry`]: Device records, the Devices collection and plugin reporting

pub mod annotated;
pub mod info;
pub mod registry;

pub use annotated::{AnnotatedId, REPLICA_DELIMITER};
pub use info::{DeviceInfo, StaticDeviceInfo};
pub use registry::{
    build_device, Device, Devices, Health, NumaNode, PluginDevice, TopologyInfo, DXG_DEVICE_PATH,
};
