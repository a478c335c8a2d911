//! Hardware description consumed when building devices.
//!
//! The driver layer (NVML, sysfs, ...) lives outside this crate. It is
//! reached through the [`DeviceInfo`] trait, one implementor per device
//! handle. [`StaticDeviceInfo`] is a plain-data implementor loaded from
//! configuration or produced by the stub helpers below.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::InfoError;

/// Queries needed to build a [`Device`](super::Device) from a driver handle.
pub trait DeviceInfo {
    /// The device UUID, e.g. `GPU-5b7f...` or `MIG-1c2d...`.
    fn uuid(&self) -> Result<String, InfoError>;

    /// Device nodes backing this device, e.g. `/dev/nvidia0`.
    fn paths(&self) -> Result<Vec<String>, InfoError>;

    /// The NUMA node the device is attached to, if the platform reports one.
    fn numa_node(&self) -> Result<Option<i64>, InfoError>;
}

/// A device description known up front.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticDeviceInfo {
    /// Minor number, or `"<gpu>:<gi>"` for a MIG partition.
    pub index: String,

    pub uuid: String,

    #[serde(default)]
    pub paths: Vec<String>,

    #[serde(default)]
    pub numa_node: Option<i64>,
}

impl DeviceInfo for StaticDeviceInfo {
    fn uuid(&self) -> Result<String, InfoError> {
        Ok(self.uuid.clone())
    }

    fn paths(&self) -> Result<Vec<String>, InfoError> {
        Ok(self.paths.clone())
    }

    fn numa_node(&self) -> Result<Option<i64>, InfoError> {
        Ok(self.numa_node)
    }
}

/// Create `count` full GPUs with fresh UUIDs, split evenly over two NUMA nodes.
pub fn stub_devices(count: usize) -> Vec<StaticDeviceInfo> {
    (0..count)
        .map(|i| StaticDeviceInfo {
            index: i.to_string(),
            uuid: format!("GPU-{}", Uuid::new_v4()),
            paths: vec![format!("/dev/nvidia{i}")],
            numa_node: Some(if i < count.div_ceil(2) { 0 } else { 1 }),
        })
        .collect()
}

/// Create stub MIG partitions: two instances on each of `gpus` GPUs.
///
/// MIG partitions are exposed through the parent's device node plus the
/// per-instance capability nodes.
pub fn stub_mig_devices(gpus: usize) -> Vec<StaticDeviceInfo> {
    let mut devices = Vec::with_capacity(gpus * 2);
    for gpu in 0..gpus {
        for gi in 0..2 {
            devices.push(StaticDeviceInfo {
                index: format!("{gpu}:{gi}"),
                uuid: format!("MIG-{}", Uuid::new_v4()),
                paths: vec![
                    format!("/dev/nvidia{gpu}"),
                    format!("/dev/nvidia-caps/nvidia-cap{}", 30 + gpu * 2 + gi),
                ],
                numa_node: None,
            });
        }
    }
    devices
}
