//! Device records and the per-refresh device inventory.
//!
//! A [`Devices`] value is built once per discovery cycle and then only read.
//! Set operations return new collections that share the underlying
//! [`Device`] records.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::annotated;
use super::info::DeviceInfo;
use crate::error::BuildDeviceError;

/// Device node of the WSL2 GPU paravirtualization driver. Devices exposed
/// through it cannot provide aligned allocations.
pub const DXG_DEVICE_PATH: &str = "/dev/dxg";

/// Marker found in the index of a MIG partition (`"<gpu>:<gi>"`).
const MIG_INDEX_MARKER: char = ':';

/// Marker found in the UUID of a MIG partition.
const MIG_ID_MARKER: &str = "MIG";

/// Device health as reported to the kubelet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Health {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumaNode {
    pub id: i64,
}

/// NUMA affinity of a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyInfo {
    pub nodes: Vec<NumaNode>,
}

impl TopologyInfo {
    pub fn single(node: i64) -> Self {
        Self {
            nodes: vec![NumaNode { id: node }],
        }
    }
}

/// A device as advertised to the kubelet through ListAndWatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDevice {
    pub id: String,
    pub health: Health,
    pub topology: Option<TopologyInfo>,
}

/// A single schedulable GPU or MIG partition on this node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Device ID, possibly replica-annotated.
    pub id: String,

    /// Minor number, or `"<gpu>:<gi>"` for a MIG partition.
    pub index: String,

    /// Device nodes backing this device.
    pub paths: Vec<String>,

    pub health: Health,

    pub topology: Option<TopologyInfo>,
}

impl Device {
    /// Build a device from a driver handle.
    ///
    /// The device starts out healthy. Topology is attached only when the
    /// handle reports a NUMA node.
    pub fn build<D>(index: impl Into<String>, info: &D) -> Result<Self, BuildDeviceError>
    where
        D: DeviceInfo + ?Sized,
    {
        let uuid = info.uuid().map_err(BuildDeviceError::Uuid)?;
        let paths = info.paths().map_err(BuildDeviceError::Paths)?;
        let numa = info.numa_node().map_err(BuildDeviceError::NumaNode)?;

        Ok(Self {
            id: uuid,
            index: index.into(),
            paths,
            health: Health::Healthy,
            topology: numa.map(TopologyInfo::single),
        })
    }

    /// Whether this device is a MIG partition rather than a full GPU.
    pub fn is_mig_device(&self) -> bool {
        self.index.contains(MIG_INDEX_MARKER)
    }

    /// Whether this device can satisfy aligned allocation requests.
    pub fn aligned_allocation_supported(&self) -> bool {
        if self.is_mig_device() {
            return false;
        }
        !self.paths.iter().any(|p| p == DXG_DEVICE_PATH)
    }

    /// The physical UUID, with any replica annotation stripped.
    pub fn uuid(&self) -> &str {
        annotated::get_id(&self.id)
    }

    /// The device's own descriptor, without replica expansion.
    pub fn plugin_device(&self) -> PluginDevice {
        PluginDevice {
            id: self.id.clone(),
            health: self.health,
            topology: self.topology.clone(),
        }
    }

    fn carries_mig_marker(&self) -> bool {
        self.is_mig_device() || self.id.contains(MIG_ID_MARKER)
    }
}

/// Build a device from a driver handle. See [`Device::build`].
pub fn build_device<D>(index: impl Into<String>, info: &D) -> Result<Device, BuildDeviceError>
where
    D: DeviceInfo + ?Sized,
{
    Device::build(index, info)
}

/// The devices on this node, keyed by device ID.
///
/// Whether the collection holds MIG partitions is decided once, when the
/// collection is built.
#[derive(Debug, Clone, Default)]
pub struct Devices {
    devices: HashMap<String, Arc<Device>>,
    has_mig: bool,
}

impl Devices {
    /// Build the inventory from `(index, handle)` pairs.
    ///
    /// Fails on the first handle that cannot be queried; no partial
    /// inventory is returned.
    pub fn build<'a, I, S, D>(handles: I) -> Result<Self, BuildDeviceError>
    where
        I: IntoIterator<Item = (S, &'a D)>,
        S: Into<String>,
        D: DeviceInfo + ?Sized + 'a,
    {
        let mut devices = Vec::new();
        for (index, info) in handles {
            let index: String = index.into();
            match Device::build(index.clone(), info) {
                Ok(device) => {
                    debug!(
                        id = %device.id,
                        index = %device.index,
                        paths = ?device.paths,
                        numa = ?device.topology.as_ref().map(|t| &t.nodes),
                        "Built device"
                    );
                    devices.push(device);
                }
                Err(e) => {
                    warn!(index = %index, error = %e, "Failed to build device");
                    return Err(e);
                }
            }
        }
        Ok(devices.into_iter().collect())
    }

    fn from_shared(devices: HashMap<String, Arc<Device>>) -> Self {
        let has_mig = devices.values().any(|d| d.carries_mig_marker());
        Self { devices, has_mig }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Whether any member is a MIG partition.
    pub fn has_mig(&self) -> bool {
        self.has_mig
    }

    /// Iterate over the devices in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.devices.values().map(|d| d.as_ref())
    }

    /// Whether every id in `ids` names a device in the collection.
    pub fn contains<S: AsRef<str>>(&self, ids: &[S]) -> bool {
        ids.iter().all(|id| self.devices.contains_key(id.as_ref()))
    }

    pub fn get_by_id(&self, id: &str) -> Option<&Device> {
        self.devices.get(id).map(|d| d.as_ref())
    }

    /// The first device with the given index. Indices are unique per
    /// physical device, so which one is "first" does not matter.
    pub fn get_by_index(&self, index: &str) -> Option<&Device> {
        self.iter().find(|d| d.index == index)
    }

    /// The devices matching `ids`. Ids not in the collection are ignored.
    pub fn subset<S: AsRef<str>>(&self, ids: &[S]) -> Devices {
        let devices = ids
            .iter()
            .filter_map(|id| {
                self.devices
                    .get_key_value(id.as_ref())
                    .map(|(k, d)| (k.clone(), Arc::clone(d)))
            })
            .collect();
        Self::from_shared(devices)
    }

    /// The devices in `self` whose id is not in `other`.
    pub fn difference(&self, other: &Devices) -> Devices {
        let devices = self
            .devices
            .iter()
            .filter(|(id, _)| !other.devices.contains_key(*id))
            .map(|(id, d)| (id.clone(), Arc::clone(d)))
            .collect();
        Self::from_shared(devices)
    }

    /// Device ids, in unspecified order.
    pub fn get_ids(&self) -> Vec<&str> {
        self.iter().map(|d| d.id.as_str()).collect()
    }

    /// Device indices, in unspecified order.
    pub fn get_indices(&self) -> Vec<&str> {
        self.iter().map(|d| d.index.as_str()).collect()
    }

    /// All device paths of all devices, in unspecified device order.
    pub fn get_paths(&self) -> Vec<&str> {
        self.iter()
            .flat_map(|d| d.paths.iter().map(String::as_str))
            .collect()
    }

    /// Whether every device supports aligned allocation.
    pub fn aligned_allocation_supported(&self) -> bool {
        self.iter().all(Device::aligned_allocation_supported)
    }

    /// The device list advertised to the kubelet.
    ///
    /// Full GPUs are expanded into `count` replicas named `"<id>-<i>"`,
    /// which carry the device's health and no topology. If the collection
    /// holds any MIG partition, every device is advertised once as-is.
    pub fn plugin_devices(&self, count: u32) -> Vec<PluginDevice> {
        if self.has_mig {
            return self.iter().map(Device::plugin_device).collect();
        }

        let mut res = Vec::with_capacity(self.len() * count as usize);
        for dev in self.iter() {
            for i in 0..count {
                res.push(PluginDevice {
                    id: format!("{}-{}", dev.id, i),
                    health: dev.health,
                    topology: None,
                });
            }
        }
        res
    }
}

impl FromIterator<Device> for Devices {
    /// Collect devices keyed by id. A later device replaces an earlier one
    /// with the same id.
    fn from_iter<T: IntoIterator<Item = Device>>(iter: T) -> Self {
        let devices = iter
            .into_iter()
            .map(|d| (d.id.clone(), Arc::new(d)))
            .collect();
        Self::from_shared(devices)
    }
}
