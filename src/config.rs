//! Runtime configuration for gpu-device-rm.
//!
//! Configuration is loaded from a JSON file. It carries the GPU sharing
//! policy and, for nodes without a driver query layer, a static description
//! of the devices to inventory.

use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::device::{AnnotatedId, Devices, StaticDeviceInfo};
use crate::error::{AnnotatedIdError, BuildDeviceError};

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "gpu-device-rm", about = "Inspect the GPU device inventory advertised to the kubelet")]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// Replicas advertised per full GPU (overrides the config file).
    #[arg(short, long)]
    pub replicas: Option<u32>,

    /// Resolve granted device IDs (comma separated) to device and replica.
    #[arg(long, value_delimiter = ',')]
    pub resolve: Vec<String>,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

/// A granted device ID mapped back to its physical device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDevice {
    /// The ID as granted by the kubelet.
    pub granted: String,

    /// Physical device UUID.
    pub uuid: String,

    pub replica: u64,

    /// Index of the physical device, if it is in the inventory.
    pub index: Option<String>,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// GPU sharing policy.
    pub sharing: SharingConfig,

    /// Statically described devices.
    pub devices: Vec<StaticDeviceInfo>,
}

/// GPU sharing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SharingConfig {
    /// Number of replicas each full GPU is advertised as.
    pub replicas: u32,

    /// Reject granted IDs whose replica suffix is not a valid index instead
    /// of reading it as replica 0.
    pub strict_replica_ids: bool,
}

impl Default for SharingConfig {
    fn default() -> Self {
        Self {
            replicas: 1,
            strict_replica_ids: false,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults for missing fields.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&data)?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    /// Check settings that deserialization alone cannot.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.sharing.replicas == 0 {
            anyhow::bail!("sharing.replicas must be at least 1");
        }
        Ok(())
    }

    /// Build the device inventory from the configured device descriptions.
    pub fn build_devices(&self) -> Result<Devices, BuildDeviceError> {
        Devices::build(self.devices.iter().map(|d| (d.index.as_str(), d)))
    }

    /// Parse a granted device ID under the configured replica-ID policy.
    pub fn parse_replica_id(&self, raw: &str) -> Result<AnnotatedId, AnnotatedIdError> {
        if self.sharing.strict_replica_ids {
            AnnotatedId::parse_strict(raw)
        } else {
            Ok(AnnotatedId::parse(raw))
        }
    }

    /// Map granted device IDs to physical devices and replica indices.
    ///
    /// IDs whose device is not in `devices` resolve with no index. Under the
    /// strict policy the first malformed ID fails the whole call.
    pub fn resolve_granted<S: AsRef<str>>(
        &self,
        devices: &Devices,
        granted: &[S],
    ) -> Result<Vec<ResolvedDevice>, AnnotatedIdError> {
        granted
            .iter()
            .map(|raw| -> Result<ResolvedDevice, AnnotatedIdError> {
                let raw = raw.as_ref();
                let id = self.parse_replica_id(raw)?;
                let index = devices.get_by_id(&id.id).map(|d| d.index.clone());
                if index.is_none() {
                    tracing::warn!(granted = %raw, uuid = %id.id, "Granted ID not in inventory");
                }
                Ok(ResolvedDevice {
                    granted: raw.to_string(),
                    uuid: id.id,
                    replica: id.replica,
                    index,
                })
            })
            .collect()
    }
}
