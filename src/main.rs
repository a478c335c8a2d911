//! gpu-device-rm: inspect the GPU inventory a device plugin would advertise.
//!
//! Builds the device inventory from the configured device descriptions and
//! prints the replica-expanded list the kubelet would see. With `--resolve`,
//! maps granted device IDs back to physical devices.

use clap::Parser;
use tracing::{info, warn};

use gpu_device_rm::config::{Cli, Config};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "gpu_device_rm=debug"
    } else {
        "gpu_device_rm=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!("gpu-device-rm v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load(&cli.config)?;
    if let Some(replicas) = cli.replicas {
        config.sharing.replicas = replicas;
        config.validate()?;
    }

    let devices = config.build_devices()?;
    if devices.is_empty() {
        warn!("No devices configured");
    }

    info!(
        devices = devices.len(),
        mig = devices.has_mig(),
        aligned_allocation = devices.aligned_allocation_supported(),
        replicas = config.sharing.replicas,
        "Device inventory built"
    );

    if cli.resolve.is_empty() {
        let advertised = devices.plugin_devices(config.sharing.replicas);
        println!("{}", serde_json::to_string_pretty(&advertised)?);
    } else {
        let resolved = config.resolve_granted(&devices, &cli.resolve)?;
        println!("{}", serde_json::to_string_pretty(&resolved)?);
    }

    Ok(())
}
