// SPDX-License-Identifier: GPL-3.0-only

//! oem-installer - provisions the persistent storage of an OEM device

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use installer_contracts::InstallError;
use installer_service::{HostContext, discover, logging, plan_layout, provision};
use installer_types::{DEFAULT_CONFIG_PATH, InstallerConfig};

/// Unattended first-boot and factory-restore storage provisioner
#[derive(Parser)]
#[command(name = "oem-installer", version)]
#[command(about = "Provision the persistent storage of an OEM device", long_about = None)]
struct Cli {
    /// Filesystem label of the recovery partition on the installer media
    recovery_label: String,

    /// Installer configuration
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Run discovery and planning, print the layout as JSON and exit
    #[arg(long)]
    print_layout: bool,

    /// Also write a log file into this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_dir.as_deref());

    tracing::info!("Starting oem-installer v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(cli).await {
        tracing::error!("{e:#}");
        return Err(e);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = InstallerConfig::load(&cli.config).map_err(InstallError::from)?;
    tracing::info!(
        "Loaded {}: type={:?} bootloader={} boot_size={} MiB swap={} encryption={}",
        config.path.display(),
        config.recovery.kind,
        config.configs.bootloader,
        config.configs.boot_size,
        config.swap_partition_enabled(),
        config.encryption.enabled
    );

    if !cli.print_layout && unsafe { libc::geteuid() } != 0 {
        tracing::error!("oem-installer must run as root");
        anyhow::bail!("oem-installer must run with root privileges");
    }

    let host = HostContext::system();
    let parts = discover(&host, &config, &cli.recovery_label).await?;
    let parts = plan_layout(parts, &config)?;

    if cli.print_layout {
        println!("{}", serde_json::to_string_pretty(&parts)?);
        return Ok(());
    }

    let parts = provision(&host, &config, parts).await?;
    tracing::info!(
        "Provisioning of {} complete",
        parts.target.as_ref().map_or("<unknown>", |t| t.path.as_str())
    );
    Ok(())
}
