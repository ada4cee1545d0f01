// SPDX-License-Identifier: GPL-3.0-only

//! Provisioning state machines
//!
//! The only code that changes device state. Each flow is a fixed sequence of
//! named [`Phase`]s; an error in any phase aborts the run and carries the
//! phase name.

mod install;
mod preflight;
mod recovery;

pub use install::install_system;
pub use preflight::{INSTALL_TOOLS, RECOVERY_TOOLS, check_tools, install_tools};
pub use recovery::{RECOVERY_START_MB, copy_recovery};

use std::future::Future;

use installer_contracts::{InstallError, Phase, Result};
use installer_types::{DiskRef, InstallerConfig, Partitions, RecoveryType};
use tracing::info;

use crate::context::HostContext;

/// Run the flow selected by the recovery type.
pub async fn provision(
    host: &HostContext,
    config: &InstallerConfig,
    parts: Partitions,
) -> Result<Partitions> {
    match config.recovery.kind {
        RecoveryType::InstallerOnly => install_system(host, config, parts).await,
        RecoveryType::FactoryCopy => copy_recovery(host, config, parts).await,
    }
}

async fn run_phase<T, F>(phase: Phase, step: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    info!("Phase {phase}");
    step.await.map_err(|e| e.in_phase(phase))
}

/// Source and target disks, which must be distinct
fn distinct_disks(parts: &Partitions) -> Result<(DiskRef, DiskRef)> {
    let (Some(source), Some(target)) = (&parts.source, &parts.target) else {
        return Err(InstallError::Precondition(
            "source and target disks have not been discovered".to_string(),
        ));
    };
    if source.path == target.path {
        return Err(InstallError::Config(format!(
            "source and target are the same disk ({})",
            source.path
        )));
    }
    Ok((source.clone(), target.clone()))
}
