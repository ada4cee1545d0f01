// SPDX-License-Identifier: GPL-3.0-only

//! Source and target discovery
//!
//! Builds the [`Partitions`] record for a run: the source disk from the
//! recovery label, the target disk from the device-class search, any
//! well-known partitions already present, and the target's partition table.

mod label;
mod table;
mod target;

pub use label::{LabelLocation, resolve_label};
pub use table::{
    PartitionTable, TableEntry, apply_table, parse_table, partition_range, read_table,
};
pub use target::{PROBE_ORDER, Probe, find_target};

use installer_contracts::Result;
use installer_types::{DiskRef, InstallerConfig, PartitionRole, Partitions};
use tracing::{debug, info};

use crate::context::HostContext;

/// Discover source and target disks for a run.
pub async fn discover(
    host: &HostContext,
    config: &InstallerConfig,
    recovery_label: &str,
) -> Result<Partitions> {
    let runner = host.runner.as_ref();
    let mut parts = Partitions::new();

    let recovery = resolve_label(runner, recovery_label).await?;
    info!(
        "Recovery partition {recovery_label:?} is partition {} of {}",
        recovery.number, recovery.path
    );
    parts.source = Some(DiskRef {
        node: recovery.node.clone(),
        path: recovery.path.clone(),
    });
    parts.recovery_nr = Some(recovery.number);

    let target = find_target(
        host.tree.as_ref(),
        &parts,
        config.recovery.recovery_device.as_deref(),
    )?;
    info!("Target disk is {}", target.path);
    parts.target = Some(target);

    match resolve_label(runner, PartitionRole::SystemBoot.label()).await {
        Ok(found) if found.node != recovery.node => parts.sysboot_nr = Some(found.number),
        Ok(_) => debug!("system-boot found on the source disk, ignoring"),
        Err(e) => debug!("No system-boot partition: {e}"),
    }
    match resolve_label(runner, PartitionRole::Swap.label()).await {
        Ok(found) => parts.swap_nr = Some(found.number),
        Err(e) => debug!("No swap partition: {e}"),
    }
    match resolve_label(runner, PartitionRole::Writable.label()).await {
        Ok(found) => parts.writable_nr = Some(found.number),
        Err(e) => debug!("No writable partition: {e}"),
    }

    if parts.recovery_nr.is_none() && parts.sysboot_nr.is_none() && parts.writable_nr.is_none() {
        return Ok(parts);
    }

    let Some(target) = &parts.target else {
        return Ok(parts);
    };
    let device = format!("/dev/{}", target.node);
    let table = read_table(runner, &device).await?;
    apply_table(&mut parts, &table);

    Ok(parts)
}
