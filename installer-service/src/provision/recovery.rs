// SPDX-License-Identifier: GPL-3.0-only

use installer_contracts::{InstallError, Phase, Result};
use installer_types::{InstallerConfig, Partitions, mib_to_bytes, partition_path};
use tracing::{debug, info};

use super::{check_tools, distinct_disks, preflight::RECOVERY_TOOLS, run_phase};
use crate::context::{HostContext, dir_arg};
use crate::mount::ScopedMount;
use crate::settle::settle;

/// Recovery partition start, in MiB
pub const RECOVERY_START_MB: u64 = 4;

/// Replace the target's table with a single recovery partition holding a
/// copy of the installer image.
pub async fn copy_recovery(
    host: &HostContext,
    config: &InstallerConfig,
    mut parts: Partitions,
) -> Result<Partitions> {
    let (_, target) = distinct_disks(&parts)?;

    let size = config.recovery.recovery_size;
    if size == 0 {
        return Err(InstallError::Config(
            "recovery.recovery_size must be greater than zero".to_string(),
        ));
    }
    let end = RECOVERY_START_MB
        .checked_add(size)
        .filter(|end| mib_to_bytes(*end).is_some())
        .ok_or_else(|| {
            InstallError::Config(format!(
                "recovery.recovery_size {size} MiB is past the end of any disk"
            ))
        })?;
    check_tools(host.runner.as_ref(), RECOVERY_TOOLS)?;

    let runner = host.runner.as_ref();
    let label = config.recovery.fs_label.as_str();
    let number = 1;
    let device = partition_path(&target.path, number);
    parts.recovery_nr = Some(number);

    info!("Copying recovery onto {} ({size} MiB)", target.path);

    run_phase(Phase::CreateRecovery, async {
        let start = RECOVERY_START_MB.to_string();
        let end = end.to_string();
        let nr = number.to_string();
        runner
            .must(
                "parted",
                &[
                    "-ms", "-a", "optimal", &target.path, "unit", "MiB", "mklabel", "gpt",
                    "mkpart", "primary", "fat32", &start, &end, "name", &nr, label, "set", &nr,
                    "boot", "on", "print",
                ],
            )
            .await?;
        settle(runner, host.tree.as_ref(), host.settle, &device).await
    })
    .await?;

    run_phase(Phase::FormatRecovery, async {
        runner
            .must("mkfs.vfat", &["-F", "32", "-n", label, &device])
            .await
            .map(drop)
    })
    .await?;

    let mnt = ScopedMount::mount(
        host.mounter.as_ref(),
        &device,
        &host.paths.recovery_mnt,
        "vfat",
        false,
    )
    .map_err(|e| e.in_phase(Phase::CopyRecovery))?;

    run_phase(Phase::CopyRecovery, async {
        let src = dir_arg(&host.paths.recovery_root);
        let dst = dir_arg(mnt.target());
        runner.must("rsync", &["-aH", &src, &dst]).await?;
        runner.must("sync", &[]).await.map(drop)
    })
    .await?;

    run_phase(Phase::StampBootEnv, async {
        stamp_boot_env(host, mnt.target()).await;
        Ok(())
    })
    .await?;

    mnt.release().map_err(|e| e.in_phase(Phase::CopyRecovery))?;

    info!("Recovery copy finished");
    Ok(parts)
}

/// Mark the copied image for a factory install on next boot. Best-effort.
async fn stamp_boot_env(host: &HostContext, mnt: &std::path::Path) {
    let sysboot = &host.paths.sysboot_mnt;
    let efi_dir = ["EFI", "efi"]
        .into_iter()
        .find(|dir| host.tree.exists(&sysboot.join(dir)));

    let Some(efi_dir) = efi_dir else {
        debug!("No EFI directory under {}, leaving grubenv alone", sysboot.display());
        return;
    };

    let grubenv = mnt.join(efi_dir).join("ubuntu").join("grubenv");
    let grubenv = grubenv.display().to_string();
    host.runner
        .best_effort(
            "grub-editenv",
            &[&grubenv, "set", "recovery_type=factory_install"],
        )
        .await;
}
