// SPDX-License-Identifier: GPL-3.0-only

//! Offset planning for partitions that do not exist yet
//!
//! Under grub each planned partition starts one byte after the end of the
//! partition before it. u-boot layouts are fixed by the board image and are
//! left alone. Writable is never planned; it takes the rest of the disk.

use installer_contracts::{InstallError, Result};
use installer_types::{Bootloader, ByteRange, InstallerConfig, PartitionRole, Partitions};
use tracing::{debug, warn};

/// Smallest system-boot size (MiB) worth planning
pub const MIN_BOOT_SIZE_MB: u64 = 50;

/// Plan the byte range of `role`.
pub fn plan_offset(
    mut parts: Partitions,
    role: PartitionRole,
    size_mb: u64,
    bootloader: Bootloader,
) -> Result<Partitions> {
    match role {
        PartitionRole::SystemBoot => {
            if bootloader == Bootloader::Grub {
                parts.sysboot = Some(range_after(parts.recovery.end, role, size_mb)?);
            }
        }
        PartitionRole::Swap => {
            if bootloader == Bootloader::Grub {
                let sysboot = parts.sysboot.ok_or_else(|| {
                    InstallError::Precondition(
                        "swap cannot be planned before system-boot".to_string(),
                    )
                })?;
                parts.swap = Some(range_after(sysboot.end, role, size_mb)?);
            }
        }
        PartitionRole::Recovery | PartitionRole::Writable => {
            return Err(InstallError::UnknownRole(role.label().to_string()));
        }
    }
    Ok(parts)
}

fn range_after(previous_end: u64, role: PartitionRole, size_mb: u64) -> Result<ByteRange> {
    ByteRange::following(previous_end, size_mb).ok_or_else(|| {
        InstallError::Config(format!(
            "{role} of {size_mb} MiB after byte {previous_end} is past the end of any disk"
        ))
    })
}

/// Plan every partition the configuration asks for.
pub fn plan_layout(mut parts: Partitions, config: &InstallerConfig) -> Result<Partitions> {
    let system = &config.configs;

    if system.boot_size < MIN_BOOT_SIZE_MB {
        warn!(
            "system-boot size {} MiB is below {MIN_BOOT_SIZE_MB} MiB, not planning it",
            system.boot_size
        );
    } else {
        parts = plan_offset(
            parts,
            PartitionRole::SystemBoot,
            system.boot_size,
            system.bootloader,
        )?;
    }

    if config.swap_partition_enabled() {
        if parts.sysboot.is_some() || system.bootloader == Bootloader::UBoot {
            parts = plan_offset(parts, PartitionRole::Swap, system.swap_size, system.bootloader)?;
        } else {
            warn!("system-boot is not planned, not planning swap either");
        }
    }

    debug!(
        "Planned layout: system-boot {:?}, swap {:?}",
        parts.sysboot, parts.swap
    );
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use installer_contracts::InstallErrorKind;
    use installer_types::MIB;

    fn with_recovery_end(end: u64) -> Partitions {
        let mut parts = Partitions::new();
        parts.recovery = ByteRange::new(1_048_576, end);
        parts
    }

    fn config(yaml: &str) -> InstallerConfig {
        InstallerConfig::from_yaml_str(yaml).unwrap()
    }

    #[test]
    fn system_boot_follows_recovery() {
        let parts = plan_offset(
            with_recovery_end(20_971_520),
            PartitionRole::SystemBoot,
            100,
            Bootloader::Grub,
        )
        .unwrap();
        assert_eq!(parts.sysboot, Some(ByteRange::new(20_971_521, 125_829_121)));
    }

    #[test]
    fn swap_follows_system_boot() {
        let mut parts = Partitions::new();
        parts.sysboot = Some(ByteRange::new(20_971_521, 125_829_121));

        let parts = plan_offset(parts, PartitionRole::Swap, 512, Bootloader::Grub).unwrap();
        assert_eq!(parts.swap, Some(ByteRange::new(125_829_122, 662_700_034)));
    }

    #[test]
    fn planned_size_matches_request() {
        for size in [1, 50, 512, 4096] {
            let parts = plan_offset(
                with_recovery_end(20_479),
                PartitionRole::SystemBoot,
                size,
                Bootloader::Grub,
            )
            .unwrap();
            let range = parts.sysboot.unwrap();
            assert_eq!(range.end - range.start, size * MIB);
            assert!(range.start > parts.recovery.end);
        }
    }

    #[test]
    fn uboot_leaves_record_unchanged() {
        let before = with_recovery_end(20_971_520);
        let after = plan_offset(
            before.clone(),
            PartitionRole::SystemBoot,
            100,
            Bootloader::UBoot,
        )
        .unwrap();
        assert_eq!(after, before);

        let after = plan_offset(before.clone(), PartitionRole::Swap, 512, Bootloader::UBoot).unwrap();
        assert_eq!(after, before);
    }

    #[test]
    fn swap_before_system_boot_is_precondition() {
        let err = plan_offset(Partitions::new(), PartitionRole::Swap, 512, Bootloader::Grub)
            .unwrap_err();
        assert_eq!(err.kind(), InstallErrorKind::Precondition);
    }

    #[test]
    fn recovery_and_writable_are_not_planned() {
        for role in [PartitionRole::Recovery, PartitionRole::Writable] {
            let err = plan_offset(Partitions::new(), role, 100, Bootloader::Grub).unwrap_err();
            assert_eq!(err.kind(), InstallErrorKind::UnknownRole);
        }
    }

    #[test]
    fn layout_plans_boot_and_swap_in_order() {
        let cfg = config(
            "recovery:\n  type: installer-only\nconfigs:\n  boot_size: 100\n  swap: true\n  swap_size: 512\n",
        );
        let parts = plan_layout(with_recovery_end(20_971_520), &cfg).unwrap();

        let sysboot = parts.sysboot.unwrap();
        let swap = parts.swap.unwrap();
        assert_eq!(sysboot, ByteRange::new(20_971_521, 125_829_121));
        assert_eq!(swap, ByteRange::new(125_829_122, 662_700_034));
        assert!(swap.start > sysboot.end);
    }

    #[test]
    fn small_boot_size_is_skipped_not_fatal() {
        let cfg = config(
            "recovery:\n  type: installer-only\nconfigs:\n  boot_size: 10\n  swap: true\n  swap_size: 512\n",
        );
        let parts = plan_layout(with_recovery_end(20_971_520), &cfg).unwrap();
        assert_eq!(parts.sysboot, None);
        assert_eq!(parts.swap, None);
    }

    #[test]
    fn swap_file_plans_no_swap_partition() {
        let cfg = config(
            "recovery:\n  type: installer-only\nconfigs:\n  boot_size: 100\n  swap: true\n  swap_file: true\n  swap_size: 512\n",
        );
        let parts = plan_layout(with_recovery_end(20_971_520), &cfg).unwrap();
        assert!(parts.sysboot.is_some());
        assert_eq!(parts.swap, None);
    }

    #[test]
    fn oversized_boot_is_a_config_error() {
        let err = plan_offset(
            with_recovery_end(20_971_520),
            PartitionRole::SystemBoot,
            17_592_186_044_416,
            Bootloader::Grub,
        )
        .unwrap_err();
        assert_eq!(err.kind(), InstallErrorKind::Config);

        let mut cfg = config("recovery:\n  type: installer-only\n");
        cfg.configs.boot_size = 17_592_186_044_416;
        let err = plan_layout(Partitions::new(), &cfg).unwrap_err();
        assert_eq!(err.kind(), InstallErrorKind::Config);
    }

    #[test]
    fn swap_running_past_last_byte_is_a_config_error() {
        let mut parts = Partitions::new();
        parts.sysboot = Some(ByteRange::new(20_971_521, u64::MAX - MIB));

        let err = plan_offset(parts, PartitionRole::Swap, 2, Bootloader::Grub).unwrap_err();
        assert_eq!(err.kind(), InstallErrorKind::Config);
    }

    #[test]
    fn planning_is_deterministic() {
        let cfg = config("recovery:\n  type: installer-only\n");
        let a = plan_layout(with_recovery_end(20_971_520), &cfg).unwrap();
        let b = plan_layout(with_recovery_end(20_971_520), &cfg).unwrap();
        assert_eq!(a, b);
    }
}
