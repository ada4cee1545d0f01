// SPDX-License-Identifier: GPL-3.0-only

use std::path::Path;

use installer_contracts::{CommandRunner, InstallError, Phase, Result};
use installer_sys::KeyFile;
use installer_types::{
    ByteRange, DiskRef, InstallerConfig, PartitionRole, Partitions, partition_path,
};
use tracing::{debug, info};

use super::{check_tools, distinct_disks, install_tools, run_phase};
use crate::context::{HostContext, dir_arg};
use crate::discovery::partition_range;
use crate::mount::ScopedMount;
use crate::settle::settle;

/// Partition numbers on the source image
const SOURCE_SYSBOOT_NR: u32 = 2;
const SOURCE_WRITABLE_NR: u32 = 3;

struct Install<'a> {
    host: &'a HostContext,
    config: &'a InstallerConfig,
    source: DiskRef,
    target: DiskRef,
    /// Target path as given to partitioning tools
    disk: String,
    parts: Partitions,
}

/// Rebuild the target disk as a full system: system-boot, optional swap and
/// writable, each copied from the source image.
pub async fn install_system(
    host: &HostContext,
    config: &InstallerConfig,
    mut parts: Partitions,
) -> Result<Partitions> {
    let (source, target) = distinct_disks(&parts)?;

    parts.sysboot_nr = Some(1);
    if config.swap_partition_enabled() {
        parts.swap_nr = Some(2);
        parts.writable_nr = Some(3);
    } else {
        parts.swap_nr = None;
        parts.writable_nr = Some(2);
    }

    let Some(sysboot) = parts.sysboot else {
        return Err(InstallError::Precondition(
            "system-boot offsets are not planned".to_string(),
        ));
    };
    if sysboot.end <= sysboot.start {
        return Err(InstallError::Precondition(format!(
            "planned system-boot range {sysboot:?} is empty"
        )));
    }
    if config.swap_partition_enabled() {
        match parts.swap {
            None => {
                return Err(InstallError::Precondition(
                    "swap is enabled but its offsets are not planned".to_string(),
                ));
            }
            Some(swap) if swap.end <= swap.start || swap.start <= sysboot.end => {
                return Err(InstallError::Precondition(format!(
                    "planned swap range {swap:?} does not follow system-boot {sysboot:?}"
                )));
            }
            Some(_) => {}
        }
    }
    check_tools(host.runner.as_ref(), &install_tools(config))?;

    let disk = target.path.replace("mapper/", "");
    info!("Installing system onto {disk} from {}", source.path);

    let mut install = Install {
        host,
        config,
        source,
        target,
        disk,
        parts,
    };
    install.run().await?;

    info!("System install finished");
    Ok(install.parts)
}

impl Install<'_> {
    fn runner(&self) -> &dyn CommandRunner {
        self.host.runner.as_ref()
    }

    fn number(&self, role: PartitionRole) -> Result<u32> {
        self.parts
            .number(role)
            .ok_or_else(|| InstallError::Precondition(format!("{role} has no partition number")))
    }

    fn target_partition(&self, number: u32) -> String {
        partition_path(&self.target.path, number)
    }

    async fn settle(&self, device: &str) -> Result<()> {
        let host = self.host;
        settle(self.runner(), host.tree.as_ref(), host.settle, device).await
    }

    async fn run(&mut self) -> Result<()> {
        run_phase(Phase::TableReset, self.table_reset()).await?;
        let sysboot = run_phase(Phase::CreateBoot, self.create_boot()).await?;
        run_phase(Phase::FormatBoot, self.format_boot(&sysboot)).await?;
        run_phase(Phase::CopyBoot, self.copy_boot(&sysboot)).await?;

        if self.config.swap_partition_enabled() {
            let swap = run_phase(Phase::CreateSwap, self.create_swap()).await?;
            self.parts.swap = Some(swap);
        }

        let writable = run_phase(Phase::CreateWritable, self.create_writable()).await?;
        self.parts.writable = Some(writable);

        let device = if self.config.encryption.enabled {
            run_phase(Phase::Encrypt, self.encrypt()).await?
        } else {
            self.target_partition(self.number(PartitionRole::Writable)?)
        };

        run_phase(Phase::FormatWritable, self.format_writable(&device)).await?;
        run_phase(Phase::CopyWritable, self.copy_writable(&device)).await?;
        run_phase(Phase::Attest, self.attest()).await
    }

    async fn table_reset(&self) -> Result<()> {
        let disk = self.disk.as_str();
        self.runner()
            .must("sgdisk", &[disk, "--randomize-guids", "--move-second-header"])
            .await?;
        self.runner()
            .must("parted", &["-ms", disk, "mklabel", "gpt"])
            .await
            .map(drop)
    }

    async fn create_boot(&self) -> Result<String> {
        let number = self.number(PartitionRole::SystemBoot)?;
        let range = self.parts.sysboot.ok_or_else(|| {
            InstallError::Precondition("system-boot offsets are not planned".to_string())
        })?;

        self.mkpart(
            "fat32",
            &format!("{}B", range.start),
            &format!("{}B", range.end),
            number,
            PartitionRole::SystemBoot,
        )
        .await?;

        let device = self.target_partition(number);
        self.settle(&device).await?;
        Ok(device)
    }

    async fn format_boot(&self, device: &str) -> Result<()> {
        let label = PartitionRole::SystemBoot.label();
        self.runner()
            .must("mkfs.vfat", &["-F", "32", "-n", label, device])
            .await
            .map(drop)
    }

    async fn copy_boot(&self, device: &str) -> Result<()> {
        let paths = &self.host.paths;
        let source = partition_path(&self.source.path, SOURCE_SYSBOOT_NR);
        self.copy_tree(
            (source.as_str(), paths.source_sysboot_mnt.as_path()),
            (device, paths.sysboot_mnt.as_path()),
            "vfat",
        )
        .await?;

        let number = self.number(PartitionRole::SystemBoot)?.to_string();
        self.runner()
            .must("parted", &["-ms", &self.disk, "set", &number, "boot", "on"])
            .await
            .map(drop)
    }

    async fn create_swap(&self) -> Result<ByteRange> {
        let sysboot_nr = self.number(PartitionRole::SystemBoot)?;
        let number = self.number(PartitionRole::Swap)?;
        let planned = self.parts.swap.ok_or_else(|| {
            InstallError::Precondition("swap offsets are not planned".to_string())
        })?;

        let sysboot = partition_range(self.runner(), &self.disk, sysboot_nr).await?;
        let start = sysboot.next_start();
        let end = start.checked_add(planned.size()).ok_or_else(|| {
            InstallError::Config(format!("swap of {} bytes runs past the disk", planned.size()))
        })?;
        let range = ByteRange::new(start, end);
        debug!("swap placed at {range:?} (planned {planned:?})");

        self.mkpart(
            "linux-swap",
            &format!("{}B", range.start),
            &format!("{}B", range.end),
            number,
            PartitionRole::Swap,
        )
        .await?;

        let device = self.target_partition(number);
        self.settle(&device).await?;
        self.runner().must("mkswap", &[&device]).await?;
        Ok(range)
    }

    async fn create_writable(&self) -> Result<ByteRange> {
        let number = self.number(PartitionRole::Writable)?;
        let previous = match self.parts.swap_nr {
            Some(swap_nr) => swap_nr,
            None => self.number(PartitionRole::SystemBoot)?,
        };

        let previous_range = partition_range(self.runner(), &self.disk, previous).await?;
        let start = previous_range.next_start();

        self.mkpart("ext4", &format!("{start}B"), "100%", number, PartitionRole::Writable)
            .await?;

        let range = partition_range(self.runner(), &self.disk, number).await?;
        let device = self.target_partition(number);
        self.settle(&device).await?;
        if self.config.encryption.enabled {
            self.runner().must("modprobe", &["dm_crypt"]).await?;
        } else {
            self.runner().best_effort("modprobe", &["dm_crypt"]).await;
        }
        Ok(range)
    }

    /// Put writable in a LUKS container and open it. Returns the mapped device.
    async fn encrypt(&self) -> Result<String> {
        let encryption = &self.config.encryption;
        let device = self.target_partition(self.number(PartitionRole::Writable)?);

        let key = KeyFile::generate(&self.host.paths.key_dir, encryption.key_file.as_deref())?;
        let key_path = key.path().display().to_string();

        self.runner()
            .must("cryptsetup", &["--batch-mode", "luksFormat", &device, &key_path])
            .await?;
        self.runner()
            .must(
                "cryptsetup",
                &["--key-file", &key_path, "open", &device, &encryption.mapper_name],
            )
            .await?;
        key.destroy()?;

        let mapped = format!("/dev/mapper/{}", encryption.mapper_name);
        info!("Writable is encrypted and open as {mapped}");
        Ok(mapped)
    }

    async fn format_writable(&self, device: &str) -> Result<()> {
        let label = PartitionRole::Writable.label();
        self.runner()
            .must("mkfs.ext4", &["-F", "-L", label, device])
            .await
            .map(drop)
    }

    async fn copy_writable(&self, device: &str) -> Result<()> {
        let paths = &self.host.paths;
        let source = partition_path(&self.source.path, SOURCE_WRITABLE_NR);
        self.copy_tree(
            (source.as_str(), paths.source_writable_mnt.as_path()),
            (device, paths.writable_mnt.as_path()),
            "ext4",
        )
        .await?;

        if self.config.encryption.enabled {
            self.runner()
                .best_effort("cryptsetup", &["close", &self.config.encryption.mapper_name])
                .await;
        }
        Ok(())
    }

    async fn attest(&self) -> Result<()> {
        let tpm = format!("device:{}", self.config.encryption.attestation_device);
        if let Some(output) = self.runner().best_effort("tpm2_pcrlist", &["-T", &tpm]).await {
            info!("Recorded PCR values from {}", self.config.encryption.attestation_device);
            debug!("{}", output.stdout.trim());
        }
        Ok(())
    }

    async fn mkpart(
        &self,
        fs: &str,
        start: &str,
        end: &str,
        number: u32,
        role: PartitionRole,
    ) -> Result<()> {
        let nr = number.to_string();
        self.runner()
            .must(
                "parted",
                &[
                    "-a", "optimal", "-ms", &self.disk, "--", "mkpart", "primary", fs, start,
                    end, "name", &nr, role.label(),
                ],
            )
            .await
            .map(drop)
    }

    /// Mount `from` read-only and `to` read-write, copy, then unmount both.
    async fn copy_tree(
        &self,
        (from_dev, from_mnt): (&str, &Path),
        (to_dev, to_mnt): (&str, &Path),
        fstype: &str,
    ) -> Result<()> {
        let mounter = self.host.mounter.as_ref();
        let dst = ScopedMount::mount(mounter, to_dev, to_mnt, fstype, false)?;
        let src = ScopedMount::mount(mounter, from_dev, from_mnt, fstype, true)?;

        let src_dir = dir_arg(src.target());
        let dst_dir = dir_arg(dst.target());
        self.runner().must("rsync", &["-aH", &src_dir, &dst_dir]).await?;
        self.runner().must("sync", &[]).await?;

        src.release()?;
        dst.release()
    }
}
