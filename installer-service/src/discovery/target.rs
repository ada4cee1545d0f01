// SPDX-License-Identifier: GPL-3.0-only

//! Target disk selection
//!
//! With no configured override, the target is the first block device that is
//! not the source disk, searched in a fixed class order: software RAID, eMMC,
//! SCSI, then NVMe.

use std::path::{Path, PathBuf};

use installer_contracts::{InstallError, Result, SystemTree};
use installer_types::{DiskRef, Partitions, whole_disk};
use tracing::{debug, info};

const SYS_BLOCK: &str = "/sys/block";
const RAID_MARKER: &str = "/sys/block/md126/dev";
const CANONICAL_EMMC: &str = "/dev/mmcblk0";

/// One device class to search for a target disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// Firmware RAID assembled as md126
    Raid,
    Emmc,
    Scsi,
    Nvme,
}

/// Search order; the first probe yielding a candidate wins.
pub const PROBE_ORDER: [Probe; 4] = [Probe::Raid, Probe::Emmc, Probe::Scsi, Probe::Nvme];

impl Probe {
    fn prefix(self) -> &'static str {
        match self {
            Self::Raid => "md126",
            Self::Emmc => "mmcblk",
            Self::Scsi => "sd",
            Self::Nvme => "nvme",
        }
    }

    /// Candidate device path other than `source`, if this class has one
    pub fn probe(self, tree: &dyn SystemTree, source: &str) -> Result<Option<String>> {
        match self {
            Self::Raid => {
                if !tree.exists(Path::new(RAID_MARKER)) {
                    return Ok(None);
                }
                info!("Found RAID device enabled in firmware");
                let device = resolve_block_device(tree, Path::new(RAID_MARKER))?;
                Ok((device != source).then_some(device))
            }
            Self::Emmc | Self::Scsi | Self::Nvme => {
                for block in tree.list(Path::new(SYS_BLOCK), self.prefix())? {
                    if self == Self::Emmc && is_emmc_hw_area(&block) {
                        debug!("Skipping eMMC hardware area {}", block.display());
                        continue;
                    }
                    let device = resolve_block_device(tree, &block.join("dev"))?;
                    if device == source {
                        continue;
                    }
                    if self == Self::Emmc && device == CANONICAL_EMMC {
                        return Ok(Some(device));
                    }
                    return Ok(Some(self.normalize(device)));
                }
                Ok(None)
            }
        }
    }

    fn normalize(self, device: String) -> String {
        match self {
            Self::Raid | Self::Nvme => device,
            Self::Emmc | Self::Scsi => whole_disk(&device),
        }
    }
}

/// Boot and RPMB areas of an eMMC (`mmcblk0boot0`, `mmcblk0rpmb`) share the
/// `mmcblk` prefix but are not disks.
fn is_emmc_hw_area(block: &Path) -> bool {
    block
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.contains("boot") || name.contains("rpmb"))
}

/// Resolve a sysfs `dev` file (`maj:min`) to the real device path
fn resolve_block_device(tree: &dyn SystemTree, dev_file: &Path) -> Result<String> {
    let major_minor = tree.read_to_string(dev_file)?;
    let link = PathBuf::from(format!("/dev/block/{}", major_minor.trim()));
    let real = tree.canonicalize(&link)?;
    Ok(real.display().to_string())
}

/// Pick the disk to provision.
///
/// `device_override` is used verbatim when set.
pub fn find_target(
    tree: &dyn SystemTree,
    parts: &Partitions,
    device_override: Option<&str>,
) -> Result<DiskRef> {
    let source = match (&parts.source, parts.recovery_nr) {
        (Some(source), Some(_)) if !source.path.is_empty() => source,
        _ => {
            return Err(InstallError::Precondition(
                "source recovery partition has not been discovered".to_string(),
            ));
        }
    };

    if let Some(device) = device_override {
        info!("Using configured recovery device {device}");
        return Ok(DiskRef::from_path(device));
    }

    for probe in PROBE_ORDER {
        if let Some(device) = probe.probe(tree, &source.path)? {
            debug!("{probe:?} probe selected {device}");
            return Ok(DiskRef::from_path(device));
        }
    }

    Err(InstallError::NotFound(format!(
        "no target disk other than {}",
        source.path
    )))
}
