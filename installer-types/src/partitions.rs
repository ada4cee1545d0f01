//! The provisioning record shared by discovery, planning and provisioning

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ByteRange, DiskRef, LEADING_RESERVED_END};

/// Role a partition plays in the installed layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PartitionRole {
    Recovery,
    SystemBoot,
    Swap,
    Writable,
}

impl PartitionRole {
    /// Filesystem label used for the role.
    ///
    /// The recovery label is configurable; this is only its default.
    pub fn label(self) -> &'static str {
        match self {
            Self::Recovery => "recovery",
            Self::SystemBoot => "system-boot",
            Self::Swap => "swap",
            Self::Writable => "writable",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "recovery" => Some(Self::Recovery),
            "system-boot" => Some(Self::SystemBoot),
            "swap" => Some(Self::Swap),
            "writable" => Some(Self::Writable),
            _ => None,
        }
    }
}

impl fmt::Display for PartitionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Partition layout of the source and target disks for a single run
///
/// Partition numbers are 1-based; `None` means the role is not present (or
/// not created yet). Ranges other than recovery are `None` until planned or
/// read back from the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partitions {
    // === Disks ===
    /// Installer media holding the recovery partition
    pub source: Option<DiskRef>,

    /// Disk being provisioned
    pub target: Option<DiskRef>,

    // === Partition numbers ===
    pub recovery_nr: Option<u32>,
    pub sysboot_nr: Option<u32>,
    pub swap_nr: Option<u32>,
    pub writable_nr: Option<u32>,

    /// Highest partition index found on the target
    pub last_part_nr: Option<u32>,

    // === Byte ranges ===
    /// Recovery range; the leading reserved region until read back
    pub recovery: ByteRange,
    pub sysboot: Option<ByteRange>,
    pub swap: Option<ByteRange>,
    pub writable: Option<ByteRange>,

    /// Total target disk size in bytes
    pub target_size: Option<u64>,
}

impl Default for Partitions {
    fn default() -> Self {
        Self::new()
    }
}

impl Partitions {
    pub fn new() -> Self {
        Self {
            source: None,
            target: None,
            recovery_nr: None,
            sysboot_nr: None,
            swap_nr: None,
            writable_nr: None,
            last_part_nr: None,
            recovery: ByteRange::new(0, LEADING_RESERVED_END),
            sysboot: None,
            swap: None,
            writable: None,
            target_size: None,
        }
    }

    /// True when source and target resolve to the same disk
    pub fn same_disk(&self) -> bool {
        match (&self.source, &self.target) {
            (Some(source), Some(target)) => source.path == target.path,
            _ => false,
        }
    }

    pub fn number(&self, role: PartitionRole) -> Option<u32> {
        match role {
            PartitionRole::Recovery => self.recovery_nr,
            PartitionRole::SystemBoot => self.sysboot_nr,
            PartitionRole::Swap => self.swap_nr,
            PartitionRole::Writable => self.writable_nr,
        }
    }

    pub fn range(&self, role: PartitionRole) -> Option<ByteRange> {
        match role {
            PartitionRole::Recovery => Some(self.recovery),
            PartitionRole::SystemBoot => self.sysboot,
            PartitionRole::Swap => self.swap,
            PartitionRole::Writable => self.writable,
        }
    }
}
