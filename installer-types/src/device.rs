//! Block device naming helpers
//!
//! Linux names partitions by appending the partition number to the disk name,
//! with a `p` separator when the disk name itself ends in a digit
//! (`sda` → `sda2`, `mmcblk0` → `mmcblk0p3`, `nvme0n1` → `nvme0n1p1`).

use serde::{Deserialize, Serialize};

/// Disk families whose whole-disk names already end in a digit.
const DIGIT_SUFFIXED_FAMILIES: &[&str] = &["mmcblk", "nvme", "md", "loop", "nbd"];

/// A whole-disk identifier (never carries a partition suffix)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskRef {
    /// Kernel node name (e.g., "sda")
    pub node: String,

    /// Device path (e.g., "/dev/sda")
    pub path: String,
}

impl DiskRef {
    pub fn from_path(path: impl Into<String>) -> Self {
        let path = path.into();
        let node = path.rsplit('/').next().unwrap_or(&path).to_string();
        Self { node, path }
    }
}

/// Split a partition device path into its whole-disk path and partition number.
///
/// Returns `None` when the path does not name a partition.
pub fn split_partition(path: &str) -> Option<(String, u32)> {
    let head = path.trim_end_matches(|c: char| c.is_ascii_digit());
    if head.len() == path.len() {
        return None;
    }
    let number: u32 = path[head.len()..].parse().ok()?;

    if let Some(disk) = head.strip_suffix('p')
        && disk.ends_with(|c: char| c.is_ascii_digit())
    {
        return Some((disk.to_string(), number));
    }

    let name = head.rsplit('/').next().unwrap_or(head);
    if DIGIT_SUFFIXED_FAMILIES
        .iter()
        .any(|family| name.starts_with(family))
    {
        return None;
    }

    Some((head.to_string(), number))
}

/// Whole-disk path for a device path, unchanged if it is already a disk
pub fn whole_disk(path: &str) -> String {
    split_partition(path)
        .map(|(disk, _)| disk)
        .unwrap_or_else(|| path.to_string())
}

/// Device path of partition `number` on `disk`
pub fn partition_path(disk: &str, number: u32) -> String {
    if disk.ends_with(|c: char| c.is_ascii_digit()) {
        format!("{disk}p{number}")
    } else {
        format!("{disk}{number}")
    }
}
