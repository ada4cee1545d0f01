//! Common utility types shared across models

use serde::{Deserialize, Serialize};

/// One mebibyte in bytes; all configured sizes are MiB counts.
pub const MIB: u64 = 1024 * 1024;

/// Last byte of the region in front of the first partition.
///
/// Used as the recovery range until the real one is read back from a disk.
pub const LEADING_RESERVED_END: u64 = 20_479;

/// Convert a MiB count to bytes, `None` if it does not fit in a `u64`
pub fn mib_to_bytes(size_mb: u64) -> Option<u64> {
    size_mb.checked_mul(MIB)
}

/// A byte range on a disk, as printed by `parted unit B`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteRange {
    /// Start byte
    pub start: u64,

    /// End byte
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Range starting right after `previous_end` and spanning `size_mb` MiB
    ///
    /// `None` when the range would run past the largest byte offset.
    pub fn following(previous_end: u64, size_mb: u64) -> Option<Self> {
        let start = previous_end.checked_add(1)?;
        let end = start.checked_add(mib_to_bytes(size_mb)?)?;
        Some(Self { start, end })
    }

    /// Distance between start and end in bytes
    pub fn size(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// First byte a partition placed after this one may use
    pub fn next_start(&self) -> u64 {
        self.end.saturating_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn following_range_starts_one_byte_later() {
        let range = ByteRange::following(20_971_520, 100).unwrap();
        assert_eq!(range.start, 20_971_521);
        assert_eq!(range.end, 125_829_121);
        assert_eq!(range.size(), 100 * MIB);
        assert_eq!(range.next_start(), 125_829_122);
    }

    #[test]
    fn oversized_ranges_do_not_wrap() {
        assert_eq!(mib_to_bytes(u64::MAX / MIB + 1), None);
        assert_eq!(ByteRange::following(20_971_520, 17_592_186_044_416), None);
        assert_eq!(ByteRange::following(u64::MAX, 1), None);
        assert_eq!(ByteRange::following(u64::MAX - 2 * MIB, 1).map(|r| r.size()), Some(MIB));
    }

    #[test]
    fn size_never_underflows() {
        assert_eq!(ByteRange::new(10, 5).size(), 0);
    }
}
