// SPDX-License-Identifier: GPL-3.0-only

use installer_contracts::{CommandRunner, InstallError, Result};
use installer_types::{ByteRange, Partitions};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableEntry {
    pub number: u32,
    pub range: ByteRange,
}

/// A disk's partition table as printed by `parted -ms <disk> unit B print`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionTable {
    pub disk_size: Option<u64>,
    pub entries: Vec<TableEntry>,
}

impl PartitionTable {
    pub fn entry(&self, number: u32) -> Option<&TableEntry> {
        self.entries.iter().find(|entry| entry.number == number)
    }

    pub fn last_number(&self) -> Option<u32> {
        self.entries.iter().map(|entry| entry.number).max()
    }
}

fn parse_bytes(field: &str) -> Option<u64> {
    field.trim().trim_end_matches(';').trim_end_matches('B').parse().ok()
}

/// Parse machine-readable `parted` output in byte units.
pub fn parse_table(output: &str) -> Result<PartitionTable> {
    let mut table = PartitionTable::default();

    for line in output.lines() {
        let fields: Vec<&str> = line.split(':').collect();
        let first = fields[0].trim();

        if first.contains("/dev/") {
            match fields.get(1).and_then(|size| parse_bytes(size)) {
                Some(size) => table.disk_size = Some(size),
                None => warn!("Could not parse disk size from {line:?}"),
            }
            continue;
        }

        let Ok(number) = first.parse::<u32>() else {
            continue;
        };
        if fields.len() < 3 {
            return Err(InstallError::Parse(format!(
                "truncated partition entry {line:?}"
            )));
        }

        let start = parse_bytes(fields[1]).ok_or_else(|| {
            InstallError::Parse(format!("bad start offset in partition entry {line:?}"))
        })?;
        let end = parse_bytes(fields[2]).ok_or_else(|| {
            InstallError::Parse(format!("bad end offset in partition entry {line:?}"))
        })?;

        table.entries.push(TableEntry {
            number,
            range: ByteRange::new(start, end),
        });
    }

    Ok(table)
}

/// Print and parse the partition table of `disk`.
///
/// A failing `parted` (for instance on a disk without a label) is logged and
/// whatever it printed is still parsed.
pub async fn read_table(runner: &dyn CommandRunner, disk: &str) -> Result<PartitionTable> {
    let output = runner.run("parted", &["-ms", disk, "unit", "B", "print"]).await?;
    if !output.success() {
        warn!(
            "parted could not read {disk} (exit {}): {}",
            output.code,
            output.stderr.trim()
        );
    }

    let table = parse_table(&output.stdout)?;
    debug!(
        "{disk}: {} partition(s), size {:?}",
        table.entries.len(),
        table.disk_size
    );
    Ok(table)
}

/// Actual range of partition `number` on `disk`, read back from the device
pub async fn partition_range(
    runner: &dyn CommandRunner,
    disk: &str,
    number: u32,
) -> Result<ByteRange> {
    read_table(runner, disk)
        .await?
        .entry(number)
        .map(|entry| entry.range)
        .ok_or_else(|| InstallError::NotFound(format!("partition {number} on {disk}")))
}

/// Fold a target table into the record.
pub fn apply_table(parts: &mut Partitions, table: &PartitionTable) {
    if table.disk_size.is_some() {
        parts.target_size = table.disk_size;
    }

    if parts.same_disk()
        && let Some(recovery_nr) = parts.recovery_nr
        && let Some(entry) = table.entry(recovery_nr)
    {
        parts.recovery = entry.range;
    }

    if let Some(last) = table.last_number() {
        parts.last_part_nr = Some(last);
    }
}
