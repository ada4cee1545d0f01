// SPDX-License-Identifier: GPL-3.0-only

use installer_contracts::{CommandRunner, InstallError, Result};
use installer_types::split_partition;
use tracing::debug;

/// Where a filesystem label lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelLocation {
    /// Whole-disk node name (e.g. "sda")
    pub node: String,
    /// Whole-disk device path (e.g. "/dev/sda")
    pub path: String,
    pub number: u32,
}

/// Resolve a filesystem label to its disk and partition number with `findfs`.
pub async fn resolve_label(runner: &dyn CommandRunner, label: &str) -> Result<LabelLocation> {
    let query = format!("LABEL={label}");
    let output = runner.run("findfs", &[&query]).await?;
    if !output.success() {
        return Err(InstallError::NotFound(format!(
            "no partition labelled {label:?}"
        )));
    }

    let full_path = output.stdout.trim();
    if !full_path.starts_with("/dev/") {
        return Err(InstallError::NotFound(format!(
            "label {label:?} resolved to {full_path:?}, not a device"
        )));
    }

    let (path, number) = split_partition(full_path).ok_or_else(|| {
        InstallError::Parse(format!("{full_path} has no partition number"))
    })?;
    let node = path.rsplit('/').next().unwrap_or(&path).to_string();

    debug!("LABEL={label} is partition {number} of {path}");
    Ok(LabelLocation { node, path, number })
}

#[cfg(test)]
mod tests {
    use super::*;
    use installer_contracts::InstallErrorKind;
    use installer_testing::{FakeRunner, Reply};

    async fn resolve(stdout: &str) -> Result<LabelLocation> {
        let runner = FakeRunner::new();
        runner.reply("findfs", Reply::ok(stdout));
        resolve_label(&runner, "recovery").await
    }

    #[tokio::test]
    async fn splits_emmc_scsi_and_nvme_paths() {
        let emmc = resolve("/dev/mmcblk0p3\n").await.unwrap();
        assert_eq!(
            emmc,
            LabelLocation {
                node: "mmcblk0".to_string(),
                path: "/dev/mmcblk0".to_string(),
                number: 3,
            }
        );

        let scsi = resolve("/dev/sda2\n").await.unwrap();
        assert_eq!((scsi.path.as_str(), scsi.number), ("/dev/sda", 2));

        let nvme = resolve("/dev/nvme0n1p1\n").await.unwrap();
        assert_eq!((nvme.path.as_str(), nvme.number), ("/dev/nvme0n1", 1));
        assert_eq!(nvme.node, "nvme0n1");
    }

    #[tokio::test]
    async fn queries_by_label() {
        let runner = FakeRunner::new();
        runner.reply("findfs", Reply::ok("/dev/sdb1\n"));
        resolve_label(&runner, "INSTALLER").await.unwrap();
        assert_eq!(runner.calls(), vec!["findfs LABEL=INSTALLER".to_string()]);
    }

    #[tokio::test]
    async fn failed_lookup_is_not_found() {
        let runner = FakeRunner::new();
        runner.reply("findfs", Reply::fail(1, "findfs: unable to resolve 'LABEL=nope'"));
        let err = resolve_label(&runner, "nope").await.unwrap_err();
        assert_eq!(err.kind(), InstallErrorKind::NotFound);
    }

    #[tokio::test]
    async fn non_device_output_is_not_found() {
        let err = resolve("UUID=1234\n").await.unwrap_err();
        assert_eq!(err.kind(), InstallErrorKind::NotFound);
    }

    #[tokio::test]
    async fn whole_disk_is_parse_error() {
        let err = resolve("/dev/mmcblk1\n").await.unwrap_err();
        assert_eq!(err.kind(), InstallErrorKind::Parse);
    }
}
