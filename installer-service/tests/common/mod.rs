// SPDX-License-Identifier: GPL-3.0-only
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use installer_service::{HostContext, SettlePolicy, WorkPaths};
use installer_testing::{FakeMounter, FakeRunner, FakeTree, PartedDisk, Reply};
use installer_types::{ByteRange, DiskRef, InstallerConfig, Partitions};
use tempfile::TempDir;

pub const DISK_SIZE: u64 = 32_017_047_552;

/// A host with an installer stick at /dev/sda and a blank disk at /dev/sdb
pub struct Lab {
    pub tree: FakeTree,
    pub runner: Arc<FakeRunner>,
    pub mounter: Arc<FakeMounter>,
    pub keys: TempDir,
}

impl Lab {
    pub fn new() -> Self {
        let tree = FakeTree::new();
        tree.add_block_device("sda", "8:0")
            .add_block_device("sdb", "8:16");
        let runner = Arc::new(FakeRunner::with_tree(tree.clone()));
        Self {
            tree,
            runner,
            mounter: Arc::new(FakeMounter::new()),
            keys: tempfile::tempdir().unwrap(),
        }
    }

    pub fn host(&self) -> HostContext {
        HostContext::new(
            self.runner.clone(),
            Arc::new(self.tree.clone()),
            self.mounter.clone(),
        )
        .with_settle(SettlePolicy {
            attempts: 3,
            interval: Duration::from_millis(100),
        })
        .with_paths(WorkPaths {
            key_dir: self.keys.path().join("run"),
            ..WorkPaths::default()
        })
    }

    /// New partitions on /dev/sdb show up as device nodes once created
    pub fn partitions_appear(&self) -> &Self {
        let mkpart = "parted -a optimal -ms /dev/sdb -- mkpart primary";
        self.runner
            .creates(&format!("{mkpart} fat32"), "/dev/sdb1")
            .creates(&format!("{mkpart} linux-swap"), "/dev/sdb2");
        self
    }

    /// Writable lands on partition `number`
    pub fn writable_appears_as(&self, number: u32) -> &Self {
        self.runner.creates(
            "parted -a optimal -ms /dev/sdb -- mkpart primary ext4",
            format!("/dev/sdb{number}"),
        );
        self
    }

    /// Queue the tables `parted ... unit B print` reports, one per read-back
    pub fn tables(&self, tables: &[PartedDisk]) -> &Self {
        for table in tables {
            self.runner
                .reply("parted -ms /dev/sdb unit B print", Reply::ok(table.render()));
        }
        self
    }
}

pub fn config(yaml: &str) -> InstallerConfig {
    InstallerConfig::from_yaml_str(yaml).unwrap()
}

/// Discovered and planned record for /dev/sda -> /dev/sdb
pub fn planned(swap: bool) -> Partitions {
    let mut parts = Partitions::new();
    parts.source = Some(DiskRef::from_path("/dev/sda"));
    parts.target = Some(DiskRef::from_path("/dev/sdb"));
    parts.recovery_nr = Some(1);
    parts.recovery = ByteRange::new(1_048_576, 20_971_520);
    parts.sysboot = Some(ByteRange::new(20_971_521, 125_829_121));
    if swap {
        parts.swap = Some(ByteRange::new(125_829_122, 662_700_034));
    }
    parts
}

/// Programs that change or copy disk contents, in call order
pub fn mutating_calls(runner: &FakeRunner) -> Vec<String> {
    runner
        .calls_to(&[
            "sgdisk",
            "parted",
            "mkfs.vfat",
            "mkfs.ext4",
            "mkswap",
            "rsync",
            "sync",
            "cryptsetup",
            "modprobe",
            "tpm2_pcrlist",
            "grub-editenv",
        ])
        .into_iter()
        .filter(|call| !call.ends_with("unit B print"))
        .collect()
}
