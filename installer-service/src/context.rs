// SPDX-License-Identifier: GPL-3.0-only

use std::path::{Path, PathBuf};
use std::sync::Arc;

use installer_contracts::{CommandRunner, Mounter, SystemTree};
use installer_sys::{SysMounter, SysfsTree, SystemRunner};

use crate::settle::SettlePolicy;

/// Fixed locations used while provisioning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkPaths {
    /// Unpacked installer image, copied verbatim into a new recovery partition
    pub recovery_root: PathBuf,
    pub recovery_mnt: PathBuf,
    pub sysboot_mnt: PathBuf,
    pub writable_mnt: PathBuf,
    pub source_sysboot_mnt: PathBuf,
    pub source_writable_mnt: PathBuf,
    /// Private runtime directory for LUKS key material
    pub key_dir: PathBuf,
}

impl Default for WorkPaths {
    fn default() -> Self {
        Self {
            recovery_root: PathBuf::from("/run/recovery"),
            recovery_mnt: PathBuf::from("/tmp/recoMnt"),
            sysboot_mnt: PathBuf::from("/tmp/system-boot"),
            writable_mnt: PathBuf::from("/tmp/writableMnt"),
            source_sysboot_mnt: PathBuf::from("/tmp/src/system-boot"),
            source_writable_mnt: PathBuf::from("/tmp/src/writableMnt"),
            key_dir: PathBuf::from("/run/oem-installer"),
        }
    }
}

/// Directory argument for rsync: trailing slash so contents are copied
pub(crate) fn dir_arg(path: &Path) -> String {
    let rendered = path.display().to_string();
    if rendered.ends_with('/') {
        rendered
    } else {
        format!("{rendered}/")
    }
}

/// Collaborators and settings shared by discovery and provisioning
#[derive(Clone)]
pub struct HostContext {
    pub runner: Arc<dyn CommandRunner>,
    pub tree: Arc<dyn SystemTree>,
    pub mounter: Arc<dyn Mounter>,
    pub settle: SettlePolicy,
    pub paths: WorkPaths,
}

impl HostContext {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        tree: Arc<dyn SystemTree>,
        mounter: Arc<dyn Mounter>,
    ) -> Self {
        Self {
            runner,
            tree,
            mounter,
            settle: SettlePolicy::default(),
            paths: WorkPaths::default(),
        }
    }

    /// The real host
    pub fn system() -> Self {
        Self::new(
            Arc::new(SystemRunner::new()),
            Arc::new(SysfsTree::new()),
            Arc::new(SysMounter::new()),
        )
    }

    pub fn with_settle(mut self, settle: SettlePolicy) -> Self {
        self.settle = settle;
        self
    }

    pub fn with_paths(mut self, paths: WorkPaths) -> Self {
        self.paths = paths;
        self
    }
}
