// SPDX-License-Identifier: GPL-3.0-only

use std::fs;
use std::path::Path;

use installer_contracts::{InstallError, Mounter, Result};
use nix::mount::{MntFlags, MsFlags, mount, umount2};
use tracing::debug;

/// mount(2)/umount2(2) on the host
#[derive(Debug, Clone, Default)]
pub struct SysMounter;

impl SysMounter {
    pub fn new() -> Self {
        Self
    }
}

impl Mounter for SysMounter {
    fn mount(&self, device: &Path, target: &Path, fstype: &str, read_only: bool) -> Result<()> {
        fs::create_dir_all(target).map_err(|e| {
            InstallError::Mount(format!("cannot create {}: {e}", target.display()))
        })?;

        let flags = if read_only {
            MsFlags::MS_RDONLY
        } else {
            MsFlags::empty()
        };
        debug!(
            "mount -t {fstype} {} {} (read_only={read_only})",
            device.display(),
            target.display()
        );

        mount(Some(device), target, Some(fstype), flags, None::<&str>).map_err(|errno| {
            InstallError::Mount(format!(
                "mounting {} on {} failed: {errno}",
                device.display(),
                target.display()
            ))
        })
    }

    fn unmount(&self, target: &Path) -> Result<()> {
        debug!("umount {}", target.display());
        umount2(target, MntFlags::empty()).map_err(|errno| {
            InstallError::Mount(format!("unmounting {} failed: {errno}", target.display()))
        })
    }
}
