// SPDX-License-Identifier: GPL-3.0-only

use std::path::{Path, PathBuf};

use installer_contracts::{Mounter, Result};
use tracing::{debug, warn};

/// A mounted filesystem that is unmounted when the guard goes away
pub struct ScopedMount<'a> {
    mounter: &'a dyn Mounter,
    target: PathBuf,
    mounted: bool,
}

impl<'a> ScopedMount<'a> {
    pub fn mount(
        mounter: &'a dyn Mounter,
        device: &str,
        target: &Path,
        fstype: &str,
        read_only: bool,
    ) -> Result<Self> {
        mounter.mount(Path::new(device), target, fstype, read_only)?;
        debug!("Mounted {device} on {}", target.display());
        Ok(Self {
            mounter,
            target: target.to_path_buf(),
            mounted: true,
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Unmount now, reporting failure to the caller
    pub fn release(mut self) -> Result<()> {
        self.mounted = false;
        self.mounter.unmount(&self.target)
    }
}

impl Drop for ScopedMount<'_> {
    fn drop(&mut self) {
        if !self.mounted {
            return;
        }
        if let Err(e) = self.mounter.unmount(&self.target) {
            warn!("Failed to unmount {}: {e}", self.target.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use installer_testing::{FakeMounter, MountEvent};

    #[test]
    fn drop_unmounts() {
        let mounter = FakeMounter::new();
        {
            let guard =
                ScopedMount::mount(&mounter, "/dev/sdb1", Path::new("/tmp/a"), "vfat", false)
                    .unwrap();
            assert_eq!(guard.target(), Path::new("/tmp/a"));
            assert_eq!(mounter.active().len(), 1);
        }
        assert!(mounter.active().is_empty());
    }

    #[test]
    fn release_unmounts_once() {
        let mounter = FakeMounter::new();
        let guard =
            ScopedMount::mount(&mounter, "/dev/sda3", Path::new("/tmp/src"), "ext4", true).unwrap();
        guard.release().unwrap();

        assert_eq!(
            mounter.events(),
            vec![
                MountEvent::Mount {
                    device: PathBuf::from("/dev/sda3"),
                    target: PathBuf::from("/tmp/src"),
                    fstype: "ext4".to_string(),
                    read_only: true,
                },
                MountEvent::Unmount {
                    target: PathBuf::from("/tmp/src"),
                },
            ]
        );
    }

    #[test]
    fn failed_mount_leaves_nothing_to_unmount() {
        let mounter = FakeMounter::new();
        mounter.fail_mount_of("/dev/sdb1");
        assert!(
            ScopedMount::mount(&mounter, "/dev/sdb1", Path::new("/tmp/a"), "vfat", false).is_err()
        );
        assert_eq!(mounter.unmount_count(), 0);
    }
}
