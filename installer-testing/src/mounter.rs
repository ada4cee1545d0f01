// SPDX-License-Identifier: GPL-3.0-only

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use installer_contracts::{InstallError, Mounter, Result};

use crate::lock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountEvent {
    Mount {
        device: PathBuf,
        target: PathBuf,
        fstype: String,
        read_only: bool,
    },
    Unmount {
        target: PathBuf,
    },
}

#[derive(Debug, Default)]
struct State {
    events: Vec<MountEvent>,
    active: Vec<PathBuf>,
    failing_devices: BTreeSet<PathBuf>,
}

/// Mounter that only records what it was asked to do
#[derive(Debug, Default)]
pub struct FakeMounter {
    state: Mutex<State>,
}

impl FakeMounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make mounting `device` fail
    pub fn fail_mount_of(&self, device: impl Into<PathBuf>) -> &Self {
        lock(&self.state).failing_devices.insert(device.into());
        self
    }

    pub fn events(&self) -> Vec<MountEvent> {
        lock(&self.state).events.clone()
    }

    /// Targets mounted and not yet unmounted
    pub fn active(&self) -> Vec<PathBuf> {
        lock(&self.state).active.clone()
    }

    pub fn mount_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, MountEvent::Mount { .. }))
            .count()
    }

    pub fn unmount_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, MountEvent::Unmount { .. }))
            .count()
    }
}

impl Mounter for FakeMounter {
    fn mount(&self, device: &Path, target: &Path, fstype: &str, read_only: bool) -> Result<()> {
        let mut state = lock(&self.state);
        if state.failing_devices.contains(device) {
            return Err(InstallError::Mount(format!(
                "mounting {} on {} failed: scripted failure",
                device.display(),
                target.display()
            )));
        }
        state.events.push(MountEvent::Mount {
            device: device.to_path_buf(),
            target: target.to_path_buf(),
            fstype: fstype.to_string(),
            read_only,
        });
        state.active.push(target.to_path_buf());
        Ok(())
    }

    fn unmount(&self, target: &Path) -> Result<()> {
        let mut state = lock(&self.state);
        let Some(index) = state.active.iter().position(|active| active == target) else {
            return Err(InstallError::Mount(format!(
                "{} is not mounted",
                target.display()
            )));
        };
        state.active.remove(index);
        state.events.push(MountEvent::Unmount {
            target: target.to_path_buf(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_active_mounts() {
        let mounter = FakeMounter::new();
        mounter
            .mount(Path::new("/dev/sdb1"), Path::new("/mnt/a"), "vfat", false)
            .unwrap();
        assert_eq!(mounter.active(), vec![PathBuf::from("/mnt/a")]);

        mounter.unmount(Path::new("/mnt/a")).unwrap();
        assert!(mounter.active().is_empty());
        assert_eq!(mounter.mount_count(), 1);
        assert_eq!(mounter.unmount_count(), 1);
    }

    #[test]
    fn unmounting_unknown_target_fails() {
        let mounter = FakeMounter::new();
        assert!(mounter.unmount(Path::new("/mnt/none")).is_err());
    }

    #[test]
    fn scripted_mount_failure() {
        let mounter = FakeMounter::new();
        mounter.fail_mount_of("/dev/sda3");
        let err = mounter
            .mount(Path::new("/dev/sda3"), Path::new("/mnt/src"), "ext4", true)
            .unwrap_err();
        assert!(matches!(err, InstallError::Mount(_)));
        assert!(mounter.events().is_empty());
    }
}
