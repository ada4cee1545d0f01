// SPDX-License-Identifier: GPL-3.0-only

use std::fs;
use std::path::{Component, Path, PathBuf};

use installer_contracts::{InstallError, Result, SystemTree};

/// The host's `/sys` and `/dev` trees, optionally below an alternate root
#[derive(Debug, Clone)]
pub struct SysfsTree {
    root: PathBuf,
}

impl Default for SysfsTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SysfsTree {
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("/"),
        }
    }

    /// Resolve absolute paths below `root` instead of `/`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn host_path(&self, path: &Path) -> PathBuf {
        let relative: PathBuf = path
            .components()
            .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
            .collect();
        self.root.join(relative)
    }

    fn io_error(path: &Path, err: std::io::Error) -> InstallError {
        InstallError::Io(std::io::Error::new(
            err.kind(),
            format!("{}: {err}", path.display()),
        ))
    }
}

impl SystemTree for SysfsTree {
    fn exists(&self, path: &Path) -> bool {
        self.host_path(path).exists()
    }

    fn list(&self, dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
        let host_dir = self.host_path(dir);
        let entries = match fs::read_dir(&host_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Self::io_error(dir, e)),
        };

        let mut matches: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.starts_with(prefix))
            .map(|name| dir.join(name))
            .collect();
        matches.sort();
        Ok(matches)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(self.host_path(path)).map_err(|e| Self::io_error(path, e))
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        let real = fs::canonicalize(self.host_path(path)).map_err(|e| Self::io_error(path, e))?;
        let root = fs::canonicalize(&self.root).map_err(|e| Self::io_error(&self.root, e))?;
        match real.strip_prefix(&root) {
            Ok(inside) => Ok(Path::new("/").join(inside)),
            Err(_) => Ok(real),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;
    use tempfile::tempdir;

    fn fixture() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        let sys = dir.path().join("sys/block");
        fs::create_dir_all(sys.join("sda")).unwrap();
        fs::create_dir_all(sys.join("sdb")).unwrap();
        fs::create_dir_all(sys.join("mmcblk0")).unwrap();
        fs::write(sys.join("sda/dev"), "8:0\n").unwrap();

        let dev = dir.path().join("dev");
        fs::create_dir_all(dev.join("block")).unwrap();
        fs::write(dev.join("sda"), "").unwrap();
        symlink("../sda", dev.join("block/8:0")).unwrap();
        dir
    }

    #[test]
    fn lists_entries_by_prefix_in_order() {
        let dir = fixture();
        let tree = SysfsTree::with_root(dir.path());
        let found = tree.list(Path::new("/sys/block"), "sd").unwrap();
        assert_eq!(
            found,
            vec![PathBuf::from("/sys/block/sda"), PathBuf::from("/sys/block/sdb")]
        );
        assert!(tree.list(Path::new("/sys/block"), "nvme").unwrap().is_empty());
    }

    #[test]
    fn missing_directory_lists_nothing() {
        let dir = fixture();
        let tree = SysfsTree::with_root(dir.path());
        assert!(tree.list(Path::new("/sys/class/nope"), "").unwrap().is_empty());
    }

    #[test]
    fn reads_and_resolves_inside_root() {
        let dir = fixture();
        let tree = SysfsTree::with_root(dir.path());
        assert!(tree.exists(Path::new("/sys/block/sda/dev")));
        assert_eq!(
            tree.read_to_string(Path::new("/sys/block/sda/dev")).unwrap().trim(),
            "8:0"
        );
        assert_eq!(
            tree.canonicalize(Path::new("/dev/block/8:0")).unwrap(),
            PathBuf::from("/dev/sda")
        );
    }

    #[test]
    fn read_errors_name_the_path() {
        let dir = fixture();
        let tree = SysfsTree::with_root(dir.path());
        let err = tree.read_to_string(Path::new("/sys/block/md126/dev")).unwrap_err();
        assert!(err.to_string().contains("/sys/block/md126/dev"));
    }
}
