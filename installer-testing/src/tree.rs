// SPDX-License-Identifier: GPL-3.0-only

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use installer_contracts::{InstallError, Result, SystemTree};

use crate::lock;

#[derive(Debug, Default)]
struct Nodes {
    files: BTreeMap<PathBuf, String>,
    dirs: BTreeSet<PathBuf>,
    links: BTreeMap<PathBuf, PathBuf>,
}

impl Nodes {
    fn add_parents(&mut self, path: &Path) {
        let mut parent = path.parent();
        while let Some(dir) = parent {
            if dir.as_os_str().is_empty() {
                break;
            }
            self.dirs.insert(dir.to_path_buf());
            parent = dir.parent();
        }
    }

    fn contains(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.dirs.contains(path) || self.links.contains_key(path)
    }
}

/// In-memory `/sys` and `/dev`
///
/// Clones share the same nodes.
#[derive(Debug, Clone, Default)]
pub struct FakeTree {
    nodes: Arc<Mutex<Nodes>>,
}

impl FakeTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, contents: &str) -> &Self {
        let path = path.as_ref();
        let mut nodes = lock(&self.nodes);
        nodes.add_parents(path);
        nodes.files.insert(path.to_path_buf(), contents.to_string());
        self
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) -> &Self {
        let path = path.as_ref();
        let mut nodes = lock(&self.nodes);
        nodes.add_parents(path);
        nodes.dirs.insert(path.to_path_buf());
        self
    }

    /// Add a symlink that resolves to `target`
    pub fn add_link(&self, path: impl AsRef<Path>, target: impl AsRef<Path>) -> &Self {
        let path = path.as_ref();
        let mut nodes = lock(&self.nodes);
        nodes.add_parents(path);
        nodes
            .links
            .insert(path.to_path_buf(), target.as_ref().to_path_buf());
        self
    }

    /// Register a block device the way sysfs exposes it:
    /// `/sys/block/<node>/dev`, `/dev/block/<maj:min>` and `/dev/<node>`.
    pub fn add_block_device(&self, node: &str, major_minor: &str) -> &Self {
        self.add_file(format!("/sys/block/{node}/dev"), &format!("{major_minor}\n"));
        self.add_file(format!("/dev/{node}"), "");
        self.add_link(format!("/dev/block/{major_minor}"), format!("/dev/{node}"));
        self
    }

    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut nodes = lock(&self.nodes);
        nodes.files.remove(path);
        nodes.dirs.remove(path);
        nodes.links.remove(path);
    }

    fn not_found(path: &Path) -> InstallError {
        InstallError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{}: no such file or directory", path.display()),
        ))
    }
}

impl SystemTree for FakeTree {
    fn exists(&self, path: &Path) -> bool {
        lock(&self.nodes).contains(path)
    }

    fn list(&self, dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
        let nodes = lock(&self.nodes);
        let children: BTreeSet<PathBuf> = nodes
            .files
            .keys()
            .chain(nodes.dirs.iter())
            .chain(nodes.links.keys())
            .filter(|path| path.parent() == Some(dir))
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with(prefix))
            })
            .cloned()
            .collect();
        Ok(children.into_iter().collect())
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        lock(&self.nodes)
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| Self::not_found(path))
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        let nodes = lock(&self.nodes);
        if let Some(target) = nodes.links.get(path) {
            return Ok(target.clone());
        }
        if nodes.contains(path) {
            return Ok(path.to_path_buf());
        }
        Err(Self::not_found(path))
    }
}
