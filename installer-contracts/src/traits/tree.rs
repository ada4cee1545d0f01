// SPDX-License-Identifier: GPL-3.0-only

use std::path::{Path, PathBuf};

use crate::Result;

/// Read-only view of the device and sysfs tree
pub trait SystemTree: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    /// Entries of `dir` whose file name starts with `prefix`, sorted by name
    fn list(&self, dir: &Path, prefix: &str) -> Result<Vec<PathBuf>>;

    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Resolve symlinks to the real path
    fn canonicalize(&self, path: &Path) -> Result<PathBuf>;
}
