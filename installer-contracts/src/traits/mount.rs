// SPDX-License-Identifier: GPL-3.0-only

use std::path::Path;

use crate::Result;

/// Mount primitive
///
/// Implementations create `target` if it does not exist yet.
pub trait Mounter: Send + Sync {
    fn mount(&self, device: &Path, target: &Path, fstype: &str, read_only: bool) -> Result<()>;

    fn unmount(&self, target: &Path) -> Result<()>;
}
