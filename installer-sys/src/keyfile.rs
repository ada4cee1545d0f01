// SPDX-License-Identifier: GPL-3.0-only

//! LUKS key material
//!
//! The key is drawn from the OS random source and written into a private
//! runtime directory with mode 0400. It is overwritten with zeros and removed
//! once the caller is done with it.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use installer_contracts::{InstallError, Result};
use rand::RngCore;
use rand::rngs::OsRng;
use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, warn};
use zeroize::Zeroizing;

/// Key length in bytes
pub const KEY_LEN: usize = 64;

const KEY_NAME: &str = "keyfile";

#[derive(Debug)]
pub struct KeyFile {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl KeyFile {
    /// Generate fresh key material below `runtime_dir`.
    ///
    /// When `persist` is set, a copy is also written there for later sealing.
    pub fn generate(runtime_dir: &Path, persist: Option<&Path>) -> Result<Self> {
        fs::create_dir_all(runtime_dir)?;
        let dir = tempfile::Builder::new()
            .prefix("oem-installer-")
            .tempdir_in(runtime_dir)?;
        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o700))?;

        let mut key = Zeroizing::new(vec![0u8; KEY_LEN]);
        OsRng.fill_bytes(&mut key);

        let path = dir.path().join(KEY_NAME);
        write_key(&path, &key)?;
        debug!("Wrote {KEY_LEN}-byte key to {}", path.display());

        if let Some(dest) = persist {
            persist_key(dest, &key)?;
            debug!("Persisted key copy to {}", dest.display());
        }

        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Zero and remove the key, reporting failures
    pub fn destroy(mut self) -> Result<()> {
        self.shred()
    }

    fn shred(&mut self) -> Result<()> {
        let Some(dir) = self.dir.take() else {
            return Ok(());
        };

        fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        let mut file = OpenOptions::new().write(true).open(&self.path)?;
        let len = file.metadata()?.len() as usize;
        file.write_all(&vec![0u8; len])?;
        file.sync_all()?;
        drop(file);

        fs::remove_file(&self.path)?;
        dir.close()?;
        Ok(())
    }
}

impl Drop for KeyFile {
    fn drop(&mut self) {
        if let Err(e) = self.shred() {
            warn!("Failed to remove key material at {}: {e}", self.path.display());
        }
    }
}

/// Write raw key material to `dest` with mode 0400.
pub fn persist_key(dest: &Path, key: &[u8]) -> Result<()> {
    let parent = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    write_key(dest, key)
}

fn write_key(dest: &Path, key: &[u8]) -> Result<()> {
    let parent = dest.parent().ok_or_else(|| {
        InstallError::Precondition(format!("{} has no parent directory", dest.display()))
    })?;

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.as_file_mut().write_all(key)?;
    temp.as_file_mut().flush()?;
    fs::set_permissions(temp.path(), fs::Permissions::from_mode(0o400))?;
    let _ = temp.as_file().sync_all();
    temp.persist(dest).map_err(|err| InstallError::Io(err.error))?;
    Ok(())
}
