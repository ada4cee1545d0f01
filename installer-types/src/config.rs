//! Installer configuration model
//!
//! The configuration ships on the installer media as YAML
//! (`/run/recovery/recovery/config.yaml`) and is read once before discovery.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::common::mib_to_bytes;

/// Default location of the configuration on the installer media
pub const DEFAULT_CONFIG_PATH: &str = "/run/recovery/recovery/config.yaml";

/// Longest label `mkfs.vfat -n` accepts.
const FAT_LABEL_MAX: usize = 11;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    Invalid(String),
}

/// Which provisioning flow the run performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecoveryType {
    /// Full system install onto a bare target disk
    #[serde(alias = "installer_only")]
    InstallerOnly,

    /// Copy the recovery partition onto the target disk
    #[serde(alias = "factory_copy", alias = "factory_install", alias = "factory-install")]
    FactoryCopy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bootloader {
    #[serde(rename = "u-boot", alias = "uboot")]
    UBoot,

    #[default]
    #[serde(rename = "grub")]
    Grub,
}

impl Bootloader {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UBoot => "u-boot",
            Self::Grub => "grub",
        }
    }
}

impl fmt::Display for Bootloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoverySection {
    #[serde(rename = "type")]
    pub kind: RecoveryType,

    /// Filesystem label of the recovery partition
    #[serde(default = "default_fs_label")]
    pub fs_label: String,

    /// Recovery partition size in MiB
    #[serde(default)]
    pub recovery_size: u64,

    /// Explicit target disk, bypassing detection
    #[serde(default)]
    pub recovery_device: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemSection {
    #[serde(default)]
    pub bootloader: Bootloader,

    /// system-boot size in MiB
    #[serde(default = "default_boot_size")]
    pub boot_size: u64,

    #[serde(default)]
    pub swap: bool,

    /// Swap lives in a file on writable instead of its own partition
    #[serde(default)]
    pub swap_file: bool,

    /// Swap size in MiB
    #[serde(default)]
    pub swap_size: u64,
}

impl Default for SystemSection {
    fn default() -> Self {
        Self {
            bootloader: Bootloader::default(),
            boot_size: default_boot_size(),
            swap: false,
            swap_file: false,
            swap_size: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionSection {
    /// Put writable inside a LUKS container
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Name of the opened mapping under /dev/mapper
    #[serde(default = "default_mapper_name")]
    pub mapper_name: String,

    /// Keep a copy of the generated key here (mode 0400) for later sealing
    #[serde(default)]
    pub key_file: Option<PathBuf>,

    /// TPM resource manager queried for the measurement log
    #[serde(default = "default_attestation_device")]
    pub attestation_device: String,
}

impl Default for EncryptionSection {
    fn default() -> Self {
        Self {
            enabled: true,
            mapper_name: default_mapper_name(),
            key_file: None,
            attestation_device: default_attestation_device(),
        }
    }
}

/// Complete installer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallerConfig {
    pub recovery: RecoverySection,

    #[serde(default)]
    pub configs: SystemSection,

    #[serde(default)]
    pub encryption: EncryptionSection,

    #[serde(skip)]
    pub path: PathBuf,
}

impl InstallerConfig {
    /// Read a YAML config file from disk and validate it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut cfg = Self::from_yaml_str(&contents)?;
        cfg.path = path.to_path_buf();
        Ok(cfg)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_yaml::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let label = self.recovery.fs_label.trim();
        if label.is_empty() {
            return Err(ConfigError::Invalid(
                "recovery.fs_label must not be empty".to_string(),
            ));
        }
        if label.len() > FAT_LABEL_MAX {
            return Err(ConfigError::Invalid(format!(
                "recovery.fs_label {label:?} is longer than {FAT_LABEL_MAX} characters"
            )));
        }

        let mapper = self.encryption.mapper_name.trim();
        if mapper.is_empty() || mapper.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "encryption.mapper_name {mapper:?} is not a valid mapping name"
            )));
        }

        let sizes = [
            ("recovery.recovery_size", self.recovery.recovery_size),
            ("configs.boot_size", self.configs.boot_size),
            ("configs.swap_size", self.configs.swap_size),
        ];
        for (field, size) in sizes {
            if mib_to_bytes(size).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "{field} {size} MiB does not fit in a byte offset"
                )));
            }
        }

        if let Some(device) = &self.recovery.recovery_device
            && !device.starts_with("/dev/")
        {
            return Err(ConfigError::Invalid(format!(
                "recovery.recovery_device {device:?} is not a device path"
            )));
        }

        Ok(())
    }

    /// Swap gets its own partition (enabled, not file-backed, non-zero size)
    pub fn swap_partition_enabled(&self) -> bool {
        self.configs.swap && !self.configs.swap_file && self.configs.swap_size > 0
    }
}

fn default_fs_label() -> String {
    "recovery".to_string()
}

fn default_boot_size() -> u64 {
    512
}

fn default_true() -> bool {
    true
}

fn default_mapper_name() -> String {
    "cryptroot".to_string()
}

fn default_attestation_device() -> String {
    "/dev/tpmrm0".to_string()
}
