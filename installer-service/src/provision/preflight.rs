// SPDX-License-Identifier: GPL-3.0-only

use installer_contracts::{CommandRunner, InstallError, Result};
use installer_types::InstallerConfig;

/// (tool, package) pairs the recovery copy needs
pub const RECOVERY_TOOLS: &[(&str, &str)] = &[
    ("parted", "parted"),
    ("mkfs.vfat", "dosfstools"),
    ("rsync", "rsync"),
    ("sync", "coreutils"),
];

/// (tool, package) pairs every full install needs
pub const INSTALL_TOOLS: &[(&str, &str)] = &[
    ("sgdisk", "gdisk"),
    ("parted", "parted"),
    ("mkfs.vfat", "dosfstools"),
    ("mkfs.ext4", "e2fsprogs"),
    ("rsync", "rsync"),
    ("sync", "coreutils"),
];

/// Tools a full install needs under `config`
pub fn install_tools(config: &InstallerConfig) -> Vec<(&'static str, &'static str)> {
    let mut tools = INSTALL_TOOLS.to_vec();
    if config.swap_partition_enabled() {
        tools.push(("mkswap", "util-linux"));
    }
    if config.encryption.enabled {
        tools.push(("modprobe", "kmod"));
        tools.push(("cryptsetup", "cryptsetup"));
    }
    tools
}

/// Fail with every missing tool listed if any is not on `PATH`.
pub fn check_tools(runner: &dyn CommandRunner, tools: &[(&str, &str)]) -> Result<()> {
    let missing: Vec<String> = tools
        .iter()
        .filter(|(tool, _)| !runner.has_program(tool))
        .map(|(tool, package)| format!("  {tool} (install: {package})"))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(InstallError::Precondition(format!(
            "missing required tools:\n{}",
            missing.join("\n")
        )))
    }
}
