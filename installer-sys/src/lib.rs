// SPDX-License-Identifier: GPL-3.0-only

//! Low-level system operations for the installer
//!
//! Real implementations of the collaborator traits in `installer-contracts`:
//! - External process execution ([`SystemRunner`])
//! - Sysfs and `/dev` inspection ([`SysfsTree`])
//! - mount(2) and umount(2) ([`SysMounter`])
//! - Encryption key material ([`KeyFile`])
//!
//! These operations require root and are only called from the installer binary.

pub mod keyfile;
pub mod mount;
pub mod runner;
pub mod tree;

pub use keyfile::{KEY_LEN, KeyFile, persist_key};
pub use mount::SysMounter;
pub use runner::SystemRunner;
pub use tree::SysfsTree;
