// SPDX-License-Identifier: GPL-3.0-only

//! Canonical domain models for the OEM storage installer
//!
//! This crate defines the single source of truth for the provisioning model:
//!
//! - **installer-service**: discovers, plans and mutates a [`Partitions`] record
//! - **installer-sys**: reads the device tree these types describe
//! - **installer-testing**: builds fixtures from the same types
//!
//! ## Layout
//!
//! ```text
//!            u-boot system                     grub system
//!  +------------------------------+  +------------------------------+
//!  | GPT/MBR table                |  | GPT/MBR table                |
//!  | part 1..N  bootloader / raw  |  | part 1  recovery             |
//!  | part X-1   system-boot       |  | part 2  system-boot          |
//!  | part X     recovery          |  | part 3  swap (optional)      |
//!  | part X+1   writable          |  | part N  writable (rest)      |
//!  +------------------------------+  +------------------------------+
//! ```

pub mod common;
pub mod config;
pub mod device;
pub mod partitions;

pub use common::{ByteRange, LEADING_RESERVED_END, MIB, mib_to_bytes};
pub use config::{
    Bootloader, ConfigError, DEFAULT_CONFIG_PATH, EncryptionSection, InstallerConfig,
    RecoverySection, RecoveryType, SystemSection,
};
pub use device::{DiskRef, partition_path, split_partition, whole_disk};
pub use partitions::{PartitionRole, Partitions};
