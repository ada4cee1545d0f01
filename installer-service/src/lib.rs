// SPDX-License-Identifier: GPL-3.0-only

//! OEM storage installer
//!
//! Provisions the persistent storage of an embedded device at first boot or
//! factory restore. A run is strictly linear:
//!
//! 1. [`discovery::discover`] finds the installer (source) disk from its
//!    recovery label and picks the target disk.
//! 2. [`layout::plan_layout`] computes offsets for partitions that do not
//!    exist yet.
//! 3. [`provision::provision`] rewrites the target: either a copy of the
//!    recovery partition or a full system install.
//!
//! Every step talks to the host through the traits in `installer-contracts`,
//! bundled in a [`HostContext`].

pub mod context;
pub mod discovery;
pub mod layout;
pub mod logging;
pub mod mount;
pub mod provision;
pub mod settle;

pub use context::{HostContext, WorkPaths};
pub use discovery::discover;
pub use layout::{MIN_BOOT_SIZE_MB, plan_layout, plan_offset};
pub use provision::{copy_recovery, install_system, provision};
pub use settle::{SettlePolicy, settle};
