// SPDX-License-Identifier: GPL-3.0-only

//! Collaborator seams between the provisioning core and the host system

mod mount;
mod runner;
mod tree;

pub use mount::Mounter;
pub use runner::{CommandOutput, CommandRunner, render};
pub use tree::SystemTree;
