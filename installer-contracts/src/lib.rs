// SPDX-License-Identifier: GPL-3.0-only

pub mod protocol;
pub mod traits;

pub use protocol::{InstallError, InstallErrorKind, Phase, Result};
pub use traits::{CommandOutput, CommandRunner, Mounter, SystemTree, render};
