// SPDX-License-Identifier: GPL-3.0-only

pub mod error;
pub mod phase;

pub use error::{InstallError, InstallErrorKind, Result};
pub use phase::Phase;
