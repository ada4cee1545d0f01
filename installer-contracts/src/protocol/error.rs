// SPDX-License-Identifier: GPL-3.0-only

use installer_types::ConfigError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Phase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallErrorKind {
    Config,
    NotFound,
    Parse,
    Precondition,
    UnknownRole,
    CommandFailed,
    Timeout,
    Mount,
    Io,
}

/// Every error the installer can raise. All of them abort the run.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("unknown partition role: {0}")]
    UnknownRole(String),

    #[error("`{command}` failed (exit code {code}): {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error("mount error: {0}")]
    Mount(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("phase {phase} failed: {source}")]
    Phase {
        phase: Phase,
        source: Box<InstallError>,
    },
}

impl InstallError {
    /// Kind of the underlying failure, looking through phase wrappers
    pub fn kind(&self) -> InstallErrorKind {
        match self {
            Self::Config(_) => InstallErrorKind::Config,
            Self::NotFound(_) => InstallErrorKind::NotFound,
            Self::Parse(_) => InstallErrorKind::Parse,
            Self::Precondition(_) => InstallErrorKind::Precondition,
            Self::UnknownRole(_) => InstallErrorKind::UnknownRole,
            Self::CommandFailed { .. } => InstallErrorKind::CommandFailed,
            Self::Timeout(_) => InstallErrorKind::Timeout,
            Self::Mount(_) => InstallErrorKind::Mount,
            Self::Io(_) => InstallErrorKind::Io,
            Self::Phase { source, .. } => source.kind(),
        }
    }

    /// Phase the error was raised in, if any
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Phase { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// Attach the phase that failed. An error keeps its innermost phase.
    pub fn in_phase(self, phase: Phase) -> Self {
        match self {
            Self::Phase { .. } => self,
            other => Self::Phase {
                phase,
                source: Box::new(other),
            },
        }
    }
}

impl From<ConfigError> for InstallError {
    fn from(err: ConfigError) -> Self {
        InstallError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, InstallError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_wrapper_keeps_inner_kind() {
        let err = InstallError::NotFound("/dev/sdb1".to_string()).in_phase(Phase::CreateBoot);
        assert_eq!(err.kind(), InstallErrorKind::NotFound);
        assert_eq!(err.phase(), Some(Phase::CreateBoot));
        assert_eq!(
            err.to_string(),
            "phase create-boot failed: not found: /dev/sdb1"
        );
    }

    #[test]
    fn innermost_phase_wins() {
        let err = InstallError::Parse("bad".to_string())
            .in_phase(Phase::CreateSwap)
            .in_phase(Phase::CreateWritable);
        assert_eq!(err.phase(), Some(Phase::CreateSwap));
    }

    #[test]
    fn config_errors_convert() {
        let err: InstallError = ConfigError::Invalid("empty label".to_string()).into();
        assert_eq!(err.kind(), InstallErrorKind::Config);
    }

    #[test]
    fn command_failure_names_command() {
        let err = InstallError::CommandFailed {
            command: "mkfs.vfat -F 32 /dev/sdb1".to_string(),
            code: 1,
            stderr: "no such device".to_string(),
        };
        assert!(err.to_string().contains("mkfs.vfat -F 32 /dev/sdb1"));
        assert!(err.to_string().contains("exit code 1"));
    }
}
