// SPDX-License-Identifier: GPL-3.0-only

use async_trait::async_trait;
use tracing::warn;

use crate::{InstallError, Result};

/// Captured result of one external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Rendered command line, for logs and errors
    pub command: String,
    /// Exit code; -1 when the process was killed by a signal
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    pub fn into_error(self) -> InstallError {
        InstallError::CommandFailed {
            command: self.command,
            code: self.code,
            stderr: self.stderr.trim().to_string(),
        }
    }
}

/// Render a program and its arguments as a single shell-like line
pub fn render(program: &str, args: &[&str]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{program} {}", args.join(" "))
    }
}

/// Runs external programs one at a time.
///
/// `run` only fails when the program could not be started at all; a non-zero
/// exit is reported through [`CommandOutput::code`].
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;

    /// Whether `program` can be found on `PATH`
    fn has_program(&self, program: &str) -> bool;

    /// Run a command whose failure aborts the caller
    async fn must(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let output = self.run(program, args).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(output.into_error())
        }
    }

    /// Run a command whose failure is only logged
    async fn best_effort(&self, program: &str, args: &[&str]) -> Option<CommandOutput> {
        match self.run(program, args).await {
            Ok(output) if output.success() => Some(output),
            Ok(output) => {
                warn!(
                    command = %output.command,
                    code = output.code,
                    stderr = %output.stderr.trim(),
                    "command failed, continuing"
                );
                None
            }
            Err(e) => {
                warn!(command = %render(program, args), "could not run command: {e}");
                None
            }
        }
    }
}
