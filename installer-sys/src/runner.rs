// SPDX-License-Identifier: GPL-3.0-only

use std::process::Stdio;

use async_trait::async_trait;
use installer_contracts::{CommandOutput, CommandRunner, InstallError, Result, render};
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs programs on the host with captured output
#[derive(Debug, Clone, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let command = render(program, args);
        debug!("Running {command}");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                InstallError::Io(std::io::Error::new(
                    e.kind(),
                    format!("failed to execute '{program}': {e}"),
                ))
            })?;

        let result = CommandOutput {
            command,
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if result.success() {
            debug!("{} exited 0", result.command);
        } else {
            warn!(
                "{} exited {}: {}",
                result.command,
                result.code,
                result.stderr.trim()
            );
        }
        Ok(result)
    }

    fn has_program(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}
