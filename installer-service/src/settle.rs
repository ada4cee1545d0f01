// SPDX-License-Identifier: GPL-3.0-only

use std::path::Path;
use std::time::Duration;

use installer_contracts::{CommandRunner, InstallError, Result, SystemTree};
use tracing::debug;

/// How long to wait for a new device node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlePolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self {
            attempts: 20,
            interval: Duration::from_millis(250),
        }
    }
}

/// Wait until `device` shows up after a partition table change.
///
/// udev and the kernel are nudged first; both nudges are best-effort.
pub async fn settle(
    runner: &dyn CommandRunner,
    tree: &dyn SystemTree,
    policy: SettlePolicy,
    device: &str,
) -> Result<()> {
    runner.best_effort("udevadm", &["settle"]).await;
    runner.best_effort("partprobe", &[]).await;

    let node = Path::new(device);
    for attempt in 1..=policy.attempts {
        if tree.exists(node) {
            debug!("{device} present after {attempt} check(s)");
            return Ok(());
        }
        tokio::time::sleep(policy.interval).await;
    }

    Err(InstallError::Timeout(format!(
        "{device} after {} checks",
        policy.attempts
    )))
}
