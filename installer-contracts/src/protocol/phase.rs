// SPDX-License-Identifier: GPL-3.0-only

use std::fmt;

use serde::{Deserialize, Serialize};

/// Named steps of the provisioning state machines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    // Recovery copy
    CreateRecovery,
    FormatRecovery,
    CopyRecovery,
    StampBootEnv,

    // Full install
    TableReset,
    CreateBoot,
    FormatBoot,
    CopyBoot,
    CreateSwap,
    CreateWritable,
    Encrypt,
    FormatWritable,
    CopyWritable,
    Attest,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateRecovery => "create-recovery",
            Self::FormatRecovery => "format-recovery",
            Self::CopyRecovery => "copy-recovery",
            Self::StampBootEnv => "stamp-boot-env",
            Self::TableReset => "table-reset",
            Self::CreateBoot => "create-boot",
            Self::FormatBoot => "format-boot",
            Self::CopyBoot => "copy-boot",
            Self::CreateSwap => "create-swap",
            Self::CreateWritable => "create-writable",
            Self::Encrypt => "encrypt",
            Self::FormatWritable => "format-writable",
            Self::CopyWritable => "copy-writable",
            Self::Attest => "attest",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_serde_name() {
        for phase in [Phase::TableReset, Phase::CopyWritable, Phase::StampBootEnv] {
            let json = serde_json::to_string(&phase).expect("serialize phase");
            assert_eq!(json, format!("\"{phase}\""));
        }
    }
}
