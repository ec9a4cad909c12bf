//! Helpers shared by the subcommands.

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;

use crate::config::{ClaudePaths, GlobalConfig};
use crate::state::InstallationState;

/// How a successful command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Everything required is satisfied
    Satisfied,
    /// At least one required dependency is not
    Unsatisfied,
}

impl CommandOutcome {
    /// Outcome for a pass/fail verdict.
    #[must_use]
    pub const fn from_passed(passed: bool) -> Self {
        if passed { Self::Satisfied } else { Self::Unsatisfied }
    }

    /// Process exit code.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Satisfied => 0,
            Self::Unsatisfied => 1,
        }
    }
}

/// Collect the installation state from the configured Claude directory.
pub(super) async fn collect_state(config: &GlobalConfig) -> Result<InstallationState> {
    let root = config.claude_dir()?;
    tracing::debug!(target: "state", "reading installation state from {}", root.display());
    Ok(InstallationState::collect(&ClaudePaths::new(root)).await)
}

/// Write `value` as JSON to stdout.
pub(super) fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .context("Failed to serialize output")?;

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{rendered}").context("Failed to write to stdout")?;
    Ok(())
}
