//! System dependency probing.
//!
//! A system dependency is an executable the plugin expects on `PATH`. The
//! prober answers two questions about it: is it there, and which version is
//! it? Presence is a `PATH` lookup with [`which`]. The version comes from
//! running the command with each configured version flag in turn
//! (`--version`, then `-v` by default) and taking the first version-shaped
//! token from its output.
//!
//! This is the only part of plugdeps that starts processes. Every failure
//! (spawn errors, timeouts, non-zero exits, unparseable output) is folded
//! into the [`ProbeResult`]; probing never fails a run.

use crate::core::PlugdepsError;
use crate::version::extract_version;
use std::future::Future;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// What probing a command found.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProbeResult {
    /// Whether the command is on `PATH`
    pub installed: bool,
    /// Version reported by the command, if one could be determined
    pub version: Option<String>,
}

impl ProbeResult {
    /// The command is not on `PATH`.
    #[must_use]
    pub const fn missing() -> Self {
        Self {
            installed: false,
            version: None,
        }
    }

    /// The command is on `PATH` and reported `version`.
    pub fn found(version: impl Into<String>) -> Self {
        Self {
            installed: true,
            version: Some(version.into()),
        }
    }

    /// The command is on `PATH` but its version is unknown.
    #[must_use]
    pub const fn unknown_version() -> Self {
        Self {
            installed: true,
            version: None,
        }
    }
}

/// Resolves system commands to a [`ProbeResult`].
pub trait Prober: Send + Sync {
    /// Probe `command`.
    fn probe(&self, command: &str) -> impl Future<Output = ProbeResult> + Send;
}

/// Probes the real system.
#[derive(Debug, Clone)]
pub struct SystemProber {
    version_flags: Vec<String>,
    timeout: Duration,
}

impl SystemProber {
    /// Create a prober trying `version_flags` in order, each bounded by `timeout`.
    #[must_use]
    pub fn new(version_flags: Vec<String>, timeout: Duration) -> Self {
        Self {
            version_flags: version_flags.into_iter().filter(|flag| !flag.trim().is_empty()).collect(),
            timeout,
        }
    }

    async fn run_version_flag(
        &self,
        command: &str,
        executable: &Path,
        flag: &str,
    ) -> Result<Option<String>, PlugdepsError> {
        let probe_error = |reason: String| PlugdepsError::ProbeError {
            command: command.to_string(),
            reason,
        };

        tracing::debug!(target: "probe", "Executing command: {} {}", executable.display(), flag);

        let mut cmd = Command::new(executable);
        cmd.arg(flag).stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let output = match timeout(self.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|e| probe_error(format!("failed to run: {e}")))?,
            Err(_) => {
                return Err(probe_error(format!(
                    "'{command} {flag}' timed out after {:?}",
                    self.timeout
                )));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let text = if stdout.trim().is_empty() {
            String::from_utf8_lossy(&output.stderr).into_owned()
        } else {
            stdout.into_owned()
        };

        Ok(extract_version(&text))
    }
}

impl Default for SystemProber {
    fn default() -> Self {
        Self::new(vec!["--version".to_string(), "-v".to_string()], Duration::from_secs(5))
    }
}

impl Prober for SystemProber {
    async fn probe(&self, command: &str) -> ProbeResult {
        let executable = match which::which(command) {
            Ok(path) => path,
            Err(e) => {
                tracing::debug!(target: "probe", "'{command}' not found on PATH: {e}");
                return ProbeResult::missing();
            }
        };

        for flag in &self.version_flags {
            match self.run_version_flag(command, &executable, flag).await {
                Ok(Some(version)) => {
                    tracing::debug!(target: "probe", "'{command}' reports version {version}");
                    return ProbeResult::found(version);
                }
                Ok(None) => {
                    tracing::trace!(target: "probe", "'{command} {flag}' printed no version");
                }
                Err(e) => tracing::debug!(target: "probe", "{e}"),
            }
        }

        tracing::debug!(target: "probe", "'{command}' is installed but its version is unknown");
        ProbeResult::unknown_version()
    }
}
