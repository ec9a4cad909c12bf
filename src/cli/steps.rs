//! The `steps` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;

use super::common::CommandOutcome;
use crate::resolution::{format_steps, steps_for_report};
use crate::resolver::CheckReport;

/// Print resolution steps for a `check` report.
#[derive(Args, Debug)]
pub struct StepsCommand {
    /// Report file; stdin when omitted or `-`
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,
}

impl StepsCommand {
    async fn read_input(&self) -> Result<String> {
        match &self.file {
            Some(path) if path.as_os_str() != "-" => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read report from {}", path.display())),
            _ => {
                let mut input = String::new();
                tokio::io::stdin()
                    .read_to_string(&mut input)
                    .await
                    .context("Failed to read report from stdin")?;
                Ok(input)
            }
        }
    }

    /// Print the steps. The outcome is unsatisfied when any step is required.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be read or is not a report.
    pub async fn execute(self) -> Result<CommandOutcome> {
        let input = self.read_input().await?;
        let report: CheckReport = serde_json::from_str(&input)?;

        let steps = steps_for_report(&report);
        tracing::debug!(target: "resolver", "{} resolution step(s)", steps.len());
        println!("{}", format_steps(&steps));

        Ok(CommandOutcome::from_passed(!steps.iter().any(|step| step.kind.is_required())))
    }
}
