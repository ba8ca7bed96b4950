//! Model training command.

use std::time::Duration;

use anyhow::Result;
use tracing::instrument;

use crate::command::{ExternalCommand, ProcessOutput};
use crate::protocol;

/// Summary of a finished training run.
#[derive(Debug, Clone)]
pub struct TrainingRun {
    pub duration: Duration,
    /// Informational stderr lines.
    pub info: Vec<String>,
    /// Other stderr lines. Training scripts commonly print library warnings,
    /// so these are reported rather than treated as failure.
    pub warnings: Vec<String>,
    pub stdout: String,
}

/// Runs the configured training program once.
pub struct ExternalTrainer {
    command: ExternalCommand,
}

impl ExternalTrainer {
    pub fn new(command: ExternalCommand) -> Self {
        Self { command }
    }

    pub fn program(&self) -> &str {
        self.command.program()
    }

    #[instrument(skip(self), fields(program = %self.command.program()))]
    pub async fn run(&self) -> Result<TrainingRun> {
        tracing::info!("starting model training");
        let output = self.command.run(None, None).await?;
        let run = finish(output)?;
        tracing::info!(
            duration_ms = run.duration.as_millis() as u64,
            warnings = run.warnings.len(),
            "model training finished"
        );
        Ok(run)
    }
}

fn finish(output: ProcessOutput) -> Result<TrainingRun> {
    if !output.status.success() {
        let detail = if output.diagnostics.is_empty() {
            protocol::quote(output.stdout.trim())
        } else {
            output.diagnostics.join("\n")
        };
        anyhow::bail!(
            "training command exited with {}: {detail}",
            output
                .status
                .code()
                .map_or_else(|| "a signal".to_string(), |c| c.to_string())
        );
    }

    Ok(TrainingRun {
        duration: output.duration,
        info: output.info,
        warnings: output.diagnostics,
        stdout: output.stdout,
    })
}
