//! Subprocess predictor.
//!
//! Spawns the configured program once per prediction, hands it the JSON
//! request, and reads a JSON reply from stdout. Stderr lines starting with an
//! informational prefix are logged; any other stderr line is a failure.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::instrument;

use gradepredict_core::traits::{PredictionRequest, PredictionResponse, Predictor};
use gradepredict_core::PredictError;

use crate::error::CommandError;
use crate::protocol::{self, parse_response};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_INFO_PREFIX: &str = "INFO:";

/// How the JSON request reaches the predictor process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestMode {
    /// Appended as the last command-line argument.
    #[default]
    Argument,
    /// Written to stdin, which is then closed.
    Stdin,
}

/// A program invocation with a time budget and stderr classification.
#[derive(Debug, Clone)]
pub struct ExternalCommand {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    timeout: Duration,
    info_prefixes: Vec<String>,
}

/// Collected output of a finished process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: String,
    /// Stderr lines recognized as informational logging.
    pub info: Vec<String>,
    /// All other non-blank stderr lines.
    pub diagnostics: Vec<String>,
    pub duration: Duration,
}

impl ExternalCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            info_prefixes: vec![DEFAULT_INFO_PREFIX.to_string()],
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_working_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.working_dir = dir;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_info_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.info_prefixes = prefixes;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the program to completion.
    ///
    /// Stdout and stderr are drained concurrently. On timeout the child is
    /// killed before returning.
    pub async fn run(
        &self,
        extra_arg: Option<&str>,
        stdin_payload: Option<&[u8]>,
    ) -> Result<ProcessOutput, CommandError> {
        let start = Instant::now();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(if stdin_payload.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(arg) = extra_arg {
            cmd.arg(arg);
        }
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| CommandError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        let stdin = child.stdin.take();
        let exchange = async move {
            if let (Some(mut pipe), Some(payload)) = (stdin, stdin_payload) {
                match pipe.write_all(payload).await {
                    // The process may exit without reading its input.
                    Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => return Err(e),
                    _ => {}
                }
                drop(pipe);
            }
            child.wait_with_output().await
        };

        let output = match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result.map_err(|source| CommandError::Io {
                program: self.program.clone(),
                source,
            })?,
            Err(_) => {
                let after_ms = self.timeout.as_millis() as u64;
                tracing::warn!(program = %self.program, after_ms, "external command timed out, killed");
                return Err(CommandError::TimedOut {
                    program: self.program.clone(),
                    after_ms,
                });
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        let (info, diagnostics) = split_stderr(&stderr, &self.info_prefixes);
        for line in &info {
            tracing::debug!(program = %self.program, "{line}");
        }

        Ok(ProcessOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            info,
            diagnostics,
            duration: start.elapsed(),
        })
    }
}

/// Split stderr into informational lines and everything else. Blank lines are dropped.
pub fn split_stderr(stderr: &str, info_prefixes: &[String]) -> (Vec<String>, Vec<String>) {
    let mut info = Vec::new();
    let mut diagnostics = Vec::new();
    for line in stderr.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if info_prefixes.iter().any(|p| trimmed.starts_with(p.as_str())) {
            info.push(trimmed.to_string());
        } else {
            diagnostics.push(trimmed.to_string());
        }
    }
    (info, diagnostics)
}

/// Decide whether a finished predictor process produced a usable reply.
pub fn interpret_output(output: &ProcessOutput) -> Result<PredictionResponse, PredictError> {
    if !output.status.success() {
        let status = output
            .status
            .code()
            .map_or_else(|| "a signal".to_string(), |code| code.to_string());
        let detail = if output.diagnostics.is_empty() {
            protocol::quote(output.stdout.trim())
        } else {
            output.diagnostics.join("\n")
        };
        return Err(PredictError::failed(format!(
            "predictor exited with {status}: {detail}"
        )));
    }

    if !output.diagnostics.is_empty() {
        return Err(PredictError::failed(format!(
            "predictor wrote to stderr: {}",
            output.diagnostics.join("\n")
        )));
    }

    parse_response(&output.stdout)
}

/// Predictor backed by an external program.
pub struct CommandPredictor {
    command: ExternalCommand,
    mode: RequestMode,
}

impl CommandPredictor {
    pub fn new(command: ExternalCommand, mode: RequestMode) -> Self {
        Self { command, mode }
    }
}

#[async_trait]
impl Predictor for CommandPredictor {
    fn name(&self) -> &str {
        "command"
    }

    #[instrument(skip(self, request), fields(program = %self.command.program(), student_id = %request.student_id))]
    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResponse, PredictError> {
        let payload = serde_json::to_string(request)
            .map_err(|e| PredictError::failed(format!("failed to encode request: {e}")))?;

        let output = match self.mode {
            RequestMode::Argument => self.command.run(Some(&payload), None).await?,
            RequestMode::Stdin => self.command.run(None, Some(payload.as_bytes())).await?,
        };
        tracing::debug!(
            duration_ms = output.duration.as_millis() as u64,
            exit = ?output.status.code(),
            "predictor process finished"
        );

        interpret_output(&output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use gradepredict_core::model::ColumnKey;

    fn prefixes() -> Vec<String> {
        vec![DEFAULT_INFO_PREFIX.to_string()]
    }

    #[test]
    fn split_stderr_separates_info_lines() {
        let stderr = "INFO: loading model\n\n  INFO: done\nUserWarning: feature names\n";
        let (info, diagnostics) = split_stderr(stderr, &prefixes());
        assert_eq!(info, vec!["INFO: loading model", "INFO: done"]);
        assert_eq!(diagnostics, vec!["UserWarning: feature names"]);
    }

    #[test]
    fn split_stderr_respects_custom_prefixes() {
        let custom = vec!["[log]".to_string(), "DEBUG".to_string()];
        let (info, diagnostics) = split_stderr("[log] a\nDEBUG b\nINFO: c", &custom);
        assert_eq!(info.len(), 2);
        assert_eq!(diagnostics, vec!["INFO: c"]);
    }

    fn request() -> PredictionRequest {
        PredictionRequest::single("s-1", ColumnKey::from("Quiz_abc12"), Some(0.16))
    }

    fn sh(script: &str) -> ExternalCommand {
        ExternalCommand::new("sh").with_args(vec!["-c".into(), script.into(), "predictor".into()])
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn info_only_stderr_still_succeeds() {
        let predictor = CommandPredictor::new(
            sh(r#"echo "INFO: loading model" >&2; echo '{"predicted_score": 0.82}'"#),
            RequestMode::Argument,
        );
        let response = predictor.predict(&request()).await.unwrap();
        assert_eq!(response.predicted_score, 0.82);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn request_is_passed_as_last_argument() {
        // Echo back the student id taken from the JSON argument.
        let predictor = CommandPredictor::new(
            sh(r#"case "$1" in *'"student_id":"s-1"'*'"Quiz_abc12":0.16'*) echo '{"predicted_score": 1.0}';; *) echo "bad: $1" >&2; exit 3;; esac"#),
            RequestMode::Argument,
        );
        let response = predictor.predict(&request()).await.unwrap();
        assert_eq!(response.predicted_score, 1.0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn request_can_be_sent_on_stdin() {
        let predictor = CommandPredictor::new(
            sh(r#"input=$(cat); case "$input" in *'"s-1"'*) echo '{"predicted_score": 0.5}';; *) exit 4;; esac"#),
            RequestMode::Stdin,
        );
        let response = predictor.predict(&request()).await.unwrap();
        assert_eq!(response.predicted_score, 0.5);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_json_stdout_fails_with_raw_text() {
        let predictor = CommandPredictor::new(sh("echo 'Predicted score: 0.7'"), RequestMode::Argument);
        let err = predictor.predict(&request()).await.unwrap_err();
        assert_eq!(err.code(), "prediction_failed");
        assert!(err.to_string().contains("Predicted score: 0.7"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unrecognized_stderr_is_failure() {
        let predictor = CommandPredictor::new(
            sh(r#"echo "Traceback (most recent call last)" >&2; echo '{"predicted_score": 0.9}'"#),
            RequestMode::Argument,
        );
        let err = predictor.predict(&request()).await.unwrap_err();
        assert!(err.to_string().contains("Traceback"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_is_failure() {
        let predictor = CommandPredictor::new(
            sh(r#"echo "INFO: starting" >&2; echo "model.pkl missing" >&2; exit 2"#),
            RequestMode::Argument,
        );
        let err = predictor.predict(&request()).await.unwrap_err();
        let text = err.to_string();
        assert!(text.contains("exited with 2"), "{text}");
        assert!(text.contains("model.pkl missing"));
        assert!(!text.contains("INFO: starting"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_predictor_times_out() {
        let command = sh("sleep 5; echo '{\"predicted_score\": 0.1}'")
            .with_timeout(Duration::from_millis(200));
        let predictor = CommandPredictor::new(command, RequestMode::Argument);

        let start = Instant::now();
        let err = predictor.predict(&request()).await.unwrap_err();
        assert!(matches!(err, PredictError::PredictionTimedOut { after_ms: 200 }));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn missing_program_fails_to_spawn() {
        let predictor = CommandPredictor::new(
            ExternalCommand::new("gradepredict-no-such-program"),
            RequestMode::Argument,
        );
        let err = predictor.predict(&request()).await.unwrap_err();
        assert!(err.to_string().contains("failed to spawn"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn identical_requests_give_identical_predictions() {
        let predictor = CommandPredictor::new(sh("echo '{\"predicted_score\": 0.42}'"), RequestMode::Argument);
        let first = predictor.predict(&request()).await.unwrap();
        let second = predictor.predict(&request()).await.unwrap();
        assert_eq!(first, second);
    }
}
