//! External command error types.

use gradepredict_core::PredictError;
use thiserror::Error;

/// Errors from spawning or talking to an external process.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The program could not be started.
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Writing the request or collecting output failed.
    #[error("i/o with `{program}` failed: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The process did not exit within its time budget and was killed.
    #[error("`{program}` timed out after {after_ms}ms")]
    TimedOut { program: String, after_ms: u64 },
}

impl From<CommandError> for PredictError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::TimedOut { after_ms, .. } => PredictError::PredictionTimedOut { after_ms },
            other => PredictError::failed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_maps_to_timed_out() {
        let err: PredictError = CommandError::TimedOut {
            program: "python3".into(),
            after_ms: 1500,
        }
        .into();
        assert!(matches!(err, PredictError::PredictionTimedOut { after_ms: 1500 }));
    }

    #[test]
    fn spawn_failure_maps_to_failed_with_program_name() {
        let err: PredictError = CommandError::Spawn {
            program: "no-such-predictor".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        }
        .into();
        assert_eq!(err.code(), "prediction_failed");
        assert!(err.to_string().contains("no-such-predictor"));
    }
}
