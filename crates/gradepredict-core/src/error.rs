//! Prediction error types.
//!
//! Defined in `gradepredict-core` so callers can classify failures from any
//! predictor backend without string matching.

use std::fmt;

use thiserror::Error;

/// Which kind of record a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Assessment,
    Student,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Assessment => write!(f, "assessment"),
            RecordKind::Student => write!(f, "student"),
        }
    }
}

/// Errors that end a prediction. None of them are retried.
#[derive(Debug, Error)]
pub enum PredictError {
    /// The assessment or student does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: RecordKind, id: String },

    /// The assessment definition cannot produce a weighted score.
    #[error("invalid assessment {id}: {reason}")]
    InvalidAssessment { id: String, reason: String },

    /// The external predictor reported an error or produced unusable output.
    #[error("prediction failed: {detail}")]
    PredictionFailed { detail: String },

    /// The external predictor did not answer in time.
    #[error("prediction timed out after {after_ms}ms")]
    PredictionTimedOut { after_ms: u64 },

    /// Reading one of the record stores failed.
    #[error("record store error: {0:#}")]
    Store(anyhow::Error),
}

impl PredictError {
    pub fn assessment_not_found(id: impl Into<String>) -> Self {
        PredictError::NotFound {
            kind: RecordKind::Assessment,
            id: id.into(),
        }
    }

    pub fn student_not_found(id: impl Into<String>) -> Self {
        PredictError::NotFound {
            kind: RecordKind::Student,
            id: id.into(),
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        PredictError::PredictionFailed {
            detail: detail.into(),
        }
    }

    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            PredictError::NotFound { .. } => "not_found",
            PredictError::InvalidAssessment { .. } => "invalid_assessment",
            PredictError::PredictionFailed { .. } => "prediction_failed",
            PredictError::PredictionTimedOut { .. } => "prediction_timed_out",
            PredictError::Store(_) => "store_error",
        }
    }
}
