//! gradepredict-core — Grade model, weighted scoring, and the prediction pipeline.
//!
//! This crate defines the record types, the score normalizer, the store and
//! predictor traits, and the orchestration that turns one recorded grade into
//! a request for an external predictor.

pub mod batch;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod scoring;
pub mod training;
pub mod traits;
pub mod validation;

pub use error::{PredictError, RecordKind};
pub use model::{Assessment, AssessmentKind, ColumnKey, GradeRow};
pub use pipeline::{PredictionInvoker, PredictionOutcome};
