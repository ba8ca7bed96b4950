//! Core trait definitions for record stores and external predictors.
//!
//! The stores are implemented by `gradepredict-store`, the predictors by
//! `gradepredict-predictors`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PredictError;
use crate::model::{Assessment, ColumnKey, GradeRow};

// ---------------------------------------------------------------------------
// Record stores
// ---------------------------------------------------------------------------

/// Read access to assessment definitions.
#[async_trait]
pub trait AssessmentStore: Send + Sync {
    /// Look up one assessment by identifier.
    async fn assessment(&self, id: &str) -> anyhow::Result<Option<Assessment>>;

    /// All assessments, in store order.
    async fn assessments(&self) -> anyhow::Result<Vec<Assessment>>;
}

/// Read access to recorded raw scores.
#[async_trait]
pub trait GradeStore: Send + Sync {
    /// A student's grade row. Empty if nothing has been recorded.
    async fn grades_for(&self, student_id: &str) -> anyhow::Result<GradeRow>;

    /// Every student's grade row.
    async fn all_grades(&self) -> anyhow::Result<BTreeMap<String, GradeRow>>;
}

/// The set of students a prediction may be requested for.
#[async_trait]
pub trait StudentDirectory: Send + Sync {
    async fn contains(&self, student_id: &str) -> anyhow::Result<bool>;

    /// All known student ids, roster order first.
    async fn student_ids(&self) -> anyhow::Result<Vec<String>>;
}

// ---------------------------------------------------------------------------
// External predictor
// ---------------------------------------------------------------------------

/// Backend that turns a weighted-grade snapshot into a predicted final score.
#[async_trait]
pub trait Predictor: Send + Sync {
    /// Short backend name (e.g. "command").
    fn name(&self) -> &str;

    /// Run one blocking request/response exchange.
    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResponse, PredictError>;
}

/// Payload sent to the external predictor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub student_id: String,
    /// Weighted scores by column key. A missing score is sent as explicit `null`.
    pub previous_grades: BTreeMap<ColumnKey, Option<f64>>,
}

impl PredictionRequest {
    /// Request carrying a single column.
    pub fn single(student_id: impl Into<String>, key: ColumnKey, weighted_score: Option<f64>) -> Self {
        let mut previous_grades = BTreeMap::new();
        previous_grades.insert(key, weighted_score);
        Self {
            student_id: student_id.into(),
            previous_grades,
        }
    }
}

/// Reply from the external predictor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// Expected in 0..1; not validated.
    pub predicted_score: f64,
    /// Any other fields the predictor chose to return.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl PredictionResponse {
    pub fn new(predicted_score: f64) -> Self {
        Self {
            predicted_score,
            extra: BTreeMap::new(),
        }
    }
}
