//! Prediction invoker.
//!
//! Resolves an assessment and a student's recorded grade, computes the
//! weighted score, and forwards a single-column snapshot to the external
//! predictor. Nothing in this flow writes to the stores.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::PredictError;
use crate::model::ColumnKey;
use crate::scoring;
use crate::traits::{AssessmentStore, GradeStore, PredictionRequest, Predictor, StudentDirectory};

/// Everything the caller needs to display one prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionOutcome {
    pub student_id: String,
    pub assessment_id: String,
    pub column_key: ColumnKey,
    pub predicted_score: f64,
    #[serde(rename = "weightedScore")]
    pub weighted_score: Option<f64>,
    #[serde(rename = "rawScore")]
    pub raw_score: Option<f64>,
    #[serde(rename = "totalMarks")]
    pub total_marks: f64,
    pub weightage: f64,
    #[serde(rename = "assessmentTitle")]
    pub assessment_title: String,
}

/// Orchestrates one prediction per (student, assessment) pair.
pub struct PredictionInvoker {
    assessments: Arc<dyn AssessmentStore>,
    grades: Arc<dyn GradeStore>,
    students: Arc<dyn StudentDirectory>,
    predictor: Arc<dyn Predictor>,
}

impl PredictionInvoker {
    pub fn new(
        assessments: Arc<dyn AssessmentStore>,
        grades: Arc<dyn GradeStore>,
        students: Arc<dyn StudentDirectory>,
        predictor: Arc<dyn Predictor>,
    ) -> Self {
        Self {
            assessments,
            grades,
            students,
            predictor,
        }
    }

    /// Build an invoker over a single store that serves all three record kinds.
    pub fn with_store<S>(store: Arc<S>, predictor: Arc<dyn Predictor>) -> Self
    where
        S: AssessmentStore + GradeStore + StudentDirectory + 'static,
    {
        Self::new(store.clone(), store.clone(), store, predictor)
    }

    pub fn predictor_name(&self) -> &str {
        self.predictor.name()
    }

    /// Run one prediction.
    ///
    /// A missing grade is not an error: the weighted score is sent as `null`.
    #[instrument(skip(self), fields(predictor = %self.predictor.name()))]
    pub async fn predict(
        &self,
        student_id: &str,
        assessment_id: &str,
    ) -> Result<PredictionOutcome, PredictError> {
        let assessment = self
            .assessments
            .assessment(assessment_id)
            .await
            .map_err(PredictError::Store)?
            .ok_or_else(|| PredictError::assessment_not_found(assessment_id))?;

        if !self
            .students
            .contains(student_id)
            .await
            .map_err(PredictError::Store)?
        {
            return Err(PredictError::student_not_found(student_id));
        }

        let grades = self
            .grades
            .grades_for(student_id)
            .await
            .map_err(PredictError::Store)?;

        let (Some(column_key), Some(weightage)) = (assessment.column_key(), assessment.weightage)
        else {
            return Err(PredictError::InvalidAssessment {
                id: assessment.id.clone(),
                reason: format!("record has no {}", assessment.missing_fields().join(" or ")),
            });
        };
        let raw_score = grades.score_for(&assessment);

        if let Some(raw) = raw_score {
            if !scoring::raw_score_in_range(raw, assessment.total_marks) {
                tracing::warn!(
                    raw,
                    total_marks = assessment.total_marks,
                    column = %column_key,
                    "stored raw score outside [0, totalMarks], using it unclamped"
                );
            }
        }

        let weighted_score =
            scoring::normalize(raw_score, assessment.total_marks, weightage).map_err(
                |e| PredictError::InvalidAssessment {
                    id: assessment.id.clone(),
                    reason: e.to_string(),
                },
            )?;

        let request = PredictionRequest::single(student_id, column_key.clone(), weighted_score);
        tracing::debug!(column = %column_key, ?weighted_score, "sending prediction request");

        let response = self.predictor.predict(&request).await?;
        tracing::info!(
            predicted_score = response.predicted_score,
            column = %column_key,
            "prediction complete"
        );

        Ok(PredictionOutcome {
            student_id: student_id.to_string(),
            assessment_id: assessment.id,
            column_key,
            predicted_score: response.predicted_score,
            weighted_score,
            raw_score,
            total_marks: assessment.total_marks,
            weightage,
            assessment_title: assessment.title,
        })
    }
}
