//! Mock predictor for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use gradepredict_core::traits::{PredictionRequest, PredictionResponse, Predictor};
use gradepredict_core::PredictError;

/// A predictor that answers from a table instead of a model.
///
/// Scores can be set per student; everyone else gets the default.
pub struct MockPredictor {
    /// Map of student id → predicted score.
    scores: HashMap<String, f64>,
    default_score: f64,
    call_count: AtomicU32,
    last_request: Mutex<Option<PredictionRequest>>,
}

impl MockPredictor {
    pub fn new(scores: HashMap<String, f64>) -> Self {
        Self {
            scores,
            default_score: 0.5,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a mock that always predicts the same score.
    pub fn with_fixed_score(score: f64) -> Self {
        Self {
            default_score: score,
            ..Self::new(HashMap::new())
        }
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn last_request(&self) -> Option<PredictionRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Predictor for MockPredictor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResponse, PredictError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self
            .last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(request.clone());

        let score = self
            .scores
            .get(&request.student_id)
            .copied()
            .unwrap_or(self.default_score);
        Ok(PredictionResponse::new(score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradepredict_core::model::ColumnKey;

    #[tokio::test]
    async fn fixed_score() {
        let predictor = MockPredictor::with_fixed_score(0.9);
        let request = PredictionRequest::single("anyone", ColumnKey::from("Quiz_abc12"), None);

        let response = predictor.predict(&request).await.unwrap();
        assert_eq!(response.predicted_score, 0.9);
        assert_eq!(predictor.call_count(), 1);
        assert_eq!(predictor.last_request(), Some(request));
    }

    #[tokio::test]
    async fn per_student_scores() {
        let mut scores = HashMap::new();
        scores.insert("s-1".to_string(), 0.2);
        let predictor = MockPredictor::new(scores);

        let s1 = PredictionRequest::single("s-1", ColumnKey::from("Quiz_abc12"), Some(0.1));
        let s2 = PredictionRequest::single("s-2", ColumnKey::from("Quiz_abc12"), Some(0.1));
        assert_eq!(predictor.predict(&s1).await.unwrap().predicted_score, 0.2);
        assert_eq!(predictor.predict(&s2).await.unwrap().predicted_score, 0.5);
        assert_eq!(predictor.call_count(), 2);
    }
}
