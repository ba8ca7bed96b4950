//! Batch predictions for one assessment across many students.
//!
//! Predictions for different students share no state, so they run
//! concurrently up to a fixed parallelism.

use std::time::{Duration, Instant};

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;

use crate::error::PredictError;
use crate::pipeline::{PredictionInvoker, PredictionOutcome};

/// Progress reporting for batch runs.
pub trait BatchReporter: Send + Sync {
    fn on_start(&self, student_id: &str);
    fn on_complete(&self, outcome: &PredictionOutcome);
    fn on_error(&self, student_id: &str, error: &PredictError);
    fn on_batch_complete(&self, total: usize, failed: usize, elapsed: Duration);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl BatchReporter for NoopReporter {
    fn on_start(&self, _: &str) {}
    fn on_complete(&self, _: &PredictionOutcome) {}
    fn on_error(&self, _: &str, _: &PredictError) {}
    fn on_batch_complete(&self, _: usize, _: usize, _: Duration) {}
}

/// Result of one student's prediction within a batch.
#[derive(Debug)]
pub struct BatchEntry {
    pub student_id: String,
    pub result: Result<PredictionOutcome, PredictError>,
}

/// Predict `assessment_id` for every student, returning entries in input order.
pub async fn predict_many(
    invoker: &PredictionInvoker,
    student_ids: &[String],
    assessment_id: &str,
    parallelism: usize,
    reporter: &dyn BatchReporter,
) -> Vec<BatchEntry> {
    let start = Instant::now();
    let semaphore = Semaphore::new(parallelism.max(1));
    let mut futures = FuturesUnordered::new();

    for (index, student_id) in student_ids.iter().enumerate() {
        let semaphore = &semaphore;
        futures.push(async move {
            let result = match semaphore.acquire().await {
                Ok(_permit) => {
                    reporter.on_start(student_id);
                    invoker.predict(student_id, assessment_id).await
                }
                Err(_) => Err(PredictError::failed("batch scheduler shut down")),
            };
            match &result {
                Ok(outcome) => reporter.on_complete(outcome),
                Err(e) => reporter.on_error(student_id, e),
            }
            (
                index,
                BatchEntry {
                    student_id: student_id.clone(),
                    result,
                },
            )
        });
    }

    let mut entries = Vec::with_capacity(student_ids.len());
    while let Some(entry) = futures.next().await {
        entries.push(entry);
    }
    entries.sort_by_key(|(index, _)| *index);

    let failed = entries.iter().filter(|(_, e)| e.result.is_err()).count();
    reporter.on_batch_complete(entries.len(), failed, start.elapsed());
    tracing::info!(total = entries.len(), failed, "batch prediction finished");

    entries.into_iter().map(|(_, entry)| entry).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::pipeline::tests::{records_with_score, EchoPredictor};

    #[derive(Default)]
    struct CountingReporter {
        started: AtomicUsize,
        completed: AtomicUsize,
        errored: AtomicUsize,
    }

    impl BatchReporter for CountingReporter {
        fn on_start(&self, _: &str) {
            self.started.fetch_add(1, Ordering::Relaxed);
        }
        fn on_complete(&self, _: &PredictionOutcome) {
            self.completed.fetch_add(1, Ordering::Relaxed);
        }
        fn on_error(&self, _: &str, _: &PredictError) {
            self.errored.fetch_add(1, Ordering::Relaxed);
        }
        fn on_batch_complete(&self, _: usize, _: usize, _: Duration) {}
    }

    #[tokio::test]
    async fn batch_keeps_input_order_and_isolates_failures() {
        let predictor = Arc::new(EchoPredictor::returning(0.7));
        let invoker = PredictionInvoker::with_store(Arc::new(records_with_score(Some(40.0))), predictor);
        let students = vec!["s-2".to_string(), "ghost".to_string(), "s-1".to_string()];
        let reporter = CountingReporter::default();

        let entries = predict_many(&invoker, &students, "abc12345", 2, &reporter).await;

        let ids: Vec<&str> = entries.iter().map(|e| e.student_id.as_str()).collect();
        assert_eq!(ids, vec!["s-2", "ghost", "s-1"]);
        assert!(entries[0].result.is_ok());
        assert_eq!(entries[1].result.as_ref().unwrap_err().code(), "not_found");
        let s1 = entries[2].result.as_ref().unwrap();
        assert!((s1.weighted_score.unwrap() - 0.16).abs() < 1e-12);

        assert_eq!(reporter.started.load(Ordering::Relaxed), 3);
        assert_eq!(reporter.completed.load(Ordering::Relaxed), 2);
        assert_eq!(reporter.errored.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn zero_parallelism_still_runs() {
        let predictor = Arc::new(EchoPredictor::returning(0.7));
        let invoker = PredictionInvoker::with_store(Arc::new(records_with_score(None)), predictor);
        let students = vec!["s-1".to_string()];

        let entries = predict_many(&invoker, &students, "abc12345", 0, &NoopReporter).await;
        assert_eq!(entries.len(), 1);
        assert!(entries[0].result.is_ok());
    }
}
