//! HTTP predictor for model-serving endpoints.

use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use tracing::instrument;

use gradepredict_core::traits::{PredictionRequest, PredictionResponse, Predictor};
use gradepredict_core::PredictError;

use crate::protocol::{error_message, parse_response};

/// Predictor that POSTs the request to `{base_url}/predict`.
pub struct HttpPredictor {
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpPredictor {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        anyhow::ensure!(!base_url.trim().is_empty(), "predictor base_url must not be empty");

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            timeout,
            client,
        })
    }

    fn map_transport_error(&self, e: reqwest::Error) -> PredictError {
        if e.is_timeout() {
            PredictError::PredictionTimedOut {
                after_ms: self.timeout.as_millis() as u64,
            }
        } else if e.is_connect() {
            PredictError::failed(format!(
                "predictor not reachable at {}: {e}",
                self.base_url
            ))
        } else {
            PredictError::failed(format!("request to predictor failed: {e}"))
        }
    }
}

#[async_trait]
impl Predictor for HttpPredictor {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self, request), fields(base_url = %self.base_url, student_id = %request.student_id))]
    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResponse, PredictError> {
        let start = Instant::now();

        let mut builder = self
            .client
            .post(format!("{}/predict", self.base_url))
            .json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        tracing::debug!(
            status,
            latency_ms = start.elapsed().as_millis() as u64,
            "predictor responded"
        );

        if status >= 400 {
            return Err(PredictError::failed(format!(
                "predictor returned HTTP {status}: {}",
                error_message(&body)
            )));
        }

        parse_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradepredict_core::model::ColumnKey;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(score: Option<f64>) -> PredictionRequest {
        PredictionRequest::single("s-1", ColumnKey::from("Quiz_abc12"), score)
    }

    #[tokio::test]
    async fn successful_prediction() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/predict"))
            .and(body_json(serde_json::json!({
                "student_id": "s-1",
                "previous_grades": {"Quiz_abc12": 0.16}
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"predicted_score": 0.77, "model": "rf"})),
            )
            .mount(&server)
            .await;

        let predictor = HttpPredictor::new(&server.uri(), None, Duration::from_secs(5)).unwrap();
        let response = predictor.predict(&request(Some(0.16))).await.unwrap();
        assert_eq!(response.predicted_score, 0.77);
        assert_eq!(response.extra.get("model").and_then(|v| v.as_str()), Some("rf"));
    }

    #[tokio::test]
    async fn missing_score_is_sent_as_null() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/predict"))
            .and(body_json(serde_json::json!({
                "student_id": "s-1",
                "previous_grades": {"Quiz_abc12": null}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"predicted_score": 0.3})))
            .expect(1)
            .mount(&server)
            .await;

        let predictor = HttpPredictor::new(&server.uri(), None, Duration::from_secs(5)).unwrap();
        let response = predictor.predict(&request(None)).await.unwrap();
        assert_eq!(response.predicted_score, 0.3);
    }

    #[tokio::test]
    async fn api_key_sent_as_bearer() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/predict"))
            .and(header("authorization", "Bearer secret-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"predicted_score": 0.5})))
            .expect(1)
            .mount(&server)
            .await;

        let base = format!("{}/", server.uri());
        let predictor =
            HttpPredictor::new(&base, Some("secret-key".into()), Duration::from_secs(5)).unwrap();
        predictor.predict(&request(Some(0.1))).await.unwrap();
    }

    #[tokio::test]
    async fn server_error_surfaces_message() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/predict"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(serde_json::json!({"error": "model not trained"})),
            )
            .mount(&server)
            .await;

        let predictor = HttpPredictor::new(&server.uri(), None, Duration::from_secs(5)).unwrap();
        let err = predictor.predict(&request(Some(0.1))).await.unwrap_err();
        assert_eq!(err.code(), "prediction_failed");
        assert!(err.to_string().contains("HTTP 500"));
        assert!(err.to_string().contains("model not trained"));
    }

    #[tokio::test]
    async fn non_json_body_is_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/predict"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let predictor = HttpPredictor::new(&server.uri(), None, Duration::from_secs(5)).unwrap();
        let err = predictor.predict(&request(Some(0.1))).await.unwrap_err();
        assert!(err.to_string().contains("<html>oops</html>"));
    }

    #[tokio::test]
    async fn slow_server_times_out() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/predict"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"predicted_score": 0.5}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let predictor = HttpPredictor::new(&server.uri(), None, Duration::from_millis(200)).unwrap();
        let err = predictor.predict(&request(Some(0.1))).await.unwrap_err();
        assert!(matches!(err, PredictError::PredictionTimedOut { after_ms: 200 }));
    }

    #[tokio::test]
    async fn unreachable_server_is_failure() {
        // Nothing listens on port 9 on test machines.
        let predictor =
            HttpPredictor::new("http://127.0.0.1:9", None, Duration::from_secs(2)).unwrap();
        let err = predictor.predict(&request(Some(0.1))).await.unwrap_err();
        assert_eq!(err.code(), "prediction_failed");
    }

    #[test]
    fn empty_base_url_rejected() {
        assert!(HttpPredictor::new("  ", None, Duration::from_secs(1)).is_err());
    }
}
