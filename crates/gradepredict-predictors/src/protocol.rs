//! Predictor reply parsing shared by the subprocess and HTTP backends.

use serde_json::Value;

use gradepredict_core::traits::PredictionResponse;
use gradepredict_core::PredictError;

/// Longest slice of raw output quoted back in an error.
const MAX_QUOTED_OUTPUT: usize = 2000;

/// Parse a predictor reply body.
///
/// The body must be one JSON object with a numeric `predicted_score`. An
/// object carrying a non-null `error` is a failure reported by the predictor.
pub fn parse_response(body: &str) -> Result<PredictionResponse, PredictError> {
    let trimmed = body.trim();
    let value: Value = serde_json::from_str(trimmed).map_err(|e| {
        PredictError::failed(format!(
            "predictor output is not valid JSON ({e}): {}",
            quote(trimmed)
        ))
    })?;

    if let Some(error) = value.get("error").filter(|e| !e.is_null()) {
        let message = error
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(PredictError::failed(format!("predictor reported: {message}")));
    }

    serde_json::from_value(value).map_err(|e| {
        PredictError::failed(format!(
            "predictor reply has no usable predicted_score ({e}): {}",
            quote(trimmed)
        ))
    })
}

/// Pull a readable message out of an error body, falling back to the raw text.
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| quote(body.trim()))
}

pub(crate) fn quote(text: &str) -> String {
    if text.is_empty() {
        return "<empty>".to_string();
    }
    match text.char_indices().nth(MAX_QUOTED_OUTPUT) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_score_with_surrounding_whitespace() {
        let response = parse_response("\n {\"predicted_score\": 0.73}\n").unwrap();
        assert_eq!(response.predicted_score, 0.73);
    }

    #[test]
    fn non_json_output_attaches_raw_text() {
        let err = parse_response("Traceback: model not trained").unwrap_err();
        assert_eq!(err.code(), "prediction_failed");
        assert!(err.to_string().contains("Traceback: model not trained"));
    }

    #[test]
    fn empty_output_is_failure() {
        let err = parse_response("").unwrap_err();
        assert!(err.to_string().contains("<empty>"));
    }

    #[test]
    fn error_field_is_failure() {
        let err = parse_response(r#"{"error": "unknown student"}"#).unwrap_err();
        assert!(err.to_string().contains("unknown student"));

        // A null error is no error.
        let ok = parse_response(r#"{"error": null, "predicted_score": 0.1}"#).unwrap();
        assert_eq!(ok.predicted_score, 0.1);
    }

    #[test]
    fn missing_or_non_numeric_score_is_failure() {
        assert!(parse_response(r#"{"score": 0.5}"#).is_err());
        assert!(parse_response(r#"{"predicted_score": "high"}"#).is_err());
        assert!(parse_response("[0.5]").is_err());
    }

    #[test]
    fn error_message_prefers_error_field() {
        assert_eq!(error_message(r#"{"error": "boom"}"#), "boom");
        assert_eq!(error_message("plain text"), "plain text");
    }

    #[test]
    fn long_output_is_truncated() {
        let long = "x".repeat(MAX_QUOTED_OUTPUT + 50);
        let quoted = quote(&long);
        assert!(quoted.ends_with("..."));
        assert_eq!(quoted.len(), MAX_QUOTED_OUTPUT + 3);
    }
}
