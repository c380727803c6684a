//! JSON envelopes written to stdout.
//!
//! Exactly one JSON object is printed per invocation; all diagnostics go
//! to stderr so callers can parse stdout unconditionally.

use serde::Serialize;

/// Result envelope for one transcription run.
///
/// Exactly one of `text` and `error` is present.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub backend: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_backends: Option<Vec<String>>,
}

impl TranscriptionResult {
    /// Successful transcription.
    pub fn ok(
        text: impl Into<String>,
        backend: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            success: true,
            text: Some(text.into()),
            backend: backend.into(),
            model: model.into(),
            error: None,
            available_backends: None,
        }
    }

    /// Failed run.
    pub fn failure(
        error: impl Into<String>,
        backend: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            text: None,
            backend: backend.into(),
            model: model.into(),
            error: Some(error.into()),
            available_backends: None,
        }
    }

    /// Attach the probed backend set, for selection failures.
    pub fn with_available(mut self, available: Vec<String>) -> Self {
        self.available_backends = Some(available);
        self
    }
}

/// Envelope for `--list-backends`.
#[derive(Debug, Clone, Serialize)]
pub struct BackendList {
    pub available_backends: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_has_text_and_no_error() {
        let result = TranscriptionResult::ok("hello world", "moonshine", "tiny");
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["text"], "hello world");
        assert_eq!(json["backend"], "moonshine");
        assert_eq!(json["model"], "tiny");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_failure_has_error_and_no_text() {
        let result = TranscriptionResult::failure("boom", "whisper", "base");
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "boom");
        assert!(json.get("text").is_none());
    }

    #[test]
    fn test_available_backends_attached() {
        let result = TranscriptionResult::failure("nope", "auto", "tiny")
            .with_available(vec!["whisper".to_string()]);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["available_backends"][0], "whisper");
    }

    #[test]
    fn test_available_backends_omitted_by_default() {
        let result = TranscriptionResult::ok("hi", "whisper", "tiny");
        let json = serde_json::to_value(&result).unwrap();

        assert!(json.get("available_backends").is_none());
    }

    #[test]
    fn test_backend_list() {
        let list = BackendList {
            available_backends: vec!["moonshine".to_string(), "whisper".to_string()],
        };
        let json = serde_json::to_string(&list).unwrap();

        assert_eq!(
            json,
            "{\"available_backends\":[\"moonshine\",\"whisper\"]}"
        );
    }
}
