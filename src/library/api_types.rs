//! Serde types matching the library service's response envelopes.
//!
//! Domain types live in `types`; these only describe what goes over the wire
//! around them.

use serde::Deserialize;
use std::collections::BTreeMap;

/// Successful response envelope: `{ "data": ... }`
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
  pub data: Option<T>,
}

// ============================================================================
// Error body
// ============================================================================

/// Error response body. Every field is optional because the service is not
/// consistent about which ones it sends.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
  #[serde(default)]
  pub message: Option<String>,
  /// Machine-readable error code, when the service provides one
  #[serde(default)]
  pub code: Option<String>,
  #[serde(default)]
  pub error: Option<ApiErrorDetail>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorDetail {
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub message: Option<String>,
  /// Per-field validation errors keyed by field path
  #[serde(default)]
  pub errors: BTreeMap<String, ApiFieldError>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiFieldError {
  #[serde(default)]
  pub message: Option<String>,
  #[serde(default)]
  pub kind: Option<String>,
}

impl ApiErrorBody {
  /// Parse an error body, tolerating empty or non-JSON bodies.
  pub fn parse(body: &[u8]) -> Self {
    if body.is_empty() {
      return Self::default();
    }
    match serde_json::from_slice::<Self>(body) {
      Ok(parsed) => parsed,
      Err(_) => {
        let text = String::from_utf8_lossy(body).trim().to_string();
        Self {
          message: (!text.is_empty()).then_some(text),
          ..Self::default()
        }
      }
    }
  }

  /// Best available human readable message
  pub fn best_message(&self) -> Option<String> {
    self
      .message
      .clone()
      .or_else(|| self.error.as_ref().and_then(|e| e.message.clone()))
  }

  pub fn is_validation(&self) -> bool {
    self
      .error
      .as_ref()
      .map(|e| e.name.as_deref() == Some("ValidationError") || !e.errors.is_empty())
      .unwrap_or(false)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_mongoose_validation_body() {
    let body = br#"{
      "message": "Validation failed",
      "success": false,
      "error": {
        "name": "ValidationError",
        "errors": {
          "copies": { "message": "Copies must be a positive number", "kind": "min" }
        }
      }
    }"#;
    let parsed = ApiErrorBody::parse(body);
    assert!(parsed.is_validation());
    assert_eq!(parsed.best_message().as_deref(), Some("Validation failed"));
    let detail = parsed.error.unwrap();
    assert_eq!(
      detail.errors["copies"].message.as_deref(),
      Some("Copies must be a positive number")
    );
  }

  #[test]
  fn test_parse_plain_text_body() {
    let parsed = ApiErrorBody::parse(b"Bad Gateway");
    assert_eq!(parsed.message.as_deref(), Some("Bad Gateway"));
    assert!(!parsed.is_validation());
  }

  #[test]
  fn test_parse_empty_body() {
    let parsed = ApiErrorBody::parse(b"");
    assert!(parsed.best_message().is_none());
  }

  #[test]
  fn test_envelope_with_null_data() {
    let env: ApiEnvelope<serde_json::Value> =
      serde_json::from_str(r#"{"success":true,"data":null}"#).unwrap();
    assert!(env.data.is_none());
  }
}
