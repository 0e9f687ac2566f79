//! Error taxonomy for calls against the library service.

use thiserror::Error;

use super::api_types::ApiErrorBody;

/// Message the service sends when a borrow asks for more copies than it holds.
/// Only consulted when the response carries no structured code.
const INSUFFICIENT_COPIES_MESSAGE: &str = "not enough book to borrow";

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
  Network,
  Service,
  Validation,
  NotFound,
  InsufficientCopies,
  Decode,
}

impl ErrorCode {
  pub fn as_str(&self) -> &'static str {
    match self {
      ErrorCode::Network => "NETWORK_ERROR",
      ErrorCode::Service => "SERVICE_ERROR",
      ErrorCode::Validation => "VALIDATION_ERROR",
      ErrorCode::NotFound => "NOT_FOUND",
      ErrorCode::InsufficientCopies => "INSUFFICIENT_COPIES",
      ErrorCode::Decode => "DECODE_ERROR",
    }
  }

  fn from_wire(code: &str) -> Option<Self> {
    match code.trim().to_uppercase().as_str() {
      "INSUFFICIENT_COPIES" => Some(ErrorCode::InsufficientCopies),
      "VALIDATION_ERROR" => Some(ErrorCode::Validation),
      "NOT_FOUND" => Some(ErrorCode::NotFound),
      _ => None,
    }
  }
}

/// A single field rejected by the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
  pub field: String,
  pub message: String,
}

/// Errors surfaced by the data access layer.
///
/// Clone is required: one coalesced request hands the same result to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
  /// Transport failure (connection refused, timeout, TLS)
  #[error("Network error: {0}")]
  Network(String),

  /// Non-2xx response that doesn't fit a more specific variant
  #[error("Service error ({status}): {message}")]
  Service { status: u16, message: String },

  /// Payload rejected, with per-field detail when the service sends it
  #[error("Validation failed: {message}")]
  Validation {
    message: String,
    fields: Vec<FieldError>,
  },

  /// The requested resource does not exist
  #[error("Not found: {0}")]
  NotFound(String),

  /// Borrow quantity exceeds the copies on hand
  #[error("Insufficient copies: {0}")]
  InsufficientCopies(String),

  /// 2xx response whose body isn't what the endpoint promises
  #[error("Unexpected response: {0}")]
  Decode(String),
}

impl ApiError {
  pub fn code(&self) -> ErrorCode {
    match self {
      ApiError::Network(_) => ErrorCode::Network,
      ApiError::Service { .. } => ErrorCode::Service,
      ApiError::Validation { .. } => ErrorCode::Validation,
      ApiError::NotFound(_) => ErrorCode::NotFound,
      ApiError::InsufficientCopies(_) => ErrorCode::InsufficientCopies,
      ApiError::Decode(_) => ErrorCode::Decode,
    }
  }

  /// Classify a non-2xx response.
  ///
  /// `resource` names what was addressed (e.g. "book 42") and is used for the
  /// NotFound message.
  pub fn from_response(status: u16, body: &[u8], resource: &str) -> Self {
    let parsed = ApiErrorBody::parse(body);
    let message = parsed
      .best_message()
      .unwrap_or_else(|| format!("HTTP {}", status));

    let wire_code = parsed.code.as_deref().and_then(ErrorCode::from_wire);
    let sniffed_insufficient = message
      .trim()
      .trim_end_matches('.')
      .eq_ignore_ascii_case(INSUFFICIENT_COPIES_MESSAGE);

    if wire_code == Some(ErrorCode::InsufficientCopies) || sniffed_insufficient {
      return ApiError::InsufficientCopies(message);
    }

    if status == 404 || wire_code == Some(ErrorCode::NotFound) {
      return ApiError::NotFound(resource.to_string());
    }

    if (400..500).contains(&status)
      && (parsed.is_validation() || status == 422 || wire_code == Some(ErrorCode::Validation))
    {
      let fields = parsed
        .error
        .map(|detail| {
          detail
            .errors
            .into_iter()
            .map(|(field, err)| FieldError {
              message: err
                .message
                .unwrap_or_else(|| err.kind.unwrap_or_else(|| "invalid".to_string())),
              field,
            })
            .collect()
        })
        .unwrap_or_default();
      return ApiError::Validation { message, fields };
    }

    ApiError::Service { status, message }
  }

  /// Short text suitable for a toast or an error pane
  pub fn user_message(&self) -> String {
    match self {
      ApiError::InsufficientCopies(_) => {
        "Can't borrow more than the available quantity!".to_string()
      }
      ApiError::Validation { message, fields } => match fields.first() {
        Some(first) if fields.len() == 1 => format!("{}: {}", first.field, first.message),
        Some(first) => format!(
          "{}: {} (+{} more)",
          first.field,
          first.message,
          fields.len() - 1
        ),
        None => message.clone(),
      },
      ApiError::NotFound(what) => format!("{} was not found", what),
      ApiError::Network(_) => "Unable to reach the library service".to_string(),
      ApiError::Service { message, .. } => message.clone(),
      ApiError::Decode(_) => "The library service sent an unexpected response".to_string(),
    }
  }
}

impl From<reqwest::Error> for ApiError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_decode() {
      ApiError::Decode(err.to_string())
    } else {
      ApiError::Network(err.to_string())
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_insufficient_copies_from_message() {
    let body = br#"{"message":"Not enough Book to borrow.","success":false}"#;
    let err = ApiError::from_response(400, body, "borrow");
    assert_eq!(err.code(), ErrorCode::InsufficientCopies);
  }

  #[test]
  fn test_insufficient_copies_from_code() {
    let body = br#"{"message":"Quantity too large","code":"INSUFFICIENT_COPIES"}"#;
    let err = ApiError::from_response(409, body, "borrow");
    assert_eq!(
      err,
      ApiError::InsufficientCopies("Quantity too large".to_string())
    );
  }

  #[test]
  fn test_generic_bad_request_is_service_error() {
    let body = br#"{"message":"Something broke"}"#;
    let err = ApiError::from_response(400, body, "borrow");
    assert_eq!(
      err,
      ApiError::Service {
        status: 400,
        message: "Something broke".to_string()
      }
    );
  }

  #[test]
  fn test_not_found() {
    let err = ApiError::from_response(404, b"", "book 42");
    assert_eq!(err, ApiError::NotFound("book 42".to_string()));
    assert_eq!(err.user_message(), "book 42 was not found");
  }

  #[test]
  fn test_validation_with_fields() {
    let body = br#"{
      "message": "Validation failed",
      "error": {
        "name": "ValidationError",
        "errors": {
          "isbn": { "message": "ISBN is required", "kind": "required" },
          "title": { "kind": "required" }
        }
      }
    }"#;
    let err = ApiError::from_response(400, body, "books");
    match &err {
      ApiError::Validation { fields, .. } => {
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].field, "isbn");
        assert_eq!(fields[0].message, "ISBN is required");
        assert_eq!(fields[1].message, "required");
      }
      other => panic!("expected validation error, got {:?}", other),
    }
    assert_eq!(err.user_message(), "isbn: ISBN is required (+1 more)");
  }

  #[test]
  fn test_server_error_without_body() {
    let err = ApiError::from_response(503, b"", "books");
    assert_eq!(
      err,
      ApiError::Service {
        status: 503,
        message: "HTTP 503".to_string()
      }
    );
  }
}
