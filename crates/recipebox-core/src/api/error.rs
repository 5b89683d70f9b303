use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Fallback when the server supplied no message.
pub const GENERIC_MESSAGE: &str = "An error occurred";

/// Message for failures where no response was received.
pub const NETWORK_MESSAGE: &str = "Network error. Please check your connection.";

/// Fallback for local failures that carry no message of their own.
pub const UNEXPECTED_MESSAGE: &str = "An unexpected error occurred";

/// Message attached to client-side validation failures.
pub const VALIDATION_MESSAGE: &str = "Please fill in all required fields";

/// Maximum length for raw response bodies in log output
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Field name -> validation message.
pub type FieldErrors = BTreeMap<String, String>;

/// Failure category of an `ApiError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum ErrorKind {
    /// Field-level problems, from the server or from local checks.
    Validation,
    /// The credential is invalid or expired; the session was cleared.
    Unauthorized,
    /// Any other non-success status from the server.
    Server,
    /// No response was received (unreachable host, timeout).
    Network,
    /// A local failure (request construction, body encoding, bad payload).
    Unexpected,
}

/// The single failure shape returned by every `ApiClient` call.
///
/// `status_code` is the HTTP status, or 0 when no response was received or
/// the failure happened locally.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ApiError {
    pub status_code: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<FieldErrors>,
    pub kind: ErrorKind,
}

/// Error body as sent by the server: `{ "message": ..., "errors": {...} }`.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    errors: Option<serde_json::Value>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Map a non-success response into the normalized shape.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: ErrorBody = match serde_json::from_str(body) {
            Ok(parsed) => parsed,
            Err(_) => {
                if !body.is_empty() {
                    debug!(status, body = %Self::truncate_body(body), "Non-JSON error body");
                }
                ErrorBody::default()
            }
        };

        let message = parsed
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| GENERIC_MESSAGE.to_string());
        let field_errors = parsed.errors.as_ref().and_then(field_errors_from_value);

        let kind = if status == 401 {
            ErrorKind::Unauthorized
        } else if field_errors.is_some() {
            ErrorKind::Validation
        } else {
            ErrorKind::Server
        };

        Self {
            status_code: status,
            message,
            field_errors,
            kind,
        }
    }

    pub fn network() -> Self {
        Self {
            status_code: 0,
            message: NETWORK_MESSAGE.to_string(),
            field_errors: None,
            kind: ErrorKind::Network,
        }
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            status_code: 0,
            message: if message.trim().is_empty() {
                UNEXPECTED_MESSAGE.to_string()
            } else {
                message
            },
            field_errors: None,
            kind: ErrorKind::Unexpected,
        }
    }

    /// Local validation failure; never sent to the server.
    pub fn validation(field_errors: FieldErrors) -> Self {
        Self {
            status_code: 0,
            message: VALIDATION_MESSAGE.to_string(),
            field_errors: Some(field_errors),
            kind: ErrorKind::Validation,
        }
    }

    /// An operation that needs a session was called without one.
    pub fn not_logged_in() -> Self {
        Self {
            status_code: 0,
            message: "Not logged in".to_string(),
            field_errors: None,
            kind: ErrorKind::Unauthorized,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == ErrorKind::Unauthorized
    }

    /// Validation message for a single field, if any.
    pub fn field_error(&self, field: &str) -> Option<&str> {
        self.field_errors
            .as_ref()
            .and_then(|errors| errors.get(field))
            .map(String::as_str)
    }
}

/// Accepts `{"field": "msg"}` and `{"field": ["msg", ...]}`.
fn field_errors_from_value(value: &serde_json::Value) -> Option<FieldErrors> {
    let object = value.as_object()?;
    let errors: FieldErrors = object
        .iter()
        .filter_map(|(field, v)| {
            let message = match v {
                serde_json::Value::Null => return None,
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Array(items) => items
                    .iter()
                    .find_map(|item| item.as_str().map(str::to_string))?,
                serde_json::Value::Object(inner) => inner
                    .get("message")
                    .or_else(|| inner.get("msg"))
                    .and_then(|m| m.as_str())
                    .map(str::to_string)?,
                other => other.to_string(),
            };
            Some((field.clone(), message))
        })
        .collect();

    if errors.is_empty() {
        None
    } else {
        Some(errors)
    }
}

/// Failure of the low-level send primitive, before normalization.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Request timed out")]
    Timeout,

    #[error("Server unreachable: {0}")]
    Unreachable(String),

    /// The request could not be built or encoded locally.
    #[error("{0}")]
    Local(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            TransportError::Local(err.to_string())
        } else if err.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Unreachable(err.to_string())
        }
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout | TransportError::Unreachable(_) => ApiError::network(),
            TransportError::Local(message) => ApiError::unexpected(message),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::unexpected(err.to_string())
    }
}
