//! Turning failed responses into typed errors.
//!
//! Alma reports failures in an error envelope whose shape varies between
//! endpoints and representations. Sometimes it is
//! `{"errorList":{"error":[{"errorCode":..,"errorMessage":..}]}}`, sometimes the
//! same thing wrapped in `web_service_result`, and sometimes `error` is a single
//! object rather than a list. Extraction therefore searches the whole document for
//! the first `errorCode` and `errorMessage` instead of following a fixed path.

use crate::body::{sniff, BodyKind, XmlDocument};
use crate::Error;
use http::StatusCode;
use serde_json::Value;

/// Error codes that mean the API gateway rejected the request, whatever the status.
pub const GATEWAY_ERROR_CODES: [&str; 8] = [
    "GENERAL_ERROR",
    "UNAUTHORIZED",
    "INVALID_REQUEST",
    "PER_SECOND_THRESHOLD",
    "DAILY_THRESHOLD",
    "REQUEST_TOO_LARGE",
    "FORBIDDEN",
    "ROUTING_ERROR",
];

const ERROR_CODE_KEY: &str = "errorCode";
const ERROR_MESSAGE_KEY: &str = "errorMessage";

/// Message and code pulled out of an error response body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorPayload {
    /// The value of the first `errorMessage` found.
    pub message: Option<String>,
    /// The value of the first `errorCode` found.
    pub code: Option<String>,
}

impl ErrorPayload {
    /// Extracts the error message and code from a raw response body.
    ///
    /// Bodies that are neither XML nor JSON, or that fail to decode, yield an
    /// empty payload.
    ///
    /// # Examples
    ///
    /// ```
    /// use alma_api::classify::ErrorPayload;
    ///
    /// let payload = ErrorPayload::extract(
    ///     r#"{"web_service_result":{"errorList":{"error":{"errorCode":"C","errorMessage":"M"}}}}"#,
    /// );
    /// assert_eq!(payload.code.as_deref(), Some("C"));
    /// assert_eq!(payload.message.as_deref(), Some("M"));
    /// ```
    pub fn extract(body: &str) -> Self {
        match sniff(body) {
            BodyKind::Xml => Self::from_xml(body),
            BodyKind::Json => Self::from_json(body),
            BodyKind::Blank | BodyKind::Unsupported => Self::default(),
        }
    }

    fn from_xml(body: &str) -> Self {
        let Ok(doc) = XmlDocument::parse(body) else {
            return Self::default();
        };

        Self {
            message: doc.trimmed_text(ERROR_MESSAGE_KEY),
            code: doc
                .trimmed_text(ERROR_CODE_KEY)
                .map(|code| code.to_uppercase()),
        }
    }

    fn from_json(body: &str) -> Self {
        let Ok(value) = serde_json::from_str::<Value>(body) else {
            return Self::default();
        };

        Self {
            message: deep_find(&value, ERROR_MESSAGE_KEY),
            code: deep_find(&value, ERROR_CODE_KEY),
        }
    }

    /// Returns `true` if neither a message nor a code was found.
    pub fn is_empty(&self) -> bool {
        self.message.is_none() && self.code.is_none()
    }
}

/// Depth-first search for the first usable value stored under `key`.
///
/// At each object the key itself is checked before any nested value is visited;
/// nested values are then searched in the order they appeared in the document.
/// Strings are returned as-is and numbers or booleans are stringified. `null`,
/// objects and arrays stored under `key` are not a match and the search goes on.
pub fn deep_find(value: &Value, key: &str) -> Option<String> {
    match value {
        Value::Object(map) => {
            if let Some(found) = map.get(key).and_then(scalar_to_string) {
                return Some(found);
            }
            map.values().find_map(|nested| deep_find(nested, key))
        }
        Value::Array(items) => items.iter().find_map(|item| deep_find(item, key)),
        _ => None,
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Returns `true` if `code` is one of the [`GATEWAY_ERROR_CODES`].
pub fn is_gateway_code(code: &str) -> bool {
    GATEWAY_ERROR_CODES.contains(&code)
}

/// Maps a non-2xx response to the matching [`Error`].
///
/// Gateway codes win over the status; otherwise 4xx is a logical error and 5xx a
/// server error. A blank body, a body without message and code, or any other
/// status gives a generic error.
pub fn classify(status: StatusCode, body: &str) -> Error {
    if body.trim().is_empty() {
        return Error::unexpected_without_cause();
    }

    let payload = ErrorPayload::extract(body);
    if payload.is_empty() {
        return Error::unexpected_without_cause();
    }

    let message = payload.message.as_deref();
    let code = payload.code.as_deref();

    if code.is_some_and(is_gateway_code) {
        return Error::gateway(message, code, status);
    }

    match status.as_u16() {
        400..=499 => Error::logical(message, code, status),
        500..=599 => Error::server(message, code, status),
        _ => Error::unexpected_without_cause(),
    }
}
