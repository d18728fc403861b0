//! Per-request settings.

use crate::Format;
use http::Method;

/// Query parameter that Alma's user-authentication endpoint expects as a header.
pub const PASSWORD_PARAM: &str = "password";

/// Header the password is moved to.
pub const USER_PASSWORD_HEADER: &str = "Exl-User-Pw";

/// Metadata for an individual Alma request.
///
/// Holds everything that varies between calls: method, path, query parameters,
/// body, and an optional format overriding the configured default.
///
/// # Examples
///
/// ```
/// use alma_api::metadata::RequestMetadata;
/// use alma_api::Format;
/// use http::Method;
///
/// let metadata = RequestMetadata::new(Method::GET, "/users/jdoe")
///     .with_query_param("view", "full")
///     .with_format(Format::Xml);
///
/// assert_eq!(metadata.query_params, vec![("view".to_string(), "full".to_string())]);
/// ```
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    /// The HTTP method (GET, POST, etc.).
    pub method: Method,

    /// The request path, appended to the configured base URL.
    pub path: String,

    /// Query parameters, in the order they will be sent.
    pub query_params: Vec<(String, String)>,

    /// Opaque request body for POST and PUT.
    pub body: Option<String>,

    /// Format for this request; `None` uses the configured default.
    pub format: Option<Format>,
}

impl RequestMetadata {
    /// Creates a new `RequestMetadata` with the given method and path.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query_params: Vec::new(),
            body: None,
            format: None,
        }
    }

    /// Adds a query parameter, replacing an earlier one with the same key.
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.query_params.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value,
            None => self.query_params.push((key, value)),
        }
        self
    }

    /// Adds multiple query parameters.
    pub fn with_query_params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in params {
            self = self.with_query_param(key, value);
        }
        self
    }

    /// Sets the request body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Overrides the configured default format for this request.
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    /// Removes the `password` query parameter and returns its value.
    ///
    /// Alma's `POST /users/{id}` authentication call takes the password in the
    /// `Exl-User-Pw` header, never in the URL.
    pub(crate) fn take_user_password(&mut self) -> Option<String> {
        let index = self
            .query_params
            .iter()
            .position(|(key, _)| key == PASSWORD_PARAM)?;
        Some(self.query_params.remove(index).1)
    }
}

impl Default for RequestMetadata {
    fn default() -> Self {
        Self::new(Method::GET, "")
    }
}
