//! Error types for Alma API calls.
//!
//! Every failed request ends in exactly one of four kinds: [`ErrorKind::Gateway`],
//! [`ErrorKind::Server`], [`ErrorKind::Logical`] or [`ErrorKind::Generic`]. Each carries
//! a human readable message and a best-effort error code taken from the API's error
//! payload. Configuration problems get their own variants and are only ever returned
//! while building a [`Configuration`](crate::Configuration) or a request.

use http::StatusCode;

/// Code used when the API did not report one.
pub const DEFAULT_ERROR_CODE: &str = "UNKNOWN";

/// Message used when the API did not report one.
pub const DEFAULT_ERROR_MESSAGE: &str = "Unknown cause";

/// Message for failures that could not be attributed to the API.
pub const UNEXPECTED_ERROR_MESSAGE: &str = "Unexpected error";

/// Code reported when the client itself could not make sense of a response body.
pub const API_CLIENT_ERROR_CODE: &str = "API_CLIENT_ERROR";

/// The broad category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Rejected by the API gateway (authentication, quota, malformed request),
    /// identified by error code regardless of HTTP status.
    Gateway,
    /// A 5xx fault inside Alma.
    Server,
    /// A 4xx application-level rejection, e.g. an unknown identifier.
    Logical,
    /// Anything that could not be classified: network failures, empty or
    /// malformed bodies, unexpected statuses.
    Generic,
    /// Invalid client configuration or request arguments.
    Configuration,
}

/// The main error type for Alma API calls.
///
/// # Examples
///
/// ```no_run
/// use alma_api::{Client, Error};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::configure(|config| config.api_key("my-key"))?;
///
/// match client.get("/users/1234", &[]).await {
///     Ok(response) => println!("Found: {:?}", response.data),
///     Err(Error::Logical { message, code, .. }) => {
///         eprintln!("Alma rejected the request ({code}): {message}");
///     }
///     Err(Error::Gateway { code, .. }) if code == "DAILY_THRESHOLD" => {
///         eprintln!("Out of API calls for today");
///     }
///     Err(e) => eprintln!("Other error: {e}"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The API gateway rejected the request.
    #[error("Gateway error [{code}]: {message}")]
    Gateway {
        /// The error message reported by the API
        message: String,
        /// The error code reported by the API
        code: String,
        /// The HTTP status of the response
        status: StatusCode,
    },

    /// Alma failed while processing the request (5xx).
    #[error("Server error [{code}]: {message}")]
    Server {
        /// The error message reported by the API
        message: String,
        /// The error code reported by the API
        code: String,
        /// The HTTP status of the response
        status: StatusCode,
    },

    /// Alma refused the request for application reasons (4xx).
    #[error("Logical error [{code}]: {message}")]
    Logical {
        /// The error message reported by the API
        message: String,
        /// The error code reported by the API
        code: String,
        /// The HTTP status of the response
        status: StatusCode,
    },

    /// Any failure that does not fit the other kinds.
    ///
    /// The underlying cause, if any, is only reachable through
    /// [`std::error::Error::source`]; the message never exposes transport details.
    #[error("Error [{code}]: {message}")]
    Generic {
        /// A human readable description
        message: String,
        /// A best-effort error code
        code: String,
        /// The failure that triggered this error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Invalid configuration was provided.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A format other than `json` or `xml` was requested.
    #[error("Unsupported format '{0}'. Only 'json' and 'xml' is supported.")]
    UnsupportedFormat(String),

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Creates a generic error, falling back to the default message and code
    /// when either is missing or empty.
    pub fn generic(message: Option<&str>, code: Option<&str>) -> Self {
        Error::Generic {
            message: message_or_default(message),
            code: code_or_default(code),
            source: None,
        }
    }

    /// Creates the generic "unexpected error" wrapping `source`.
    pub(crate) fn unexpected<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Generic {
            message: UNEXPECTED_ERROR_MESSAGE.to_string(),
            code: DEFAULT_ERROR_CODE.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates the generic "unexpected error" without a cause.
    pub(crate) fn unexpected_without_cause() -> Self {
        Self::generic(Some(UNEXPECTED_ERROR_MESSAGE), None)
    }

    pub(crate) fn gateway(message: Option<&str>, code: Option<&str>, status: StatusCode) -> Self {
        Error::Gateway {
            message: message_or_default(message),
            code: code_or_default(code),
            status,
        }
    }

    pub(crate) fn server(message: Option<&str>, code: Option<&str>, status: StatusCode) -> Self {
        Error::Server {
            message: message_or_default(message),
            code: code_or_default(code),
            status,
        }
    }

    pub(crate) fn logical(message: Option<&str>, code: Option<&str>, status: StatusCode) -> Self {
        Error::Logical {
            message: message_or_default(message),
            code: code_or_default(code),
            status,
        }
    }

    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Gateway { .. } => ErrorKind::Gateway,
            Error::Server { .. } => ErrorKind::Server,
            Error::Logical { .. } => ErrorKind::Logical,
            Error::Generic { .. } => ErrorKind::Generic,
            Error::Configuration(_) | Error::UnsupportedFormat(_) | Error::InvalidUrl(_) => {
                ErrorKind::Configuration
            }
        }
    }

    /// Returns the error message without the kind and code decoration.
    pub fn message(&self) -> String {
        match self {
            Error::Gateway { message, .. }
            | Error::Server { message, .. }
            | Error::Logical { message, .. }
            | Error::Generic { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Returns the error code. Configuration errors report [`DEFAULT_ERROR_CODE`].
    pub fn code(&self) -> &str {
        match self {
            Error::Gateway { code, .. }
            | Error::Server { code, .. }
            | Error::Logical { code, .. }
            | Error::Generic { code, .. } => code,
            _ => DEFAULT_ERROR_CODE,
        }
    }

    /// Returns the HTTP status code if this error came from an API response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Gateway { status, .. }
            | Error::Server { status, .. }
            | Error::Logical { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn message_or_default(message: Option<&str>) -> String {
    match message {
        Some(m) if !m.trim().is_empty() => m.to_string(),
        _ => DEFAULT_ERROR_MESSAGE.to_string(),
    }
}

fn code_or_default(code: Option<&str>) -> String {
    match code {
        Some(c) if !c.trim().is_empty() => c.to_string(),
        _ => DEFAULT_ERROR_CODE.to_string(),
    }
}

/// A specialized `Result` type for Alma API calls.
pub type Result<T> = std::result::Result<T, Error>;
