//! Response wrapper that keeps the parsed body next to the raw response details.

use crate::Body;
use http::{HeaderMap, StatusCode};
use std::time::Duration;

/// A successful Alma response.
///
/// Derefs to the parsed body, so `response.as_ref()` and `*response` give the
/// `Option<Body>` directly while status, headers, latency and the raw text stay
/// available for logging and debugging.
///
/// # Examples
///
/// ```no_run
/// use alma_api::Client;
///
/// # async fn example() -> Result<(), alma_api::Error> {
/// let client = Client::configure(|config| config.api_key("my-key"))?;
///
/// let response = client.get("/users/jdoe", &[("view", "brief")]).await?;
///
/// if let Some(user) = response.data.as_ref().and_then(|body| body.as_json()) {
///     println!("User: {}", user["full_name"]);
/// }
/// println!("Request took {:?}", response.latency);
/// println!("Calls left today: {:?}", response.remaining_api_calls);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response<T = Option<Body>> {
    /// The parsed response data.
    pub data: T,

    /// The raw response body as a string.
    pub raw_body: String,

    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// Time from sending the request until the body was read.
    pub latency: Duration,

    /// The `x-exl-api-remaining` header value, if present.
    pub remaining_api_calls: Option<i64>,
}

impl<T> Response<T> {
    /// Creates a new `Response`.
    pub fn new(
        data: T,
        raw_body: String,
        status: StatusCode,
        headers: HeaderMap,
        latency: Duration,
        remaining_api_calls: Option<i64>,
    ) -> Self {
        Self {
            data,
            raw_body,
            status,
            headers,
            latency,
            remaining_api_calls,
        }
    }

    /// Maps the response data to a different type, keeping the metadata.
    ///
    /// # Examples
    ///
    /// ```
    /// # use alma_api::Response;
    /// # use http::{HeaderMap, StatusCode};
    /// # use std::time::Duration;
    /// let response = Response::new(
    ///     42,
    ///     "42".to_string(),
    ///     StatusCode::OK,
    ///     HeaderMap::new(),
    ///     Duration::from_millis(100),
    ///     None,
    /// );
    ///
    /// let string_response = response.map(|n| n.to_string());
    /// assert_eq!(string_response.data, "42");
    /// ```
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            data: f(self.data),
            raw_body: self.raw_body,
            status: self.status,
            headers: self.headers,
            latency: self.latency,
            remaining_api_calls: self.remaining_api_calls,
        }
    }

    /// Returns a header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

impl Response<Option<Body>> {
    /// Returns the body as JSON, if it was JSON.
    pub fn json(&self) -> Option<&serde_json::Value> {
        self.data.as_ref()?.as_json()
    }

    /// Returns the body as an XML document, if it was XML.
    pub fn xml(&self) -> Option<&crate::XmlDocument> {
        self.data.as_ref()?.as_xml()
    }
}

impl<T> AsRef<T> for Response<T> {
    fn as_ref(&self) -> &T {
        &self.data
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}
