//! The Alma API client.
//!
//! [`Client`] turns each verb call into exactly one HTTP exchange and hands back
//! either the parsed body or one of the typed [`Error`] kinds. There is no retry
//! logic: a failed call fails once.

use crate::{
    body::parse_body,
    classify::classify,
    config::{Configuration, ConfigurationBuilder},
    metadata::{RequestMetadata, USER_PASSWORD_HEADER},
    quota::{QuotaTracker, UNKNOWN_REMAINING},
    Error, Format, Response, Result,
};
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderValue, Method};
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// Cheap endpoint used to read the remaining call quota.
pub const QUOTA_CHECK_PATH: &str = "/conf/test";

/// Query parameter carrying the response language.
const LANGUAGE_PARAM: &str = "lang";

/// A client for the Alma REST API.
///
/// Cloning is cheap and clones share the underlying connection pool, so a single
/// client can serve many tasks at once.
///
/// # Examples
///
/// ```no_run
/// use alma_api::{Client, Configuration, Gateway};
///
/// # async fn example() -> Result<(), alma_api::Error> {
/// let config = Configuration::builder()
///     .api_key("l8xx0123456789")
///     .base_url(Gateway::Na)
///     .build()?;
/// let client = Client::new(config)?;
///
/// let user = client.get("/users/jdoe", &[("view", "full")]).await?;
/// println!("{:?}", user.json());
///
/// let loan = r#"{"circ_desk":{"value":"DEFAULT_CIRC_DESK"}}"#;
/// client
///     .post("/users/jdoe/loans", &[("item_barcode", "39001")], Some(loan))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    configuration: Configuration,
    quota: QuotaTracker,
}

impl Client {
    /// Creates a client for the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(configuration: Configuration) -> Result<Self> {
        let http_client = reqwest::Client::builder().build().map_err(|e| {
            Error::Configuration(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(Client {
            inner: Arc::new(ClientInner {
                http_client,
                configuration,
                quota: QuotaTracker::new(),
            }),
        })
    }

    /// Builds a configuration with `f` and creates a client from it.
    ///
    /// # Examples
    ///
    /// ```
    /// use alma_api::Client;
    ///
    /// let client = Client::configure(|config| {
    ///     config
    ///         .api_key("1234")
    ///         .base_url("https://api-eu.hosted.exlibrisgroup.com/almaws/v1/")
    ///         .language("de")
    /// })
    /// .unwrap();
    ///
    /// assert_eq!(
    ///     client.configuration().base_url(),
    ///     "https://api-eu.hosted.exlibrisgroup.com/almaws/v1"
    /// );
    /// ```
    pub fn configure<F>(f: F) -> Result<Self>
    where
        F: FnOnce(ConfigurationBuilder) -> ConfigurationBuilder,
    {
        Self::new(f(Configuration::builder()).build()?)
    }

    /// The configuration this client was built with.
    pub fn configuration(&self) -> &Configuration {
        &self.inner.configuration
    }

    /// Makes a GET request in the configured default format.
    pub async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<Response> {
        self.get_with_format(path, params, None).await
    }

    /// Makes a GET request, optionally overriding the default format.
    pub async fn get_with_format(
        &self,
        path: &str,
        params: &[(&str, &str)],
        format: Option<Format>,
    ) -> Result<Response> {
        self.call(verb_metadata(Method::GET, path, params, None, format))
            .await
    }

    /// Makes a POST request with an optional body.
    pub async fn post(
        &self,
        path: &str,
        params: &[(&str, &str)],
        body: Option<&str>,
    ) -> Result<Response> {
        self.post_with_format(path, params, body, None).await
    }

    /// Makes a POST request, optionally overriding the default format.
    pub async fn post_with_format(
        &self,
        path: &str,
        params: &[(&str, &str)],
        body: Option<&str>,
        format: Option<Format>,
    ) -> Result<Response> {
        self.call(verb_metadata(Method::POST, path, params, body, format))
            .await
    }

    /// Makes a PUT request with an optional body.
    pub async fn put(
        &self,
        path: &str,
        params: &[(&str, &str)],
        body: Option<&str>,
    ) -> Result<Response> {
        self.put_with_format(path, params, body, None).await
    }

    /// Makes a PUT request, optionally overriding the default format.
    pub async fn put_with_format(
        &self,
        path: &str,
        params: &[(&str, &str)],
        body: Option<&str>,
        format: Option<Format>,
    ) -> Result<Response> {
        self.call(verb_metadata(Method::PUT, path, params, body, format))
            .await
    }

    /// Makes a DELETE request in the configured default format.
    pub async fn delete(&self, path: &str, params: &[(&str, &str)]) -> Result<Response> {
        self.delete_with_format(path, params, None).await
    }

    /// Makes a DELETE request, optionally overriding the default format.
    pub async fn delete_with_format(
        &self,
        path: &str,
        params: &[(&str, &str)],
        format: Option<Format>,
    ) -> Result<Response> {
        self.call(verb_metadata(Method::DELETE, path, params, None, format))
            .await
    }

    /// Makes a request described by `metadata`.
    ///
    /// The verb methods all end up here; use it directly for anything they do not cover.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use alma_api::{metadata::RequestMetadata, Client, Format};
    /// use http::Method;
    ///
    /// # async fn example() -> Result<(), alma_api::Error> {
    /// let client = Client::configure(|config| config.api_key("my-key"))?;
    ///
    /// let metadata = RequestMetadata::new(Method::GET, "/bibs/991234")
    ///     .with_format(Format::Xml);
    /// let response = client.call(metadata).await?;
    ///
    /// let title = response.xml().and_then(|doc| doc.text("title"));
    /// println!("Title: {:?}", title);
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::Gateway`], [`Error::Logical`] or [`Error::Server`] when Alma
    /// reports a failure it can attribute, and [`Error::Generic`] for everything
    /// else, including network failures and unparseable bodies.
    pub async fn call(&self, metadata: RequestMetadata) -> Result<Response> {
        let start_time = Instant::now();
        let method = metadata.method.clone();
        let path = metadata.path.clone();

        let response = self.send(metadata).await?;

        let status = response.status();
        let headers = response.headers().clone();
        let remaining_api_calls = self.inner.quota.observe(&headers);

        let raw_body = response.text().await.map_err(|e| {
            tracing::warn!(error = %e, method = %method, path = %path, "Failed to read response body");
            Error::unexpected(e)
        })?;
        let latency = start_time.elapsed();

        tracing::info!(
            status = status.as_u16(),
            latency_ms = latency.as_millis(),
            remaining_api_calls = ?remaining_api_calls,
            "Received Alma response"
        );

        if status.is_client_error() || status.is_server_error() {
            let error = classify(status, &raw_body);
            if status.is_client_error() {
                tracing::error!(
                    status = status.as_u16(),
                    kind = ?error.kind(),
                    code = %error.code(),
                    method = %method,
                    path = %path,
                    "Alma rejected request (4xx)"
                );
            } else {
                tracing::warn!(
                    status = status.as_u16(),
                    kind = ?error.kind(),
                    code = %error.code(),
                    method = %method,
                    path = %path,
                    "Alma server error (5xx)"
                );
            }
            return Err(error);
        }

        let data = parse_body(&raw_body).inspect_err(|e| {
            tracing::error!(error = %e, raw_response = %raw_body, "Failed to parse response body");
        })?;

        Ok(Response::new(
            data,
            raw_body,
            status,
            headers,
            latency,
            remaining_api_calls,
        ))
    }

    /// Asks Alma how many API calls are left for today.
    ///
    /// This is a real request against [`QUOTA_CHECK_PATH`] and counts against the
    /// quota itself. Returns `-1` if the request fails or the response does not
    /// carry the `x-exl-api-remaining` header.
    pub async fn remaining_api_calls(&self) -> i64 {
        let metadata = RequestMetadata::new(Method::GET, QUOTA_CHECK_PATH);

        match self.send(metadata).await {
            Ok(response) if response.status().is_success() => self
                .inner
                .quota
                .observe(response.headers())
                .unwrap_or(UNKNOWN_REMAINING),
            Ok(response) => {
                tracing::debug!(
                    status = response.status().as_u16(),
                    "Quota check was rejected"
                );
                UNKNOWN_REMAINING
            }
            Err(e) => {
                tracing::debug!(error = %e, "Quota check failed");
                UNKNOWN_REMAINING
            }
        }
    }

    /// The remaining-calls value from the most recent response that carried one,
    /// or `-1` if none has been seen yet.
    ///
    /// Unlike [`remaining_api_calls`](Client::remaining_api_calls) this makes no
    /// request.
    pub fn last_remaining_api_calls(&self) -> i64 {
        self.inner.quota.last_seen()
    }

    /// Builds and sends a single request.
    async fn send(&self, metadata: RequestMetadata) -> Result<reqwest::Response> {
        let request = self.build_request(metadata)?;

        request.send().await.map_err(|e| {
            tracing::warn!(error = %e, timeout = e.is_timeout(), "Request to Alma failed");
            Error::unexpected(e)
        })
    }

    /// Applies the configuration to `metadata` and produces a ready-to-send request.
    fn build_request(&self, mut metadata: RequestMetadata) -> Result<reqwest::RequestBuilder> {
        let config = &self.inner.configuration;
        let format = metadata.format.unwrap_or(config.default_format());
        let user_password = metadata.take_user_password();

        let url = self.request_url(&metadata)?;

        tracing::debug!(
            method = %metadata.method,
            url = %url,
            format = %format,
            "Executing Alma request"
        );

        let mime_type = HeaderValue::from_static(format.mime_type());
        let authorization = HeaderValue::try_from(format!(
            "apikey {}",
            config.api_key().unwrap_or_default()
        ))
        .map_err(Error::unexpected)?;

        let mut request = self
            .inner
            .http_client
            .request(metadata.method, url)
            .header(AUTHORIZATION, authorization)
            .header(ACCEPT, mime_type.clone())
            .header(CONTENT_TYPE, mime_type);

        if let Some(password) = user_password {
            let mut value = HeaderValue::try_from(password).map_err(Error::unexpected)?;
            value.set_sensitive(true);
            request = request.header(USER_PASSWORD_HEADER, value);
        }

        if let Some(timeout) = config.timeout() {
            request = request.timeout(timeout);
        }

        if let Some(body) = metadata.body {
            request = request.body(body);
        }

        Ok(request)
    }

    /// Joins the base URL and path and appends the query string.
    ///
    /// The language parameter is only sent for non-English languages, and an
    /// explicit `lang` in the request parameters takes precedence.
    fn request_url(&self, metadata: &RequestMetadata) -> Result<Url> {
        let config = &self.inner.configuration;

        let path = metadata.path.trim_start_matches('/');
        let mut url =
            Url::parse(&format!("{}/{}", config.base_url(), path)).map_err(Error::unexpected)?;

        let mut params: Vec<(&str, &str)> = metadata
            .query_params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        let language = config.language();
        let caller_set_language = params.iter().any(|(k, _)| *k == LANGUAGE_PARAM);
        if !language.is_empty() && language != "en" && !caller_set_language {
            params.push((LANGUAGE_PARAM, language));
        }

        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }

        Ok(url)
    }
}

fn verb_metadata(
    method: Method,
    path: &str,
    params: &[(&str, &str)],
    body: Option<&str>,
    format: Option<Format>,
) -> RequestMetadata {
    let mut metadata =
        RequestMetadata::new(method, path).with_query_params(params.iter().copied());
    metadata.body = body.map(str::to_string);
    metadata.format = format;
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn client(builder: ConfigurationBuilder) -> Client {
        Client::new(builder.build().unwrap()).unwrap()
    }

    fn build(client: &Client, metadata: RequestMetadata) -> reqwest::Request {
        client.build_request(metadata).unwrap().build().unwrap()
    }

    #[test]
    fn test_headers_follow_configuration() {
        let client = client(Configuration::builder().api_key("1234"));
        let request = build(&client, RequestMetadata::new(Method::GET, "/users/jdoe"));

        assert_eq!(
            request.url().as_str(),
            "https://api-eu.hosted.exlibrisgroup.com/almaws/v1/users/jdoe"
        );
        assert_eq!(request.headers()[AUTHORIZATION], "apikey 1234");
        assert_eq!(request.headers()[ACCEPT], "application/json");
        assert_eq!(request.headers()[CONTENT_TYPE], "application/json");
        assert!(request.headers().get(USER_PASSWORD_HEADER).is_none());
    }

    #[test]
    fn test_per_request_format_overrides_default() {
        let client = client(Configuration::builder().default_format("json"));
        let request = build(
            &client,
            RequestMetadata::new(Method::GET, "/bibs/1").with_format(Format::Xml),
        );

        assert_eq!(request.headers()[ACCEPT], "application/xml");
        assert_eq!(request.headers()[CONTENT_TYPE], "application/xml");
    }

    #[test]
    fn test_verb_metadata_carries_format_and_body() {
        let metadata = verb_metadata(
            Method::POST,
            "/users/jdoe",
            &[("op", "auth")],
            Some("<user/>"),
            Some(Format::Xml),
        );
        assert_eq!(metadata.format, Some(Format::Xml));
        assert_eq!(metadata.body.as_deref(), Some("<user/>"));

        let client = client(Configuration::builder());
        let request = build(&client, metadata);
        assert_eq!(request.headers()[ACCEPT], "application/xml");
        assert_eq!(request.url().query(), Some("op=auth"));

        let metadata = verb_metadata(Method::GET, "/users", &[], None, None);
        assert_eq!(metadata.format, None);
        assert!(metadata.body.is_none());
    }

    #[test]
    fn test_language_param() {
        let english = client(Configuration::builder());
        let request = build(&english, RequestMetadata::new(Method::GET, "/users"));
        assert_eq!(request.url().query(), None);

        let german = client(Configuration::builder().language("de"));
        let request = build(
            &german,
            RequestMetadata::new(Method::GET, "/users").with_query_param("limit", "10"),
        );
        assert_eq!(request.url().query(), Some("limit=10&lang=de"));

        let request = build(
            &german,
            RequestMetadata::new(Method::GET, "/users").with_query_param("lang", "fr"),
        );
        assert_eq!(request.url().query(), Some("lang=fr"));
    }

    #[test]
    fn test_password_moves_to_header() {
        let client = client(Configuration::builder());
        let request = build(
            &client,
            RequestMetadata::new(Method::POST, "/users/jdoe")
                .with_query_params([("op", "auth"), ("password", "s3cret")]),
        );

        assert_eq!(request.url().query(), Some("op=auth"));
        assert_eq!(request.headers()[USER_PASSWORD_HEADER], "s3cret");
    }

    #[test]
    fn test_timeout_and_body_applied() {
        let client = client(Configuration::builder().timeout(Duration::from_secs(3)));
        let request = build(
            &client,
            RequestMetadata::new(Method::PUT, "users/jdoe").with_body("<user/>"),
        );

        assert_eq!(request.timeout(), Some(&Duration::from_secs(3)));
        assert_eq!(
            request.body().and_then(|b| b.as_bytes()),
            Some("<user/>".as_bytes())
        );
        assert!(request.url().path().ends_with("/almaws/v1/users/jdoe"));
    }

    #[test]
    fn test_missing_api_key_still_sends_scheme() {
        let client = client(Configuration::builder());
        let request = build(&client, RequestMetadata::new(Method::GET, "/conf/test"));
        assert_eq!(request.headers()[AUTHORIZATION], "apikey ");
    }
}
