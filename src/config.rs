//! Client configuration.
//!
//! A [`Configuration`] is built once through [`ConfigurationBuilder`], which
//! normalizes every field up front, and stays immutable afterwards.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Language Alma answers in when none is configured.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Representation used for request and response bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// `application/json`
    #[default]
    Json,
    /// `application/xml`
    Xml,
}

impl Format {
    /// The MIME type sent in the `Accept` and `Content-Type` headers.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Format::Json => "application/json",
            Format::Xml => "application/xml",
        }
    }

    /// The lowercase name of the format.
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Xml => "xml",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(Format::Json),
            "xml" => Ok(Format::Xml),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Validates a user supplied format name.
///
/// `"json"` and `"xml"` are accepted case-sensitively. `None` and the empty
/// string mean "no preference" and yield `Ok(None)`.
///
/// # Examples
///
/// ```
/// use alma_api::{validate_format, Format};
///
/// assert_eq!(validate_format(Some("xml")).unwrap(), Some(Format::Xml));
/// assert_eq!(validate_format(None).unwrap(), None);
/// assert!(validate_format(Some("JSON")).is_err());
/// ```
pub fn validate_format(format: Option<&str>) -> Result<Option<Format>> {
    match format {
        None | Some("") => Ok(None),
        Some(name) => name.parse().map(Some),
    }
}

/// The regional Alma API gateways.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gateway {
    /// North America
    Na,
    /// Europe
    #[default]
    Eu,
    /// Asia-Pacific
    Ap,
    /// Canada
    Ca,
    /// China
    Cn,
}

/// Gateway keys and base URLs, indexed by `Gateway as usize`.
const GATEWAYS: [(&str, &str); 5] = [
    ("na", "https://api-na.hosted.exlibrisgroup.com/almaws/v1"),
    ("eu", "https://api-eu.hosted.exlibrisgroup.com/almaws/v1"),
    ("ap", "https://api-ap.hosted.exlibrisgroup.com/almaws/v1"),
    ("ca", "https://api-ca.hosted.exlibrisgroup.com/almaws/v1"),
    ("cn", "https://api-cn.hosted.exlibrisgroup.cn/almaws/v1"),
];

impl Gateway {
    /// All gateways, in table order.
    pub const ALL: [Gateway; 5] = [
        Gateway::Na,
        Gateway::Eu,
        Gateway::Ap,
        Gateway::Ca,
        Gateway::Cn,
    ];

    /// The base URL of this gateway.
    pub fn url(&self) -> &'static str {
        GATEWAYS[*self as usize].1
    }

    /// The short key of this gateway (`"na"`, `"eu"`, ...).
    pub fn key(&self) -> &'static str {
        GATEWAYS[*self as usize].0
    }
}

impl FromStr for Gateway {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Gateway::ALL
            .into_iter()
            .find(|gateway| gateway.key() == s)
            .ok_or_else(|| Error::Configuration(format!("Invalid gateway: {}", s)))
    }
}

/// Where requests are sent: a named gateway or a literal URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseUrl {
    /// One of the regional gateways.
    Gateway(Gateway),
    /// Any other URL, e.g. a proxy or a test server.
    Url(String),
}

impl From<Gateway> for BaseUrl {
    fn from(gateway: Gateway) -> Self {
        BaseUrl::Gateway(gateway)
    }
}

impl From<&str> for BaseUrl {
    fn from(url: &str) -> Self {
        BaseUrl::Url(url.to_string())
    }
}

impl From<String> for BaseUrl {
    fn from(url: String) -> Self {
        BaseUrl::Url(url)
    }
}

/// Validated connection parameters for a [`Client`](crate::Client).
///
/// # Examples
///
/// ```
/// use alma_api::{Configuration, Format, Gateway};
/// use std::time::Duration;
///
/// let config = Configuration::builder()
///     .api_key("l8xx0123456789")
///     .base_url(Gateway::Na)
///     .default_format("xml")
///     .language("de")
///     .timeout(Duration::from_secs(10))
///     .build()
///     .unwrap();
///
/// assert_eq!(config.base_url(), "https://api-na.hosted.exlibrisgroup.com/almaws/v1");
/// assert_eq!(config.default_format(), Format::Xml);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    api_key: Option<String>,
    base_url: String,
    default_format: Format,
    language: String,
    timeout: Option<Duration>,
}

impl Configuration {
    /// Creates a new builder with nothing set.
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::default()
    }

    /// Builds a configuration from `ALMA_*` environment variables.
    ///
    /// Reads `ALMA_API_KEY`, `ALMA_BASE_URL` (a gateway key such as `na` or a URL),
    /// `ALMA_FORMAT`, `ALMA_LANGUAGE` and `ALMA_TIMEOUT_SECS`. Unset variables fall
    /// back to the usual defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable holds an invalid value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Configuration::builder();

        if let Some(key) = lookup("ALMA_API_KEY") {
            builder = builder.api_key(key);
        }
        if let Some(base_url) = lookup("ALMA_BASE_URL") {
            builder = match base_url.parse::<Gateway>() {
                Ok(gateway) => builder.base_url(gateway),
                Err(_) => builder.base_url(base_url),
            };
        }
        if let Some(format) = lookup("ALMA_FORMAT") {
            builder = builder.default_format(format);
        }
        if let Some(language) = lookup("ALMA_LANGUAGE") {
            builder = builder.language(language);
        }
        if let Some(secs) = lookup("ALMA_TIMEOUT_SECS").filter(|s| !s.trim().is_empty()) {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                Error::Configuration(format!("Invalid ALMA_TIMEOUT_SECS: {}", secs))
            })?;
            builder = builder.timeout(Duration::from_secs(secs));
        }

        builder.build()
    }

    /// The API key, if one was configured.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// The base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The format used when a request does not ask for one.
    pub fn default_format(&self) -> Format {
        self.default_format
    }

    /// The language Alma should answer in.
    pub fn language(&self) -> &str {
        &self.language
    }

    /// The per-request timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: Gateway::default().url().to_string(),
            default_format: Format::default(),
            language: DEFAULT_LANGUAGE.to_string(),
            timeout: None,
        }
    }
}

/// Builder for [`Configuration`].
///
/// Setters only record their input; normalization and validation happen in
/// [`build`](ConfigurationBuilder::build).
#[derive(Debug, Clone, Default)]
pub struct ConfigurationBuilder {
    api_key: Option<String>,
    base_url: Option<BaseUrl>,
    default_format: Option<String>,
    language: Option<String>,
    timeout: Option<Duration>,
}

impl ConfigurationBuilder {
    /// Sets the API key. An empty key is treated as no key.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the base URL from a [`Gateway`] or a literal URL.
    pub fn base_url(mut self, base_url: impl Into<BaseUrl>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the default format by name (`"json"` or `"xml"`).
    pub fn default_format(mut self, format: impl Into<String>) -> Self {
        self.default_format = Some(format.into());
        self
    }

    /// Sets the language. An empty value means English.
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Sets the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Validates the collected values and builds the [`Configuration`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFormat`] for a format other than `json`/`xml`
    /// and [`Error::InvalidUrl`] for a literal base URL that is not absolute.
    pub fn build(self) -> Result<Configuration> {
        let api_key = self.api_key.filter(|key| !key.is_empty());

        let base_url = match self.base_url {
            Some(BaseUrl::Gateway(gateway)) => gateway.url().to_string(),
            Some(BaseUrl::Url(url)) if !url.trim().is_empty() => normalize_url(&url)?,
            _ => Gateway::default().url().to_string(),
        };

        let default_format = validate_format(self.default_format.as_deref())?.unwrap_or_default();

        let language = self
            .language
            .filter(|language| !language.is_empty())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

        Ok(Configuration {
            api_key,
            base_url,
            default_format,
            language,
            timeout: self.timeout,
        })
    }
}

fn normalize_url(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    Url::parse(trimmed)?;
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Configuration::builder().build().unwrap();

        assert_eq!(config, Configuration::default());
        assert_eq!(config.api_key(), None);
        assert_eq!(
            config.base_url(),
            "https://api-eu.hosted.exlibrisgroup.com/almaws/v1"
        );
        assert_eq!(config.default_format(), Format::Json);
        assert_eq!(config.language(), "en");
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_custom_values() {
        let config = Configuration::builder()
            .api_key("1234")
            .base_url("https://api-eu.hosted.exlibrisgroup.com/foo")
            .default_format("xml")
            .language("de")
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();

        assert_eq!(config.api_key(), Some("1234"));
        assert_eq!(
            config.base_url(),
            "https://api-eu.hosted.exlibrisgroup.com/foo"
        );
        assert_eq!(config.default_format(), Format::Xml);
        assert_eq!(config.language(), "de");
        assert_eq!(config.timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_empty_api_key_is_absent() {
        let config = Configuration::builder().api_key("").build().unwrap();
        assert_eq!(config.api_key(), None);
    }

    #[test]
    fn test_base_url_normalization() {
        let build = |url: &str| Configuration::builder().base_url(url).build().unwrap();

        assert_eq!(
            build("https://api-eu.hosted.exlibrisgroup.com/foo/").base_url(),
            "https://api-eu.hosted.exlibrisgroup.com/foo"
        );
        assert_eq!(
            build("").base_url(),
            "https://api-eu.hosted.exlibrisgroup.com/almaws/v1"
        );
        assert!(Configuration::builder()
            .base_url("BASE_URL")
            .build()
            .is_err());
    }

    #[test]
    fn test_gateway_lookup() {
        for gateway in Gateway::ALL {
            let parsed: Gateway = gateway.key().parse().unwrap();
            assert_eq!(parsed, gateway);

            let config = Configuration::builder().base_url(gateway).build().unwrap();
            assert_eq!(config.base_url(), gateway.url());
            assert!(!config.base_url().ends_with('/'));
        }

        assert_eq!(
            Gateway::Cn.url(),
            "https://api-cn.hosted.exlibrisgroup.cn/almaws/v1"
        );
    }

    #[test]
    fn test_unknown_gateway_key() {
        let err = "xx".parse::<Gateway>().unwrap_err();
        assert!(matches!(err, Error::Configuration(ref msg) if msg == "Invalid gateway: xx"));
    }

    #[test]
    fn test_validate_format() {
        assert_eq!(validate_format(Some("json")).unwrap(), Some(Format::Json));
        assert_eq!(validate_format(Some("xml")).unwrap(), Some(Format::Xml));
        assert_eq!(validate_format(None).unwrap(), None);
        assert_eq!(validate_format(Some("")).unwrap(), None);

        assert!(matches!(
            validate_format(Some("unsupported")),
            Err(Error::UnsupportedFormat(_))
        ));
        assert!(validate_format(Some("XML")).is_err());
    }

    #[test]
    fn test_default_format_setter() {
        let format = |value: &str| {
            Configuration::builder()
                .default_format(value)
                .build()
                .map(|c| c.default_format())
        };

        assert_eq!(format("xml").unwrap(), Format::Xml);
        assert_eq!(format("json").unwrap(), Format::Json);
        assert_eq!(format("").unwrap(), Format::Json);
        assert!(matches!(
            format("unsupported"),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_empty_language_is_english() {
        let config = Configuration::builder().language("").build().unwrap();
        assert_eq!(config.language(), "en");
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("ALMA_API_KEY", "secret"),
            ("ALMA_BASE_URL", "ap"),
            ("ALMA_FORMAT", "xml"),
            ("ALMA_LANGUAGE", "fr"),
            ("ALMA_TIMEOUT_SECS", "30"),
        ]
        .into_iter()
        .collect();

        let config =
            Configuration::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap();

        assert_eq!(config.api_key(), Some("secret"));
        assert_eq!(config.base_url(), Gateway::Ap.url());
        assert_eq!(config.default_format(), Format::Xml);
        assert_eq!(config.language(), "fr");
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_from_lookup_with_literal_url_and_bad_timeout() {
        let config = Configuration::from_lookup(|name| match name {
            "ALMA_BASE_URL" => Some("http://localhost:8080/almaws/v1/".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.base_url(), "http://localhost:8080/almaws/v1");

        let err = Configuration::from_lookup(|name| match name {
            "ALMA_TIMEOUT_SECS" => Some("soon".to_string()),
            _ => None,
        })
        .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_format_and_gateway_in_config_files() {
        assert_eq!(serde_json::to_string(&Format::Xml).unwrap(), "\"xml\"");
        assert_eq!(serde_json::from_str::<Format>("\"json\"").unwrap(), Format::Json);
        assert!(serde_json::from_str::<Format>("\"yaml\"").is_err());

        assert_eq!(serde_json::to_string(&Gateway::Ap).unwrap(), "\"ap\"");
        let gateways: Vec<Gateway> = serde_json::from_str(r#"["na","eu","ap","ca","cn"]"#).unwrap();
        assert_eq!(gateways, Gateway::ALL);
    }
}
