//! # alma-api - a client for the Ex Libris Alma REST API
//!
//! `alma-api` sends authenticated requests to Alma, negotiates JSON or XML, and
//! turns Alma's error envelopes into a small set of typed errors.
//!
//! ## Quick Start
//!
//! ```no_run
//! use alma_api::{Client, Gateway};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), alma_api::Error> {
//!     let client = Client::configure(|config| {
//!         config
//!             .api_key("l8xx0123456789")
//!             .base_url(Gateway::Eu)
//!             .timeout(Duration::from_secs(30))
//!     })?;
//!
//!     let user = client.get("/users/jdoe", &[("view", "full")]).await?;
//!     if let Some(json) = user.json() {
//!         println!("Name: {}", json["full_name"]);
//!     }
//!
//!     println!("Calls left today: {}", client.remaining_api_calls().await);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Regional gateways** - pick `na`, `eu`, `ap`, `ca` or `cn`, or pass any URL
//! - **JSON or XML** - a default per client, overridable per request
//! - **Content sniffing** - bodies are decoded by what they look like, not by headers
//! - **Typed errors** - gateway, logical (4xx) and server (5xx) errors with Alma's code and message
//! - **Quota tracking** - the `x-exl-api-remaining` header is recorded on every response
//! - **Structured logging** with `tracing`
//!
//! ## Error Handling
//!
//! ```no_run
//! use alma_api::{Client, Error, ErrorKind};
//!
//! # async fn example() -> Result<(), Error> {
//! # let client = Client::configure(|config| config.api_key("my-key"))?;
//! match client.get("/items", &[("item_barcode", "39001")]).await {
//!     Ok(response) => println!("Item: {:?}", response.data),
//!     Err(e) if e.kind() == ErrorKind::Gateway => eprintln!("Gateway said no: {}", e.code()),
//!     Err(Error::Logical { message, .. }) => eprintln!("Not possible: {}", message),
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! # Ok(())
//! # }
//! ```

pub mod body;
pub mod classify;
mod client;
mod config;
pub mod error;
pub mod metadata;
pub mod quota;
mod response;

pub use body::{Body, XmlDocument};
pub use client::{Client, QUOTA_CHECK_PATH};
pub use config::{
    validate_format, BaseUrl, Configuration, ConfigurationBuilder, Format, Gateway,
    DEFAULT_LANGUAGE,
};
pub use error::{Error, ErrorKind, Result};
pub use response::Response;
