//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building an HTTP client that negotiates JSON:API documents
//! - Resolving API-relative paths against the configured base URL
//! - Decoding response bodies as JSON
//! - Error classification
//!
//! There is no retry logic: a failed fetch is terminal for its path.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Media type of JSON:API documents
pub const JSONAPI_MEDIA_TYPE: &str = "application/vnd.api+json";

/// Why a fetch failed
///
/// Variants carry the requested URL and a rendered message rather than the
/// underlying `reqwest::Error`, so failures can be cloned into the registry
/// and into every `crawl-error` event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{url} timed out")]
    Timeout { url: String },

    #[error("could not connect to {url}: {message}")]
    Connect { url: String, message: String },

    #[error("{url} did not return a JSON document: {message}")]
    Decode { url: String, message: String },

    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },
}

impl FetchError {
    /// The URL whose fetch failed
    pub fn url(&self) -> &str {
        match self {
            Self::Status { url, .. }
            | Self::Timeout { url }
            | Self::Connect { url, .. }
            | Self::Decode { url, .. }
            | Self::Request { url, .. } => url,
        }
    }

    /// HTTP status code, for status failures
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        let url = url.to_string();
        if err.is_timeout() {
            Self::Timeout { url }
        } else if err.is_connect() {
            Self::Connect {
                url,
                message: err.to_string(),
            }
        } else if err.is_decode() {
            Self::Decode {
                url,
                message: err.to_string(),
            }
        } else {
            Self::Request {
                url,
                message: err.to_string(),
            }
        }
    }
}

/// Builds an HTTP client for JSON:API requests
///
/// # Arguments
///
/// * `timeout_secs` - Whole-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(timeout_secs: u64) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(JSONAPI_MEDIA_TYPE));

    Client::builder()
        .user_agent(concat!("jsonapi-spider/", env!("CARGO_PKG_VERSION")))
        .default_headers(headers)
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Client bound to one API base URL
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    api_prefix: String,
}

impl ApiClient {
    /// Creates a client for `base_url`
    ///
    /// # Returns
    ///
    /// * `Ok(ApiClient)` - Client ready to fetch relative paths
    /// * `Err(crate::SpiderError)` - The base URL is invalid or the client could not be built
    pub fn new(base_url: &str, timeout_secs: u64) -> crate::Result<Self> {
        let parsed = Url::parse(base_url)?;
        let api_prefix = parsed.path().trim_end_matches('/').to_string();

        Ok(Self {
            client: build_http_client(timeout_secs)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_prefix,
        })
    }

    /// Path component of the base URL, e.g. `/jsonapi` (empty at the root)
    pub fn api_prefix(&self) -> &str {
        &self.api_prefix
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API-relative path
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Fetches `path` and decodes the body as JSON
    ///
    /// # Returns
    ///
    /// * `Ok(Value)` - The decoded document
    /// * `Err(FetchError)` - Transport failure, non-2xx status or undecodable body
    pub async fn fetch(&self, path: &str) -> Result<Value, FetchError> {
        let url = self.url_for(path);
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(&url, e))?;

        serde_json::from_slice(&body).map_err(|e| FetchError::Decode {
            url,
            message: e.to_string(),
        })
    }
}
