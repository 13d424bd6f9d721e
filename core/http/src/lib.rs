//! HTTP client utilities for OAuth requests
#![warn(missing_docs)]

use std::time::Duration;

pub use core_types::{Error, Result};

/// Default timeout for OAuth HTTP requests (30 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default user agent sent with every request
pub const DEFAULT_USER_AGENT: &str = concat!("twitter-oauth/", env!("CARGO_PKG_VERSION"));

/// HTTP client wrapper
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    /// Create a new HTTP client with sensible defaults for OAuth operations
    ///
    /// Falls back to a plain `reqwest::Client` if the configured builder
    /// cannot be constructed.
    pub fn new() -> Self {
        HttpClientBuilder::default().build().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "Falling back to default HTTP client");
            Self::from_client(reqwest::Client::new())
        })
    }

    /// Start building a client with custom settings
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Wrap an existing reqwest client
    pub fn from_client(inner: reqwest::Client) -> Self {
        Self { inner }
    }

    /// Get the inner reqwest client
    pub fn inner(&self) -> &reqwest::Client {
        &self.inner
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`HttpClient`]
#[derive(Debug, Clone)]
pub struct HttpClientBuilder {
    timeout: Duration,
    user_agent: String,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl HttpClientBuilder {
    /// Set the per-request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Build the client
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the TLS backend or other client settings
    /// fail to initialise.
    pub fn build(self) -> Result<HttpClient> {
        let inner = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(HttpClient::from_client(inner))
    }
}
