// Shared transport configuration for building reqwest::Client instances.
//
// The REST client and the upload path share scheme, timeout, and header
// settings through this module.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

/// Header carrying a BUGswarm API key on every request.
pub const API_KEY_HEADER: &str = "x-bugswarmapikey";

const USER_AGENT: &str = concat!("bugswarm-connector/", env!("CARGO_PKG_VERSION"));

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Use `https`/`wss` instead of `http`/`ws`.
    pub secure: bool,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            secure: true,
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// URL scheme for REST calls.
    pub fn http_scheme(&self) -> &'static str {
        if self.secure { "https" } else { "http" }
    }

    /// URL scheme for the participation stream.
    pub fn ws_scheme(&self) -> &'static str {
        if self.secure { "wss" } else { "ws" }
    }

    /// Build a `reqwest::Client` that sends `api_key` on every request.
    pub fn build_client(&self, api_key: &SecretString) -> Result<reqwest::Client, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, api_key_header(api_key)?);

        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }

    /// Build a `reqwest::Client` without an API key (used for key management,
    /// which authenticates with username and password instead).
    pub fn build_anonymous_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }
}

/// Turn an API key into a sensitive header value.
pub(crate) fn api_key_header(api_key: &SecretString) -> Result<HeaderValue, Error> {
    let mut value =
        HeaderValue::from_str(api_key.expose_secret()).map_err(|e| Error::Authentication {
            message: format!("invalid API key header value: {e}"),
        })?;
    value.set_sensitive(true);
    Ok(value)
}
