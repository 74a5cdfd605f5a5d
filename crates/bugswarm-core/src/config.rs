// ── Runtime connector configuration ──
//
// Describes *where* the connector talks to and *as whom*. Carries
// credentials but never touches disk: the CLI builds a `ConnectorConfig`
// from a profile and hands it in.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::error::CoreError;

/// Everything a [`Connector`](crate::Connector) needs to run one device.
///
/// Immutable after construction.
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    /// Server host name (e.g. `api.bugswarm.net`).
    pub hostname: String,
    /// Port of the REST configuration API.
    pub http_port: u16,
    /// Port of the participation stream.
    pub messaging_port: u16,
    /// API key for the REST configuration API.
    pub configuration_key: SecretString,
    /// API key for the participation stream.
    pub participation_key: SecretString,
    /// Account that owns the device.
    pub username: String,
    /// Stable local identity, used as the name of a newly created resource.
    pub device_name: String,
    /// Server-assigned resource id, if one was stored by a previous run.
    pub resource_id: Option<String>,
    /// Master switch; a disabled configuration is never valid.
    pub enabled: bool,
    /// Use `https`/`wss`.
    pub secure: bool,
    /// Request timeout for REST calls.
    pub timeout: Duration,
}

impl ConnectorConfig {
    /// Whether this configuration can drive a connector.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Check required fields, naming the first one that is missing.
    pub fn validate(&self) -> Result<(), CoreError> {
        let missing = if !self.enabled {
            Some("enabled")
        } else if self.username.trim().is_empty() {
            Some("username")
        } else if self.configuration_key.expose_secret().is_empty() {
            Some("configuration_key")
        } else if self.participation_key.expose_secret().is_empty() {
            Some("participation_key")
        } else {
            None
        };

        match missing {
            Some("enabled") => Err(CoreError::Config {
                message: "connector is disabled".into(),
            }),
            Some(field) => Err(CoreError::Config {
                message: format!("missing required field: {field}"),
            }),
            None => Ok(()),
        }
    }
}
