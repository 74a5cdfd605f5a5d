// ── Core error types ──
//
// Errors surfaced by the connector. Consumers never see raw HTTP status
// codes or stanza parse failures; the `From<bugswarm_api::Error>` impl
// folds transport-layer errors into the connector's taxonomy.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to messaging server: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Messaging client disconnected")]
    Disconnected,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Not found: {identifier}")]
    NotFound { identifier: String },

    /// The stored device resource was deleted server-side. The stored id
    /// has been cleared so the next start creates a fresh resource.
    #[error("Device resource {resource_id} no longer exists on the server")]
    ResourceGone { resource_id: String },

    #[error("Invalid request payload: {message}")]
    Parse { message: String },

    // ── I/O errors ───────────────────────────────────────────────────
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("Connector is already running")]
    AlreadyRunning,

    #[error("Connector has been shut down")]
    ShutDown,
}

impl CoreError {
    /// Returns `true` for "no such entity" failures, which the connector
    /// treats as empty results rather than errors.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<bugswarm_api::Error> for CoreError {
    fn from(err: bugswarm_api::Error) -> Self {
        use bugswarm_api::Error as Api;

        match err {
            Api::NotFound { path } => CoreError::NotFound { identifier: path },
            Api::InvalidApiKey => CoreError::Api {
                message: "Invalid API key".into(),
                status: Some(401),
            },
            Api::Authentication { message } => CoreError::Config { message },
            Api::Transport(ref e) if e.is_connect() || e.is_timeout() => {
                CoreError::ConnectionFailed {
                    reason: e.to_string(),
                }
            }
            Api::Transport(e) => CoreError::Api {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            },
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::Tls(message) => CoreError::Config { message },
            Api::Http { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            e @ Api::InvitationClosed { .. } => CoreError::Api {
                message: e.to_string(),
                status: None,
            },
            Api::StreamConnect(reason) => CoreError::ConnectionFailed { reason },
            Api::StreamClosed { code, reason } => CoreError::ConnectionFailed {
                reason: format!("stream closed (code {code}): {reason}"),
            },
            Api::NotConnected => CoreError::Disconnected,
            Api::Deserialization { message, body: _ } => CoreError::Parse { message },
        }
    }
}
