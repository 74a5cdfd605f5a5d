use thiserror::Error;

/// Top-level error type for the `bugswarm-api` crate.
///
/// Covers every failure mode across both API surfaces: the REST
/// configuration API and the participation stream. `bugswarm-core`
/// maps these into the connector's error taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The server rejected the API key (HTTP 401).
    #[error("Invalid API key")]
    InvalidApiKey,

    /// An API key could not be turned into a header value.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS or client builder error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── REST API ────────────────────────────────────────────────────
    /// The requested entity does not exist (HTTP 404).
    #[error("Not found: {path}")]
    NotFound { path: String },

    /// Any other non-success HTTP status.
    #[error("API error (HTTP {status}): {message}")]
    Http { status: u16, message: String },

    /// An invitation was already answered; responses are one-shot.
    #[error("Invitation {id} is already {status}")]
    InvitationClosed { id: String, status: String },

    // ── Participation stream ────────────────────────────────────────
    /// Stream connection failed.
    #[error("Participation stream connection failed: {0}")]
    StreamConnect(String),

    /// Stream closed unexpectedly.
    #[error("Participation stream closed (code {code}): {reason}")]
    StreamClosed { code: u16, reason: String },

    /// Tried to send on a stream that is not connected.
    #[error("Participation stream is not connected")]
    NotConnected,

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Http { status: 404, .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::StreamConnect(_) | Self::StreamClosed { .. } | Self::NotConnected => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_recognised_from_status() {
        let err = Error::Http {
            status: 404,
            message: "gone".into(),
        };
        assert!(err.is_not_found());
        assert!(Error::NotFound { path: "/swarms".into() }.is_not_found());
        assert!(!Error::InvalidApiKey.is_not_found());
    }

    #[test]
    fn server_errors_are_transient() {
        let err = Error::Http {
            status: 503,
            message: "unavailable".into(),
        };
        assert!(err.is_transient());
        assert!(
            !Error::Http {
                status: 400,
                message: "bad".into()
            }
            .is_transient()
        );
    }
}
