//! CLI error types with miette diagnostics.
//!
//! Maps core, API, and config errors into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use bugswarm_config::ConfigError;
use bugswarm_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to {host}")]
    #[diagnostic(
        code(bugswarm::connection_failed),
        help(
            "Check the hostname and ports in your profile.\n\
             Try: bugswarm config show"
        )
    )]
    ConnectionFailed { host: String, reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("The server rejected the API key")]
    #[diagnostic(
        code(bugswarm::auth_failed),
        help("Re-run: bugswarm config init --profile {profile}")
    )]
    AuthFailed { profile: String },

    #[error("No {key} configured for profile '{profile}'")]
    #[diagnostic(
        code(bugswarm::no_credentials),
        help(
            "Configure keys with: bugswarm config init\n\
             Or point configuration_key_env / participation_key_env at an environment variable."
        )
    )]
    NoCredentials { profile: String, key: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(bugswarm::not_found),
        help("Run: bugswarm {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Invitation {id} is already {status}")]
    #[diagnostic(code(bugswarm::invitation_closed))]
    InvitationClosed { id: String, status: String },

    #[error("This device has no resource id yet")]
    #[diagnostic(
        code(bugswarm::no_resource),
        help("Run `bugswarm run` once to register the device, or set resource_id in the profile.")
    )]
    NoResource,

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error: {message}")]
    #[diagnostic(code(bugswarm::api_error))]
    ApiError { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(bugswarm::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(bugswarm::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: bugswarm config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Connector configuration is invalid: {message}")]
    #[diagnostic(code(bugswarm::config))]
    Config { message: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(bugswarm::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } | Self::NoResource => {
                exit_code::NOT_FOUND
            }
            Self::InvitationClosed { .. } => exit_code::CONFLICT,
            Self::Validation { .. } | Self::Config { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── Source error mapping ─────────────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { reason } => CliError::ConnectionFailed {
                host: "messaging server".into(),
                reason,
            },
            CoreError::Disconnected => CliError::ConnectionFailed {
                host: "messaging server".into(),
                reason: "connection was lost".into(),
            },
            CoreError::Config { message } => CliError::Config { message },
            CoreError::NotFound { identifier } => CliError::NotFound {
                resource_type: "entity".into(),
                identifier,
                list_command: "resources list".into(),
            },
            CoreError::ResourceGone { resource_id } => CliError::NotFound {
                resource_type: "resource".into(),
                identifier: resource_id,
                list_command: "resources list".into(),
            },
            CoreError::Io(e) => CliError::Io(e),
            CoreError::Api {
                status: Some(401), ..
            } => CliError::AuthFailed {
                profile: "current".into(),
            },
            other => CliError::ApiError {
                message: other.to_string(),
            },
        }
    }
}

impl From<bugswarm_api::Error> for CliError {
    fn from(err: bugswarm_api::Error) -> Self {
        match err {
            bugswarm_api::Error::InvalidApiKey => CliError::AuthFailed {
                profile: "current".into(),
            },
            bugswarm_api::Error::InvitationClosed { id, status } => {
                CliError::InvitationClosed { id, status }
            }
            bugswarm_api::Error::Transport(e) if e.is_connect() || e.is_timeout() => {
                CliError::ConnectionFailed {
                    host: e
                        .url()
                        .and_then(|u| u.host_str())
                        .unwrap_or("server")
                        .to_owned(),
                    reason: e.to_string(),
                }
            }
            other => CliError::ApiError {
                message: other.to_string(),
            },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile, key } => CliError::NoCredentials {
                profile,
                key: key.to_string(),
            },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownProfile(name) => CliError::ProfileNotFound {
                name,
                available: String::new(),
            },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}
