//! Shared configuration for BUGswarm tools.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! device identity derivation, and translation to
//! `bugswarm_core::ConnectorConfig`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;

use bugswarm_core::ConnectorConfig;

pub mod identity;
pub mod store;

pub use identity::{DeviceIdentity, IdentitySource};
pub use store::ProfileResourceStore;

const KEYRING_SERVICE: &str = "bugswarm";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no {key} configured for profile '{profile}'")]
    NoCredentials { profile: String, key: KeyKind },

    #[error("profile '{0}' not found")]
    UnknownProfile(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named device profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use when none is given explicitly.
    pub fn default_profile_name(&self) -> &str {
        self.default_profile.as_deref().unwrap_or("default")
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile(name.into()))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_secure")]
    pub secure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            secure: default_secure(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_secure() -> bool {
    true
}
fn default_timeout() -> u64 {
    30
}
fn default_hostname() -> String {
    "api.bugswarm.net".into()
}
fn default_enabled() -> bool {
    true
}

/// One device's connection profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Server host name.
    #[serde(default = "default_hostname")]
    pub hostname: String,

    /// REST API port. Defaults to 443 (secure) or 80.
    pub http_port: Option<u16>,

    /// Participation stream port. Defaults to the REST port.
    pub messaging_port: Option<u16>,

    /// Account that owns the device.
    #[serde(default)]
    pub username: String,

    /// Configuration API key (plaintext -- prefer keyring or env var).
    pub configuration_key: Option<String>,

    /// Environment variable name containing the configuration API key.
    pub configuration_key_env: Option<String>,

    /// Participation API key (plaintext -- prefer keyring or env var).
    pub participation_key: Option<String>,

    /// Environment variable name containing the participation API key.
    pub participation_key_env: Option<String>,

    /// Override the derived device identity.
    pub device_name: Option<String>,

    /// Server-assigned resource id, written back after the first run.
    pub resource_id: Option<String>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Override `defaults.secure`.
    pub secure: Option<bool>,

    /// Override `defaults.timeout` (seconds).
    pub timeout: Option<u64>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            hostname: default_hostname(),
            http_port: None,
            messaging_port: None,
            username: String::new(),
            configuration_key: None,
            configuration_key_env: None,
            participation_key: None,
            participation_key_env: None,
            device_name: None,
            resource_id: None,
            enabled: default_enabled(),
            secure: None,
            timeout: None,
        }
    }
}

impl Profile {
    pub fn secure(&self, defaults: &Defaults) -> bool {
        self.secure.unwrap_or(defaults.secure)
    }

    /// REST port: explicit, else 443 or 80 depending on `secure`.
    pub fn http_port(&self, defaults: &Defaults) -> u16 {
        self.http_port
            .unwrap_or(if self.secure(defaults) { 443 } else { 80 })
    }

    /// Participation stream port: explicit, else the REST port.
    pub fn messaging_port(&self, defaults: &Defaults) -> u16 {
        self.messaging_port
            .unwrap_or_else(|| self.http_port(defaults))
    }

    pub fn timeout(&self, defaults: &Defaults) -> Duration {
        Duration::from_secs(self.timeout.unwrap_or(defaults.timeout))
    }
}

/// Which of the two API keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum KeyKind {
    #[strum(serialize = "configuration key")]
    Configuration,
    #[strum(serialize = "participation key")]
    Participation,
}

impl KeyKind {
    fn keyring_user(self, profile_name: &str) -> String {
        match self {
            Self::Configuration => format!("{profile_name}/configuration-key"),
            Self::Participation => format!("{profile_name}/participation-key"),
        }
    }

    fn profile_fields(self, profile: &Profile) -> (Option<&String>, Option<&String>) {
        match self {
            Self::Configuration => (
                profile.configuration_key_env.as_ref(),
                profile.configuration_key.as_ref(),
            ),
            Self::Participation => (
                profile.participation_key_env.as_ref(),
                profile.participation_key.as_ref(),
            ),
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("net", "bugswarm", "bugswarm").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("bugswarm");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path`, layered over defaults and under `BUGSWARM_` env vars.
///
/// Nested keys use a double underscore: `BUGSWARM_DEFAULTS__TIMEOUT=10`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("BUGSWARM_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

/// Read only the TOML file, without env overlays. Used for write-back so
/// environment overrides never leak into the file.
pub fn read_config_file(path: &Path) -> Result<Config, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(raw) => Ok(toml::from_str(&raw)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
        Err(e) => Err(e.into()),
    }
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(&config_path(), cfg)
}

pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve one API key: env var named by the profile, then the system
/// keyring, then plaintext in the profile.
pub fn resolve_key(
    profile: &Profile,
    profile_name: &str,
    kind: KeyKind,
) -> Result<SecretString, ConfigError> {
    let (env_name, plaintext) = kind.profile_fields(profile);

    // 1. Profile's *_key_env → env var lookup
    if let Some(env_name) = env_name {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &kind.keyring_user(profile_name)) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(key) = plaintext {
        return Ok(SecretString::from(key.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
        key: kind,
    })
}

/// Store an API key in the system keyring for `profile_name`.
pub fn store_key_in_keyring(
    profile_name: &str,
    kind: KeyKind,
    secret: &str,
) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &kind.keyring_user(profile_name))?;
    entry.set_password(secret)?;
    Ok(())
}

/// Build a `ConnectorConfig` from a profile.
///
/// The device name comes from the profile if set, otherwise from the
/// derived [`DeviceIdentity`].
pub fn profile_to_connector_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ConnectorConfig, ConfigError> {
    if profile.hostname.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "hostname".into(),
            reason: "must not be empty".into(),
        });
    }

    let configuration_key = resolve_key(profile, profile_name, KeyKind::Configuration)?;
    let participation_key = resolve_key(profile, profile_name, KeyKind::Participation)?;

    let device_name = profile
        .device_name
        .clone()
        .unwrap_or_else(|| DeviceIdentity::detect().value);

    Ok(ConnectorConfig {
        hostname: profile.hostname.clone(),
        http_port: profile.http_port(defaults),
        messaging_port: profile.messaging_port(defaults),
        configuration_key,
        participation_key,
        username: profile.username.clone(),
        device_name,
        resource_id: profile.resource_id.clone(),
        enabled: profile.enabled,
        secure: profile.secure(defaults),
        timeout: profile.timeout(defaults),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    fn profile() -> Profile {
        Profile {
            username: "alice".into(),
            // Cargo sets this for every test binary.
            configuration_key_env: Some("CARGO_PKG_NAME".into()),
            participation_key_env: Some("CARGO_PKG_NAME".into()),
            device_name: Some("pi-kitchen".into()),
            ..Profile::default()
        }
    }

    #[test]
    fn load_layers_file_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_profile = "lab"

[defaults]
timeout = 10

[profiles.lab]
username = "alice"
resource_id = "res-1"
"#,
        )
        .unwrap();

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.default_profile_name(), "lab");
        assert_eq!(cfg.defaults.timeout, 10);
        assert_eq!(cfg.defaults.output, "table");

        let lab = cfg.profile("lab").unwrap();
        assert_eq!(lab.hostname, "api.bugswarm.net");
        assert!(lab.enabled);
        assert_eq!(lab.resource_id.as_deref(), Some("res-1"));
        assert!(matches!(
            cfg.profile("nope"),
            Err(ConfigError::UnknownProfile(_))
        ));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = read_config_file(&dir.path().join("absent.toml")).unwrap();
        assert!(cfg.profiles.is_empty());
        assert_eq!(cfg.default_profile_name(), "default");
    }

    #[test]
    fn env_var_key_wins() {
        let secret = resolve_key(&profile(), "test", KeyKind::Configuration).unwrap();
        assert_eq!(secret.expose_secret(), "bugswarm-config");
    }

    #[test]
    fn connector_config_ports_follow_secure_flag() {
        let mut plain = profile();
        plain.secure = Some(false);
        let cfg = profile_to_connector_config(&plain, "test", &Defaults::default()).unwrap();
        assert_eq!(cfg.http_port, 80);
        assert_eq!(cfg.messaging_port, 80);
        assert!(!cfg.secure);
        assert_eq!(cfg.device_name, "pi-kitchen");
        assert!(cfg.is_valid());

        let mut split = profile();
        split.http_port = Some(8080);
        split.messaging_port = Some(8081);
        let cfg = profile_to_connector_config(&split, "test", &Defaults::default()).unwrap();
        assert_eq!((cfg.http_port, cfg.messaging_port), (8080, 8081));
        assert!(cfg.secure);
    }

    #[test]
    fn empty_hostname_is_rejected() {
        let mut p = profile();
        p.hostname = String::new();
        assert!(matches!(
            profile_to_connector_config(&p, "test", &Defaults::default()),
            Err(ConfigError::Validation { .. })
        ));
    }
}
