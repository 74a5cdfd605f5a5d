//! Config subcommand handlers.

use dialoguer::{Confirm, Input, Password, Select};
use secrecy::SecretString;

use bugswarm_api::{ApiKey, BugswarmClient, KeyType, TransportConfig};
use bugswarm_config::{self as config, Config, KeyKind, Profile};

use crate::active_profile_name;
use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "********";

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Copy of `cfg` safe to print: plaintext API keys are masked.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.configuration_key.is_some() {
            profile.configuration_key = Some(REDACTED.into());
        }
        if profile.participation_key.is_some() {
            profile.participation_key = Some(REDACTED.into());
        }
    }
    cfg
}

fn parse_value<T: std::str::FromStr>(field: &str, value: &str, expected: &str) -> Result<T, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("must be {expected}"),
    })
}

/// Apply `key = value` to a profile.
fn set_profile_value(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    match key {
        "hostname" => profile.hostname = value,
        "http_port" | "http-port" => {
            profile.http_port = Some(parse_value(key, &value, "a port number")?);
        }
        "messaging_port" | "messaging-port" => {
            profile.messaging_port = Some(parse_value(key, &value, "a port number")?);
        }
        "username" => profile.username = value,
        "device_name" | "device-name" => profile.device_name = Some(value),
        "resource_id" | "resource-id" => profile.resource_id = Some(value),
        "configuration_key_env" | "configuration-key-env" => {
            profile.configuration_key_env = Some(value);
        }
        "participation_key_env" | "participation-key-env" => {
            profile.participation_key_env = Some(value);
        }
        "enabled" => profile.enabled = parse_value(key, &value, "'true' or 'false'")?,
        "secure" => profile.secure = Some(parse_value(key, &value, "'true' or 'false'")?),
        "timeout" => profile.timeout = Some(parse_value(key, &value, "a number (seconds)")?),
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!(
                    "unknown config key '{other}'. Valid keys: hostname, http_port, \
                     messaging_port, username, device_name, resource_id, \
                     configuration_key_env, participation_key_env, enabled, secure, timeout"
                ),
            });
        }
    }
    Ok(())
}

/// Pick the first active key of each type, issuing new ones where missing.
async fn fetch_keys(
    client: &BugswarmClient,
    username: &str,
    password: &SecretString,
) -> Result<(String, String), CliError> {
    let existing = client.list_keys(username, password).await?;
    let active = |kind: KeyType| {
        existing
            .iter()
            .find(|k| k.active && k.key_type == kind)
            .map(|k: &ApiKey| k.key.clone())
    };

    let configuration = match active(KeyType::Configuration) {
        Some(key) => key,
        None => client.create_key(username, password, KeyType::Configuration).await?.key,
    };
    let participation = match active(KeyType::Participation) {
        Some(key) => key,
        None => client.create_key(username, password, KeyType::Participation).await?.key,
    };
    Ok((configuration, participation))
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let config_path = config::config_path();

    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            eprintln!("BUGswarm connector configuration");
            eprintln!("   Config path: {}\n", config_path.display());

            let mut cfg = config::read_config_file(&config_path)?;

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default(global.profile.clone().unwrap_or_else(|| "default".into()))
                .interact_text()
                .map_err(prompt_err)?;

            let hostname: String = Input::new()
                .with_prompt("Server hostname")
                .default("api.bugswarm.net".into())
                .interact_text()
                .map_err(prompt_err)?;

            let secure = Confirm::new()
                .with_prompt("Use TLS (https/wss)?")
                .default(true)
                .interact()
                .map_err(prompt_err)?;

            let username: String = Input::new()
                .with_prompt("Account username")
                .interact_text()
                .map_err(prompt_err)?;

            let key_choices = &["Fetch keys with my account password", "Enter API keys"];
            let (configuration_key, participation_key) = if Select::new()
                .with_prompt("How should the API keys be obtained?")
                .items(key_choices)
                .default(0)
                .interact()
                .map_err(prompt_err)?
                == 0
            {
                let password = SecretString::from(
                    Password::new()
                        .with_prompt("Account password")
                        .interact()
                        .map_err(prompt_err)?,
                );
                let profile = Profile {
                    secure: Some(secure),
                    ..Profile::default()
                };
                let transport = TransportConfig {
                    secure,
                    timeout: profile.timeout(&cfg.defaults),
                };
                let client =
                    BugswarmClient::anonymous(&hostname, profile.http_port(&cfg.defaults), &transport)?;
                fetch_keys(&client, &username, &password).await?
            } else {
                let prompt_key = |label: &str| {
                    Password::new()
                        .with_prompt(label)
                        .interact()
                        .map_err(prompt_err)
                };
                (
                    prompt_key("Configuration API key")?,
                    prompt_key("Participation API key")?,
                )
            };

            if configuration_key.is_empty() || participation_key.is_empty() {
                return Err(CliError::Validation {
                    field: "api keys".into(),
                    reason: "API keys cannot be empty".into(),
                });
            }

            let store_choices = &[
                "Store in system keyring (recommended)",
                "Save to config file (plaintext)",
            ];
            let use_keyring = Select::new()
                .with_prompt("Where to store the API keys?")
                .items(store_choices)
                .default(0)
                .interact()
                .map_err(prompt_err)?
                == 0;

            let (plain_configuration, plain_participation) = if use_keyring {
                config::store_key_in_keyring(&profile_name, KeyKind::Configuration, &configuration_key)?;
                config::store_key_in_keyring(&profile_name, KeyKind::Participation, &participation_key)?;
                eprintln!("   API keys stored in system keyring");
                (None, None)
            } else {
                (Some(configuration_key), Some(participation_key))
            };

            // Keep a resource id from an earlier run of the same profile.
            let resource_id = cfg
                .profiles
                .get(&profile_name)
                .and_then(|p| p.resource_id.clone());

            let profile = Profile {
                hostname,
                secure: Some(secure),
                username,
                configuration_key: plain_configuration,
                participation_key: plain_participation,
                resource_id,
                ..Profile::default()
            };

            cfg.profiles.insert(profile_name.clone(), profile);
            cfg.default_profile = Some(profile_name.clone());
            config::save_config_to(&config_path, &cfg)?;

            eprintln!("\nConfiguration written to {}", config_path.display());
            eprintln!("  Active profile: {profile_name}");
            eprintln!("\n  Start the connector: bugswarm run");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = redacted(&config::load_config_or_default());
            let out = output::render_single(
                &global.output,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|e| format!("{c:#?}\n({e})")),
                |c| c.default_profile_name().to_owned(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::read_config_file(&config_path)?;
            let profile_name = active_profile_name(global, &cfg);
            let profile = cfg.profiles.entry(profile_name.clone()).or_default();
            set_profile_value(profile, &key, value)?;
            config::save_config_to(&config_path, &cfg)?;
            if !global.quiet {
                eprintln!("Updated {key} in profile '{profile_name}'");
            }
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile_name();
            let mut names: Vec<&String> = cfg.profiles.keys().collect();
            names.sort();
            for name in names {
                let marker = if name == default { " *" } else { "" };
                println!("{name}{marker}");
            }
            Ok(())
        }

        // ── Use <name> ──────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::read_config_file(&config_path)?;
            if !cfg.profiles.contains_key(&name) {
                let mut available: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
                available.sort_unstable();
                return Err(CliError::ProfileNotFound {
                    name,
                    available: available.join(", "),
                });
            }
            cfg.default_profile = Some(name.clone());
            config::save_config_to(&config_path, &cfg)?;
            if !global.quiet {
                eprintln!("Default profile set to '{name}'");
            }
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            println!("{}", config_path.display());
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn redaction_masks_plaintext_keys_only() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "lab".into(),
            Profile {
                configuration_key: Some("c-secret".into()),
                participation_key_env: Some("PART_KEY".into()),
                ..Profile::default()
            },
        );

        let shown = redacted(&cfg);
        let lab = &shown.profiles["lab"];
        assert_eq!(lab.configuration_key.as_deref(), Some(REDACTED));
        assert_eq!(lab.participation_key, None);
        assert_eq!(lab.participation_key_env.as_deref(), Some("PART_KEY"));

        let rendered = toml::to_string_pretty(&shown).unwrap();
        assert!(!rendered.contains("c-secret"));
    }

    #[test]
    fn set_parses_typed_values() {
        let mut profile = Profile::default();
        set_profile_value(&mut profile, "messaging-port", "5222".into()).unwrap();
        set_profile_value(&mut profile, "secure", "false".into()).unwrap();
        set_profile_value(&mut profile, "hostname", "swarm.local".into()).unwrap();
        assert_eq!(profile.messaging_port, Some(5222));
        assert_eq!(profile.secure, Some(false));
        assert_eq!(profile.hostname, "swarm.local");

        assert!(matches!(
            set_profile_value(&mut profile, "http_port", "http".into()),
            Err(CliError::Validation { .. })
        ));
        assert!(matches!(
            set_profile_value(&mut profile, "colour", "red".into()),
            Err(CliError::Validation { .. })
        ));
    }
}
