//! Shared helpers for command handlers.

use bugswarm_api::{BugswarmClient, TransportConfig};
use bugswarm_config::KeyKind;

use crate::DeviceContext;
use crate::error::CliError;

/// Transport settings for the active profile.
pub fn transport(ctx: &DeviceContext) -> TransportConfig {
    TransportConfig {
        secure: ctx.profile.secure(&ctx.config.defaults),
        timeout: ctx.profile.timeout(&ctx.config.defaults),
    }
}

/// REST client authenticated with the profile's configuration key.
pub fn rest_client(ctx: &DeviceContext) -> Result<BugswarmClient, CliError> {
    let key = bugswarm_config::resolve_key(&ctx.profile, &ctx.profile_name, KeyKind::Configuration)?;
    let client = BugswarmClient::new(
        &ctx.profile.hostname,
        ctx.profile.http_port(&ctx.config.defaults),
        &key,
        &transport(ctx),
    )?;
    Ok(client)
}

/// This device's resource id, as stored by a previous run.
pub fn device_resource_id(ctx: &DeviceContext) -> Result<&str, CliError> {
    ctx.profile.resource_id.as_deref().ok_or(CliError::NoResource)
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))
}

pub fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_owned()
}
