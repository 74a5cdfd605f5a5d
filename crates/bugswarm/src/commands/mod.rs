//! Command dispatch: bridges CLI args to the connector and REST client.

pub mod config_cmd;
pub mod invitations;
pub mod resources;
pub mod run;
pub mod swarms;
pub mod util;

use crate::DeviceContext;
use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a profile-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    ctx: &DeviceContext,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Run(args) => run::handle(ctx, args, global).await,
        Command::Swarms(args) => swarms::handle(ctx, args, global).await,
        Command::Resources(args) => resources::handle(ctx, args, global).await,
        Command::Invitations(args) => invitations::handle(ctx, args, global).await,
        Command::Config(_) | Command::Completions(_) => Err(CliError::Validation {
            field: "command".into(),
            reason: "handled before dispatch".into(),
        }),
    }
}
