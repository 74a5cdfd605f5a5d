//! Invitation command handlers.

use tabled::Tabled;

use bugswarm_api::{BugswarmClient, Invitation};

use crate::DeviceContext;
use crate::cli::{GlobalOpts, InvitationsArgs, InvitationsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct InvitationRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "Swarm")]
    swarm: String,
    #[tabled(rename = "As")]
    member_type: String,
    #[tabled(rename = "Status")]
    status: String,
}

fn invitation_row(i: &Invitation) -> InvitationRow {
    InvitationRow {
        id: i.id.clone(),
        from: i.from_user.clone(),
        swarm: util::or_dash(i.swarm_id.as_deref()),
        member_type: i.member_type.to_string(),
        status: i.status.to_string(),
    }
}

async fn find_invitation(
    client: &BugswarmClient,
    resource_id: &str,
    id: &str,
) -> Result<Invitation, CliError> {
    client
        .list_received_invitations(resource_id)
        .await?
        .into_iter()
        .find(|i| i.id == id)
        .ok_or_else(|| CliError::NotFound {
            resource_type: "invitation".into(),
            identifier: id.into(),
            list_command: "invitations list".into(),
        })
}

pub async fn handle(
    ctx: &DeviceContext,
    args: InvitationsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let client = util::rest_client(ctx)?;
    let resource_id = util::device_resource_id(ctx)?;

    match args.command {
        InvitationsCommand::List => {
            let invitations = client.list_received_invitations(resource_id).await?;
            let out = output::render_list(&global.output, &invitations, invitation_row, |i| {
                i.id.clone()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        InvitationsCommand::Accept { id } => {
            let invitation = find_invitation(&client, resource_id, &id).await?;
            client.respond_to_invitation(&invitation, true).await?;
            if !global.quiet {
                eprintln!(
                    "Accepted invitation {id} to swarm {}",
                    util::or_dash(invitation.swarm_id.as_deref())
                );
            }
            Ok(())
        }

        InvitationsCommand::Reject { id } => {
            let invitation = find_invitation(&client, resource_id, &id).await?;
            if !util::confirm(&format!("Reject invitation {id}?"), global.yes)? {
                return Ok(());
            }
            client.respond_to_invitation(&invitation, false).await?;
            if !global.quiet {
                eprintln!("Rejected invitation {id}");
            }
            Ok(())
        }
    }
}
