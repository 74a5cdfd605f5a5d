//! Swarm command handlers.

use tabled::Tabled;

use bugswarm_api::{MemberType, SwarmModel, SwarmResourceModel};

use crate::DeviceContext;
use crate::cli::{GlobalOpts, MemberKind, SwarmsArgs, SwarmsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct SwarmRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Public")]
    public: bool,
    #[tabled(rename = "Members")]
    members: usize,
    #[tabled(rename = "Description")]
    description: String,
}

fn swarm_row(s: &SwarmModel) -> SwarmRow {
    SwarmRow {
        id: s.id.clone(),
        name: s.name.clone(),
        public: s.is_public,
        members: s.members.len(),
        description: util::or_dash(s.description.as_deref()),
    }
}

#[derive(Tabled)]
struct MemberRow {
    #[tabled(rename = "Resource")]
    resource_id: String,
    #[tabled(rename = "Type")]
    member_type: String,
    #[tabled(rename = "User")]
    user: String,
}

fn member_row(m: &SwarmResourceModel) -> MemberRow {
    MemberRow {
        resource_id: m.resource_id.clone(),
        member_type: m.member_type.to_string(),
        user: util::or_dash(m.user_id.as_deref()),
    }
}

fn swarm_detail(s: &SwarmModel) -> String {
    output::detail_lines(&[
        ("ID", s.id.clone()),
        ("Name", s.name.clone()),
        ("Description", util::or_dash(s.description.as_deref())),
        ("Public", s.is_public.to_string()),
        ("Owner", util::or_dash(s.owner_user_id.as_deref())),
        (
            "Created",
            s.created_at.map_or_else(|| "-".into(), |t| t.to_rfc3339()),
        ),
        ("Members", s.members.len().to_string()),
    ])
}

pub async fn handle(
    ctx: &DeviceContext,
    args: SwarmsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let client = util::rest_client(ctx)?;

    match args.command {
        SwarmsCommand::List => {
            let swarms = client.list_swarms().await?;
            let out = output::render_list(&global.output, &swarms, swarm_row, |s| {
                s.id.clone()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SwarmsCommand::Get { id } => {
            let swarm = client.get_swarm(&id).await.map_err(|e| {
                if e.is_not_found() {
                    CliError::NotFound {
                        resource_type: "swarm".into(),
                        identifier: id.clone(),
                        list_command: "swarms list".into(),
                    }
                } else {
                    e.into()
                }
            })?;
            let out = output::render_single(&global.output, &swarm, swarm_detail, |s| {
                s.id.clone()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SwarmsCommand::Members { id, member_type } => {
            let filter = member_type.map(|k| match k {
                MemberKind::Producer => MemberType::Producer,
                MemberKind::Consumer => MemberType::Consumer,
            });
            let members = client.list_swarm_resources(&id, filter).await?;
            let out = output::render_list(&global.output, &members, member_row, |m| {
                m.resource_id.clone()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
