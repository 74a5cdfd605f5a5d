//! Resource command handlers.

use tabled::Tabled;

use bugswarm_api::{SwarmModel, UserResourceModel};

use crate::DeviceContext;
use crate::cli::{GlobalOpts, ResourcesArgs, ResourcesCommand};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    machine_type: String,
    #[tabled(rename = "This device")]
    current: String,
}

#[derive(Tabled)]
struct SwarmRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
}

fn swarm_row(s: &SwarmModel) -> SwarmRow {
    SwarmRow {
        id: s.id.clone(),
        name: s.name.clone(),
    }
}

pub async fn handle(
    ctx: &DeviceContext,
    args: ResourcesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let client = util::rest_client(ctx)?;

    match args.command {
        ResourcesCommand::List => {
            let resources = client.list_resources().await?;
            let own = ctx.profile.resource_id.as_deref();
            let to_row = |r: &UserResourceModel| ResourceRow {
                id: r.resource_id.clone(),
                name: r.name.clone(),
                machine_type: util::or_dash(r.machine_type.as_deref()),
                current: if own == Some(r.resource_id.as_str()) {
                    "*".into()
                } else {
                    String::new()
                },
            };
            let out = output::render_list(&global.output, &resources, to_row, |r| {
                r.resource_id.clone()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ResourcesCommand::Swarms { id } => {
            let resource_id = match id {
                Some(id) => id,
                None => util::device_resource_id(ctx)?.to_owned(),
            };
            let swarms = client.list_member_swarms(&resource_id).await?;
            let out = output::render_list(&global.output, &swarms, swarm_row, |s| s.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
