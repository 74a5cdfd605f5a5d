//! `bugswarm run`: serve local feeds until interrupted.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{info, warn};

use bugswarm_api::BugswarmClient;
use bugswarm_config::ProfileResourceStore;
use bugswarm_core::{
    Connector, ConnectorState, Feed, FileSource, InMemoryFeedRegistry, StreamMessaging, ValueMap,
};

use crate::DeviceContext;
use crate::cli::{GlobalOpts, RunArgs};
use crate::error::CliError;

use super::util;

/// Name of the built-in feed describing the host process.
const SYSTEM_FEED: &str = "system";

/// Host name, process uptime, pid, and the current time.
fn system_feed(started: Instant) -> Feed {
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_default();

    Feed::structured(SYSTEM_FEED, move || {
        let mut values = ValueMap::new();
        values.insert("hostname".into(), Value::from(host.clone()));
        values.insert("uptime".into(), Value::from(started.elapsed().as_secs()));
        values.insert("pid".into(), Value::from(std::process::id()));
        values.insert(
            "timestamp".into(),
            Value::from(chrono::Utc::now().to_rfc3339()),
        );
        values
    })
}

fn build_registry(args: RunArgs) -> Result<InMemoryFeedRegistry, CliError> {
    let registry = InMemoryFeedRegistry::new();
    if !args.no_system_feed {
        registry.upsert(system_feed(Instant::now()));
    }
    for (name, path) in args.binary_feeds {
        if !path.is_file() {
            return Err(CliError::Validation {
                field: format!("binary feed '{name}'"),
                reason: format!("{} is not a readable file", path.display()),
            });
        }
        registry.upsert(Feed::binary(name, FileSource(path)));
    }
    Ok(registry)
}

pub async fn handle(ctx: &DeviceContext, args: RunArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let config = bugswarm_config::profile_to_connector_config(
        &ctx.profile,
        &ctx.profile_name,
        &ctx.config.defaults,
    )?;
    let transport = util::transport(ctx);

    let web = BugswarmClient::new(
        &config.hostname,
        config.http_port,
        &config.configuration_key,
        &transport,
    )?;
    let messaging = StreamMessaging::new(
        config.hostname.clone(),
        config.messaging_port,
        config.participation_key.clone(),
        transport,
    );
    let registry = build_registry(args)?;
    let store = ProfileResourceStore::new(ctx.config_path.clone(), ctx.profile_name.clone());

    let connector = Connector::new(
        config,
        Arc::new(web),
        Arc::new(messaging),
        Arc::new(registry),
        Arc::new(store),
    )?;

    connector.start().await?;

    let resource_id = connector.resource_id().await.unwrap_or_default();
    let swarms = connector.member_swarms().await.len();
    info!(resource_id = %resource_id, swarms, "connector running");
    if !global.quiet {
        eprintln!("Connector running as {resource_id} in {swarms} swarm(s). Press Ctrl-C to stop.");
    }

    let mut state = connector.subscribe_state();
    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                warn!(error = %e, "failed to listen for Ctrl-C");
            }
            info!("interrupt received, shutting down");
        }
        _ = state.wait_for(|s| *s == ConnectorState::Stopped) => {
            warn!("connector stopped unexpectedly");
        }
    }

    connector.shutdown().await;
    if !global.quiet {
        eprintln!("Connector stopped");
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bugswarm_core::{FeedRegistry, ValueSource};

    use super::*;

    #[test]
    fn system_feed_reports_process() {
        let feed = system_feed(Instant::now());
        let Feed::Structured(structured) = feed else {
            panic!("system feed must be structured");
        };
        let values = structured.source.read();
        assert_eq!(values["pid"], Value::from(std::process::id()));
        assert!(values.contains_key("hostname"));
        assert!(values.contains_key("uptime"));
        assert!(values.contains_key("timestamp"));
    }

    #[test]
    fn registry_rejects_missing_binary_file() {
        let args = RunArgs {
            binary_feeds: vec![("img".into(), "/nonexistent/bugswarm.bin".into())],
            no_system_feed: true,
        };
        assert!(matches!(
            build_registry(args),
            Err(CliError::Validation { .. })
        ));
    }

    #[test]
    fn registry_holds_system_and_binary_feeds() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let args = RunArgs {
            binary_feeds: vec![("snapshot".into(), file.path().to_path_buf())],
            no_system_feed: false,
        };
        let registry = build_registry(args).unwrap();
        let names: Vec<String> = registry
            .list_feeds()
            .iter()
            .map(|f| f.name().to_owned())
            .collect();
        assert_eq!(names, vec!["snapshot".to_owned(), "system".to_owned()]);
    }
}
