//! Clap derive structures for the `bugswarm` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// bugswarm -- run a device connector and manage swarms
#[derive(Debug, Parser)]
#[command(
    name = "bugswarm",
    version,
    about = "Share device feeds with BUGswarm swarms",
    long_about = "Runs a BUGswarm device connector that answers feed requests from\n\
        swarm members, and exposes a few configuration API commands for\n\
        inspecting swarms, resources, and invitations.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Device profile to use
    #[arg(long, short = 'p', env = "BUGSWARM_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "BUGSWARM_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the device connector until interrupted
    Run(RunArgs),

    /// Inspect swarms
    #[command(alias = "sw")]
    Swarms(SwarmsArgs),

    /// Inspect resources owned by the account
    #[command(alias = "res")]
    Resources(ResourcesArgs),

    /// List and answer swarm invitations for this device
    #[command(alias = "inv")]
    Invitations(InvitationsArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Run ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Serve a file as a binary feed (NAME=PATH, repeatable)
    #[arg(long = "binary-feed", value_name = "NAME=PATH", value_parser = parse_binary_feed)]
    pub binary_feeds: Vec<(String, PathBuf)>,

    /// Do not register the built-in `system` feed
    #[arg(long)]
    pub no_system_feed: bool,
}

fn parse_binary_feed(raw: &str) -> Result<(String, PathBuf), String> {
    let (name, path) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=PATH, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() || path.is_empty() {
        return Err(format!("expected NAME=PATH, got '{raw}'"));
    }
    Ok((name.to_owned(), PathBuf::from(path)))
}

// ── Swarms ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SwarmsArgs {
    #[command(subcommand)]
    pub command: SwarmsCommand,
}

#[derive(Debug, Subcommand)]
pub enum SwarmsCommand {
    /// List swarms visible to the account
    #[command(alias = "ls")]
    List,

    /// Show one swarm
    Get {
        /// Swarm id
        id: String,
    },

    /// List a swarm's member resources
    Members {
        /// Swarm id
        id: String,

        /// Only show members of this type
        #[arg(long = "type", value_enum)]
        member_type: Option<MemberKind>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MemberKind {
    Producer,
    Consumer,
}

// ── Resources ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ResourcesArgs {
    #[command(subcommand)]
    pub command: ResourcesCommand,
}

#[derive(Debug, Subcommand)]
pub enum ResourcesCommand {
    /// List resources owned by the account
    #[command(alias = "ls")]
    List,

    /// List the swarms a resource belongs to (defaults to this device)
    Swarms {
        /// Resource id
        id: Option<String>,
    },
}

// ── Invitations ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct InvitationsArgs {
    #[command(subcommand)]
    pub command: InvitationsCommand,
}

#[derive(Debug, Subcommand)]
pub enum InvitationsCommand {
    /// List invitations received by this device
    #[command(alias = "ls")]
    List,

    /// Accept an invitation
    Accept {
        /// Invitation id
        id: String,
    },

    /// Reject an invitation
    Reject {
        /// Invitation id
        id: String,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive setup wizard
    Init,

    /// Show the current configuration (API keys redacted)
    Show,

    /// Set a profile value
    Set {
        /// Profile key (e.g. "hostname", "messaging_port")
        key: String,
        /// New value
        value: String,
    },

    /// List profile names
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name
        name: String,
    },

    /// Print the config file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
