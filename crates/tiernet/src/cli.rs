//! Clap derive structures for the `tiernet` CLI.
//!
//! Only depends on `clap` and `clap_complete` so `build.rs` can include it
//! for man page generation.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// tiernet -- gateway configuration for two-tier private networks
#[derive(Debug, Parser)]
#[command(
    name = "tiernet",
    version,
    about = "Resolve gateway forwarding, proxy and firewall configuration",
    long_about = "Computes how every private node behind a public gateway becomes\n\
        reachable over the IPv4 mesh and the IPv6 overlay, and renders the\n\
        forwarding, reverse proxy and firewall configuration for the gateway.",
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
    /// Deployment profile to use
    #[arg(long, short = 'p', env = "TIERNET_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Gateway mode (overrides profile and topology file)
    #[arg(long, short = 'g', global = true)]
    pub gateway_mode: Option<GatewayModeArg>,

    /// Network mode (overrides profile and topology file)
    #[arg(long, short = 'n', global = true)]
    pub network_mode: Option<NetworkModeArg>,

    /// Disable per-node public ports
    #[arg(long, global = true)]
    pub no_port_forwarding: bool,

    /// Re-enable per-node public ports
    #[arg(long, global = true, conflicts_with = "no_port_forwarding")]
    pub port_forwarding: bool,

    /// First port of the allocator range
    #[arg(long, global = true)]
    pub base_port: Option<u16>,

    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', env = "TIERNET_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Mode Enums ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GatewayModeArg {
    /// One public port per node, DNAT straight to the node
    DirectForward,
    /// Gateway terminates connections and proxies to upstream pools
    ReverseProxy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NetworkModeArg {
    /// IPv4 mesh only
    MeshOnly,
    /// IPv6 overlay only
    OverlayOnly,
    /// Mesh first, overlay as fallback
    Both,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Rendered document or pretty table (default, interactive)
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve a topology into the gateway configuration document
    #[command(alias = "r")]
    Resolve(ResolveArgs),

    /// Validate a topology file and report every problem found
    Validate(TopologyArgs),

    /// Show the public port assigned to each private node
    Ports(TopologyArgs),

    /// Show which networks each private node is reachable through
    Plan(TopologyArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared Arguments ─────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct TopologyArgs {
    /// Topology file (.toml or .json); defaults to the profile's topology
    pub topology: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub input: TopologyArgs,

    /// Also write the rendered document to this file
    #[arg(long, short = 'w')]
    pub write: Option<PathBuf>,

    /// Exit with an error when the resolve produced warnings
    #[arg(long)]
    pub deny_warnings: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a starter config file with a default profile
    Init {
        /// Topology file for the new profile
        #[arg(long)]
        topology: Option<PathBuf>,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Display current resolved configuration
    Show,

    /// Print the config file location
    Path,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
