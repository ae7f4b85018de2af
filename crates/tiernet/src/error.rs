//! CLI error types with miette diagnostics.
//!
//! Maps resolver and config errors into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use tiernet_config::ConfigError;
use tiernet_core::{ConfigurationContradiction, NodeId, ResolveError, TopologyError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const TOPOLOGY: i32 = 3;
    pub const CONTRADICTION: i32 = 4;
    pub const UNREACHABLE: i32 = 5;
    pub const IO: i32 = 6;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Topology ─────────────────────────────────────────────────────

    #[error("Invalid topology: {count} issue(s) found")]
    #[diagnostic(code(tiernet::topology), help("{details}"))]
    Topology { count: usize, details: String },

    #[error("Could not read topology file '{path}'")]
    #[diagnostic(
        code(tiernet::topology_file),
        help("{reason}\nTopology files must be TOML (.toml) or JSON (.json).")
    )]
    TopologyFile { path: String, reason: String },

    #[error("No topology file given")]
    #[diagnostic(
        code(tiernet::no_topology),
        help(
            "Pass a topology file, e.g. `tiernet resolve site.toml`,\n\
             or set `topology` in profile '{profile}'."
        )
    )]
    NoTopology { profile: String },

    // ── Resolve ──────────────────────────────────────────────────────

    #[error("Direct forwarding cannot be used with port forwarding disabled")]
    #[diagnostic(
        code(tiernet::contradiction),
        help(
            "Drop --no-port-forwarding (or pass --port-forwarding), or switch to\n\
             path-based access with --gateway-mode reverse-proxy."
        )
    )]
    ForwardingDisabled,

    #[error("Path-only access needs at least one reverse proxy listener")]
    #[diagnostic(
        code(tiernet::contradiction),
        help("Set `proxy_listen_ports` in the profile, or re-enable port forwarding.")
    )]
    NoProxyListener,

    #[error("Unreachable under {network_mode}: {nodes}")]
    #[diagnostic(
        code(tiernet::unreachable),
        help(
            "Give these nodes an address on a network the mode selects,\n\
             choose a broader --network-mode, or relax `unreachable_policy` ({policy})."
        )
    )]
    Unreachable {
        nodes: String,
        network_mode: String,
        policy: String,
    },

    #[error("Resolve produced {count} warning(s)")]
    #[diagnostic(
        code(tiernet::warnings_denied),
        help("Fix the warnings above, or drop --deny-warnings.")
    )]
    WarningsDenied { count: usize },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(tiernet::validation))]
    Validation { field: String, reason: String },

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(tiernet::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: tiernet config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Config file already exists at {path}")]
    #[diagnostic(
        code(tiernet::config_exists),
        help("Use --force to overwrite it.")
    )]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(code(tiernet::config))]
    Config(Box<figment::Error>),

    // ── IO / Serialization ───────────────────────────────────────────

    #[error("Failed to serialize output: {0}")]
    #[diagnostic(code(tiernet::serialization))]
    Serialization(String),

    #[error(transparent)]
    #[diagnostic(code(tiernet::io))]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Topology { .. } | Self::TopologyFile { .. } => exit_code::TOPOLOGY,
            Self::ForwardingDisabled | Self::NoProxyListener => exit_code::CONTRADICTION,
            Self::Unreachable { .. } | Self::WarningsDenied { .. } => exit_code::UNREACHABLE,
            Self::NoTopology { .. }
            | Self::Validation { .. }
            | Self::ProfileNotFound { .. }
            | Self::ConfigExists { .. } => exit_code::USAGE,
            Self::Io(_) => exit_code::IO,
            Self::Config(_) | Self::Serialization(_) => exit_code::GENERAL,
        }
    }
}

// ── Core / config error mapping ──────────────────────────────────────

impl From<TopologyError> for CliError {
    fn from(err: TopologyError) -> Self {
        let details = err
            .issues()
            .iter()
            .map(|issue| format!("- {issue}"))
            .collect::<Vec<_>>()
            .join("\n");
        CliError::Topology {
            count: err.issues.len(),
            details,
        }
    }
}

impl From<ConfigurationContradiction> for CliError {
    fn from(err: ConfigurationContradiction) -> Self {
        match err {
            ConfigurationContradiction::ForwardingDisabledInDirectMode => {
                CliError::ForwardingDisabled
            }
            ConfigurationContradiction::PathOnlyWithoutListener => CliError::NoProxyListener,
        }
    }
}

impl From<ResolveError> for CliError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Topology(err) => err.into(),
            ResolveError::Contradiction(err) => err.into(),
            ResolveError::Unreachable {
                nodes,
                network_mode,
                policy,
            } => CliError::Unreachable {
                nodes: nodes
                    .iter()
                    .map(NodeId::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
                network_mode: network_mode.to_string(),
                policy: policy.to_string(),
            },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::ProfileNotFound { name, available } => {
                CliError::ProfileNotFound { name, available }
            }
            ConfigError::UnsupportedFormat { path } => CliError::TopologyFile {
                path,
                reason: "unrecognized file extension".into(),
            },
            ConfigError::TopologyParse { path, reason } => CliError::TopologyFile { path, reason },
            ConfigError::Serialization(e) => CliError::Validation {
                field: "config".into(),
                reason: format!("failed to serialize config: {e}"),
            },
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Io(e) => CliError::Io(e),
        }
    }
}
