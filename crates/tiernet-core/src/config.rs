// ── Resolver options ──
//
// Externally configured constants that every stage reads but none
// computes. The CLI builds a `ResolverOptions` from config files and
// flags and hands it in; core never reads config files.

use serde::{Deserialize, Serialize};

use crate::model::SourceScope;

/// First port of the allocator's range. Node `n` (1-based) gets
/// `DEFAULT_BASE_PORT + n`, well clear of 22/80/443.
pub const DEFAULT_BASE_PORT: u16 = 8000;

/// Port the private nodes serve on.
pub const DEFAULT_SERVICE_PORT: u16 = 80;

/// Listener ports of the gateway's reverse proxy.
pub const DEFAULT_PROXY_LISTEN_PORTS: [u16; 2] = [80, 443];

pub const DEFAULT_PATH_PREFIX: &str = "/nodes/";

/// Well-known ports the gateway keeps for itself (ssh, http, https).
/// An exposed node port may never land on one of these.
pub const RESERVED_PORTS: [u16; 3] = [22, 80, 443];

/// How a node's position in the allocator range is chosen.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PortStrategy {
    /// 1-based index among the snapshot's private nodes. Appending a node
    /// never moves existing ports; removing or reordering one shifts every
    /// node after it.
    #[default]
    Sequential,
    /// The node's numeric id is its position. Ports survive removals, but
    /// every private node id must be numeric.
    NodeId,
}

/// What to do when nodes have no address on the selected networks.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UnreachablePolicy {
    /// Attach warnings to the result and carry on.
    #[default]
    Warn,
    /// Fail only when no private node is reachable at all.
    FailWhenAllUnreachable,
    /// Fail when any private node is unreachable.
    FailOnAny,
}

/// Immutable options passed alongside a snapshot to `resolve()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverOptions {
    pub base_port: u16,
    pub service_port: u16,
    pub proxy_listen_ports: Vec<u16>,
    pub path_prefix: String,
    pub port_strategy: PortStrategy,
    pub unreachable_policy: UnreachablePolicy,
    pub allow_source: SourceScope,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            base_port: DEFAULT_BASE_PORT,
            service_port: DEFAULT_SERVICE_PORT,
            proxy_listen_ports: DEFAULT_PROXY_LISTEN_PORTS.to_vec(),
            path_prefix: DEFAULT_PATH_PREFIX.into(),
            port_strategy: PortStrategy::default(),
            unreachable_policy: UnreachablePolicy::default(),
            allow_source: SourceScope::default(),
        }
    }
}

impl ResolverOptions {
    /// Path prefix normalized to start and end with `/`.
    pub fn normalized_prefix(&self) -> String {
        let trimmed = self.path_prefix.trim_matches('/');
        if trimmed.is_empty() {
            "/".into()
        } else {
            format!("/{trimmed}/")
        }
    }
}
