// ── Core error types ──
//
// Fatal errors abort a resolve before any document is produced.
// Non-fatal findings (unreachable nodes) are `Warning`s attached to the
// successful result instead; see `planner`.

use std::fmt;

use thiserror::Error;

use crate::config::UnreachablePolicy;
use crate::model::{NodeId, NetworkMode};

/// Which address field of a raw node a finding refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressField {
    Public,
    Mesh,
    Overlay,
}

impl fmt::Display for AddressField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Public => "public_address",
            Self::Mesh => "mesh_address",
            Self::Overlay => "overlay_address",
        })
    }
}

/// A single loader-time finding. The loader reports all of them at once.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyIssue {
    // ── Identity ─────────────────────────────────────────────────────
    #[error("node #{index} has an empty id")]
    EmptyId { index: usize },

    #[error("node '{id}' has an id with characters outside [A-Za-z0-9._-]")]
    MalformedId { id: String },

    #[error("node id '{id}' appears more than once")]
    DuplicateId { id: NodeId },

    #[error("nodes '{first}' and '{second}' map to the same proxy pool name")]
    PoolNameClash { first: NodeId, second: NodeId },

    // ── Gateway cardinality ──────────────────────────────────────────
    #[error("topology has no gateway")]
    NoGateway,

    #[error("topology has {} gateways ({}), expected exactly one", .ids.len(), join_ids(.ids))]
    MultipleGateways { ids: Vec<NodeId> },

    // ── Addresses ────────────────────────────────────────────────────
    #[error("gateway '{id}' has no public address")]
    GatewayWithoutPublicAddress { id: NodeId },

    #[error("private node '{id}' must not carry a public address")]
    PublicAddressOnPrivateNode { id: NodeId },

    #[error("node '{id}' has an invalid {field}: '{value}'")]
    InvalidAddress {
        id: NodeId,
        field: AddressField,
        value: String,
    },

    #[error("private node '{id}' has neither a mesh nor an overlay address")]
    NoPrivateAddress { id: NodeId },

    #[error("{field} {address} is assigned to both '{first}' and '{second}'")]
    SharedAddress {
        field: AddressField,
        address: String,
        first: NodeId,
        second: NodeId,
    },

    // ── Port allocation ──────────────────────────────────────────────
    #[error("node '{id}' needs a numeric id for node-id port allocation")]
    NonNumericId { id: NodeId },

    #[error("node '{id}' would be allocated a port above 65535 (base {base_port} + {position})")]
    PortOutOfRange {
        id: NodeId,
        base_port: u16,
        position: u32,
    },

    #[error("nodes '{first}' and '{second}' would both be allocated port {port}")]
    PortClash {
        first: NodeId,
        second: NodeId,
        port: u16,
    },

    #[error("node '{id}' would be allocated port {port}, which the reverse proxy listens on")]
    PortIsProxyListener { id: NodeId, port: u16 },

    #[error("node '{id}' would be allocated well-known port {port}")]
    PortIsReserved { id: NodeId, port: u16 },
}

fn join_ids(ids: &[NodeId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Every problem found in a topology, reported in one pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid topology: {} issue(s) found", .issues.len())]
pub struct TopologyError {
    pub issues: Vec<TopologyIssue>,
}

impl TopologyError {
    pub fn issues(&self) -> &[TopologyIssue] {
        &self.issues
    }
}

/// Mutually exclusive operator settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigurationContradiction {
    #[error("direct forwarding cannot be used with port forwarding disabled")]
    ForwardingDisabledInDirectMode,

    #[error("path-only access requires at least one reverse proxy listener port")]
    PathOnlyWithoutListener,
}

/// Unified error type for `resolve()`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error("configuration contradiction: {0}")]
    Contradiction(#[from] ConfigurationContradiction),

    #[error(
        "{} node(s) unreachable under {network_mode} ({}), refused by policy {policy}",
        .nodes.len(),
        join_ids(.nodes)
    )]
    Unreachable {
        nodes: Vec<NodeId>,
        network_mode: NetworkMode,
        policy: UnreachablePolicy,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiple_gateways_lists_ids() {
        let issue = TopologyIssue::MultipleGateways {
            ids: vec![NodeId::from("gw-a"), NodeId::from("gw-b")],
        };
        assert_eq!(
            issue.to_string(),
            "topology has 2 gateways (gw-a, gw-b), expected exactly one"
        );
    }

    #[test]
    fn topology_error_counts_issues() {
        let err = TopologyError {
            issues: vec![TopologyIssue::NoGateway, TopologyIssue::EmptyId { index: 3 }],
        };
        assert_eq!(err.to_string(), "invalid topology: 2 issue(s) found");
    }

    #[test]
    fn invalid_address_names_field() {
        let issue = TopologyIssue::InvalidAddress {
            id: NodeId::from("7"),
            field: AddressField::Overlay,
            value: "nope".into(),
        };
        assert_eq!(issue.to_string(), "node '7' has an invalid overlay_address: 'nope'");
    }
}
