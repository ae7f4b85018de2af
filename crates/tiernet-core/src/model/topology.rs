// ── Topology snapshot and operator modes ──

use serde::{Deserialize, Serialize};

use super::node::{NodeIdentity, PrivateNetwork};

/// How the gateway exposes private nodes.
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
pub enum GatewayMode {
    /// Each external port maps straight to one node's service port.
    #[default]
    DirectForward,
    /// The gateway terminates connections and forwards to upstream pools.
    ReverseProxy,
}

/// Which private networks nodes are exposed through.
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
pub enum NetworkMode {
    MeshOnly,
    OverlayOnly,
    #[default]
    Both,
}

impl NetworkMode {
    /// Networks selected by this mode, in priority order.
    pub fn networks(self) -> &'static [PrivateNetwork] {
        match self {
            Self::MeshOnly => &[PrivateNetwork::Mesh],
            Self::OverlayOnly => &[PrivateNetwork::Overlay],
            Self::Both => &PrivateNetwork::PRIORITY,
        }
    }
}

/// The three operator-chosen flags, passed explicitly through every stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modes {
    pub gateway_mode: GatewayMode,
    pub network_mode: NetworkMode,
    /// Suppress direct per-node port exposure (path-based routing only).
    pub port_forwarding_disabled: bool,
}

// ── Raw loader input ────────────────────────────────────────────────

/// One node record as produced by the provisioning layer.
///
/// Addresses are kept as text so the loader can report every malformed
/// value instead of failing at deserialization time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNode {
    pub id: String,
    pub role: super::node::Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay_address: Option<String>,
}

// ── TopologySnapshot ────────────────────────────────────────────────

/// Validated, immutable input for one resolve.
///
/// Only the loader constructs snapshots, so every snapshot upholds the
/// topology invariants: exactly one gateway, unique well-formed ids, and
/// at least one private address per private node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopologySnapshot {
    nodes: Vec<NodeIdentity>,
    modes: Modes,
}

impl TopologySnapshot {
    pub(crate) fn new(nodes: Vec<NodeIdentity>, modes: Modes) -> Self {
        Self { nodes, modes }
    }

    /// All nodes in input order.
    pub fn nodes(&self) -> &[NodeIdentity] {
        &self.nodes
    }

    pub fn modes(&self) -> Modes {
        self.modes
    }

    pub fn gateway(&self) -> Option<&NodeIdentity> {
        self.nodes.iter().find(|n| n.is_gateway())
    }

    /// Private nodes in input order. This ordering drives port allocation.
    pub fn private_nodes(&self) -> impl Iterator<Item = &NodeIdentity> {
        self.nodes.iter().filter(|n| !n.is_gateway())
    }

    /// Same nodes under different modes. Used when an operator flips a
    /// flag without touching the inventory.
    pub fn with_modes(&self, modes: Modes) -> Self {
        Self {
            nodes: self.nodes.clone(),
            modes,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn network_mode_selects_networks_in_priority_order() {
        assert_eq!(NetworkMode::MeshOnly.networks(), &[PrivateNetwork::Mesh]);
        assert_eq!(NetworkMode::OverlayOnly.networks(), &[PrivateNetwork::Overlay]);
        assert_eq!(
            NetworkMode::Both.networks(),
            &[PrivateNetwork::Mesh, PrivateNetwork::Overlay]
        );
    }

    #[test]
    fn modes_parse_from_snake_case() {
        assert_eq!(
            "reverse_proxy".parse::<GatewayMode>().unwrap(),
            GatewayMode::ReverseProxy
        );
        assert_eq!("mesh_only".parse::<NetworkMode>().unwrap(), NetworkMode::MeshOnly);
        assert_eq!(GatewayMode::DirectForward.to_string(), "direct_forward");
    }

    #[test]
    fn raw_node_deserializes_with_missing_addresses() {
        let node: RawNode =
            serde_json::from_str(r#"{"id":"7","role":"private_node","mesh_address":"10.0.0.7"}"#)
                .unwrap();
        assert_eq!(node.mesh_address.as_deref(), Some("10.0.0.7"));
        assert!(node.overlay_address.is_none());
        assert!(node.public_address.is_none());
    }
}
