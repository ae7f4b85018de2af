// ── Node identity types ──
//
// NodeId and the private-network address map form the foundation of
// every other type. A node is either the gateway (the only machine with
// a public address) or a private node reachable over the mesh and/or
// overlay networks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

// ── NodeId ──────────────────────────────────────────────────────────

/// Stable identifier for a node, unique within a topology.
///
/// Numeric ids are carried as their decimal text (`"7"`); nothing in the
/// resolver assumes ids are dense or sequential.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value of the id, used as the allocation position by the
    /// identity-stable port strategy.
    pub fn as_position(&self) -> Option<u32> {
        self.0.parse().ok()
    }

    /// Ids may only contain ASCII alphanumerics, `-`, `_` and `.` so they
    /// can appear verbatim in URL paths and rule comments. `.` and `..`
    /// are path segments, not ids.
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !self.0.chars().all(|c| c == '.')
    }

    /// Upstream name used for this node's proxy pool (`node_<id>`).
    pub fn pool_name(&self) -> String {
        let sanitized: String = self
            .0
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        format!("node_{sanitized}")
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NodeId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<u32> for NodeId {
    fn from(n: u32) -> Self {
        Self(n.to_string())
    }
}

// ── Role ────────────────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Gateway,
    PrivateNode,
}

// ── Private networks ────────────────────────────────────────────────

/// The two independent private networks a node can be reached through.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PrivateNetwork {
    /// Routed IPv4 overlay of point-to-point tunnels.
    Mesh,
    /// Self-addressing IPv6 peer-to-peer overlay.
    Overlay,
}

impl PrivateNetwork {
    /// Fixed priority order used everywhere a node lists its networks.
    pub const PRIORITY: [Self; 2] = [Self::Mesh, Self::Overlay];
}

/// A node's addresses on the private networks, keyed by network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateAddresses {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mesh: Option<Ipv4Addr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    overlay: Option<Ipv6Addr>,
}

impl PrivateAddresses {
    pub fn new(mesh: Option<Ipv4Addr>, overlay: Option<Ipv6Addr>) -> Self {
        Self { mesh, overlay }
    }

    pub fn get(&self, network: PrivateNetwork) -> Option<IpAddr> {
        match network {
            PrivateNetwork::Mesh => self.mesh.map(IpAddr::V4),
            PrivateNetwork::Overlay => self.overlay.map(IpAddr::V6),
        }
    }

    /// Every populated address, in [`PrivateNetwork::PRIORITY`] order.
    pub fn iter(&self) -> impl Iterator<Item = (PrivateNetwork, IpAddr)> + '_ {
        PrivateNetwork::PRIORITY
            .into_iter()
            .filter_map(|net| self.get(net).map(|addr| (net, addr)))
    }

    pub fn is_empty(&self) -> bool {
        self.mesh.is_none() && self.overlay.is_none()
    }
}

// ── NodeIdentity ────────────────────────────────────────────────────

/// One deployed machine. Pure data; validated by the loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeIdentity {
    pub id: NodeId,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_address: Option<Ipv4Addr>,
    #[serde(default)]
    pub addresses: PrivateAddresses,
}

impl NodeIdentity {
    pub fn is_gateway(&self) -> bool {
        self.role == Role::Gateway
    }

    pub fn address_on(&self, network: PrivateNetwork) -> Option<IpAddr> {
        self.addresses.get(network)
    }
}
