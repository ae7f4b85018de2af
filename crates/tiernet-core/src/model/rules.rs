// ── Synthesized rule types ──
//
// Output of the rule synthesizer: forwarding rules, proxy upstream pools,
// path routes and the firewall allow-list that guards them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use super::node::{NodeId, PrivateNetwork};

/// Transport protocol of an allow entry. Only TCP is exposed today.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Protocol {
    Tcp,
}

/// Where allowed traffic may originate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceScope {
    #[default]
    Any,
    /// A single CIDR block such as `198.51.100.0/24`.
    Cidr(String),
}

impl fmt::Display for SourceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Cidr(cidr) => f.write_str(cidr),
        }
    }
}

/// Error returned when a source scope string is neither `any` nor a CIDR.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid source scope '{0}': expected 'any' or an address/prefix block")]
pub struct InvalidSourceScope(pub String);

impl FromStr for SourceScope {
    type Err = InvalidSourceScope;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("any") {
            return Ok(Self::Any);
        }
        let invalid = || InvalidSourceScope(s.to_owned());
        let (addr, prefix) = s.split_once('/').ok_or_else(invalid)?;
        let addr: IpAddr = addr.parse().map_err(|_| invalid())?;
        let prefix: u8 = prefix.parse().map_err(|_| invalid())?;
        let max = if addr.is_ipv4() { 32 } else { 128 };
        if prefix > max {
            return Err(invalid());
        }
        Ok(Self::Cidr(format!("{addr}/{prefix}")))
    }
}

/// Direct DNAT from a public port to one node over one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardingRule {
    pub node_id: NodeId,
    pub public_port: u16,
    pub target_address: IpAddr,
    pub target_network: PrivateNetwork,
    pub target_port: u16,
}

/// One upstream server inside a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolEntry {
    pub address: IpAddr,
    pub network: PrivateNetwork,
    pub port: u16,
}

/// Reverse-proxy upstream for one node; entries are in network priority order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamPool {
    pub pool_id: String,
    pub node_id: NodeId,
    /// Node's assigned port when the proxy exposes the pool directly.
    /// `None` in path-only mode.
    pub listen_port: Option<u16>,
    pub entries: Vec<PoolEntry>,
}

/// Path-based routing entry served on the proxy listener ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRoute {
    pub path: String,
    pub pool_id: String,
}

/// Why a port is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "node_id")]
pub enum AllowReason {
    ProxyListener,
    NodePort(NodeId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallAllowEntry {
    pub protocol: Protocol,
    pub port: u16,
    pub source_scope: SourceScope,
    pub reason: AllowReason,
}

/// Everything the synthesizer produces for one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    pub forwarding: Vec<ForwardingRule>,
    pub pools: Vec<UpstreamPool>,
    pub routes: Vec<PathRoute>,
    /// Ports the reverse proxy itself listens on (empty in DirectForward mode).
    pub proxy_listeners: Vec<u16>,
    /// Sorted by port, one entry per distinct exposed port.
    pub allow: Vec<FirewallAllowEntry>,
}

impl RuleSet {
    /// Every port that is backed by a forwarding target: DNAT rules,
    /// directly exposed pools, and proxy listeners.
    pub fn exposed_ports(&self) -> std::collections::BTreeSet<u16> {
        self.forwarding
            .iter()
            .map(|r| r.public_port)
            .chain(self.pools.iter().filter_map(|p| p.listen_port))
            .chain(self.proxy_listeners.iter().copied())
            .collect()
    }

    /// Forwarding rules and pool entries for one node.
    pub fn target_count(&self, node: &NodeId) -> usize {
        let rules = self.forwarding.iter().filter(|r| &r.node_id == node).count();
        let entries: usize = self
            .pools
            .iter()
            .filter(|p| &p.node_id == node)
            .map(|p| p.entries.len())
            .sum();
        rules + entries
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn source_scope_parses_any_case_insensitively() {
        assert_eq!("ANY".parse::<SourceScope>().unwrap(), SourceScope::Any);
    }

    #[test]
    fn source_scope_normalizes_cidr() {
        assert_eq!(
            "198.51.100.0/24".parse::<SourceScope>().unwrap(),
            SourceScope::Cidr("198.51.100.0/24".into())
        );
        assert_eq!(
            "2001:db8::/32".parse::<SourceScope>().unwrap().to_string(),
            "2001:db8::/32"
        );
    }

    #[test]
    fn source_scope_rejects_bad_prefix() {
        assert!("10.0.0.0/33".parse::<SourceScope>().is_err());
        assert!("10.0.0.0".parse::<SourceScope>().is_err());
        assert!("nowhere/8".parse::<SourceScope>().is_err());
    }
}
