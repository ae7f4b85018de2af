// ── Topology snapshot loader ──
//
// Turns raw provisioning records into a validated `TopologySnapshot`.
// Validation never stops at the first problem: every record is checked
// and all findings come back together in one `TopologyError`.

use std::collections::{HashMap, HashSet};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use tracing::debug;

use crate::config::{RESERVED_PORTS, ResolverOptions};
use crate::error::{AddressField, TopologyError, TopologyIssue};
use crate::model::{
    GatewayMode, Modes, NodeId, NodeIdentity, PrivateAddresses, PrivateNetwork, RawNode, Role,
    TopologySnapshot,
};
use crate::ports;

/// A parsed record plus whether it takes part in the per-node checks.
/// Records with an empty or repeated id still contribute their addresses.
struct Candidate {
    node: NodeIdentity,
    distinct: bool,
}

/// Validate raw node records and assemble an immutable snapshot.
pub fn load(
    raw: &[RawNode],
    modes: Modes,
    options: &ResolverOptions,
) -> Result<TopologySnapshot, TopologyError> {
    let mut issues = Vec::new();
    let mut candidates: Vec<Candidate> = Vec::with_capacity(raw.len());
    let mut seen: HashSet<NodeId> = HashSet::new();
    let mut reported_duplicates: HashSet<NodeId> = HashSet::new();
    let mut gateways: Vec<NodeId> = Vec::new();

    for (index, record) in raw.iter().enumerate() {
        let id_text = record.id.trim();
        let (id, distinct) = if id_text.is_empty() {
            issues.push(TopologyIssue::EmptyId { index });
            (NodeId::new(format!("#{index}")), false)
        } else {
            let id = NodeId::new(id_text);
            if !id.is_well_formed() {
                issues.push(TopologyIssue::MalformedId { id: id_text.into() });
            }
            let first = seen.insert(id.clone());
            if !first && reported_duplicates.insert(id.clone()) {
                issues.push(TopologyIssue::DuplicateId { id: id.clone() });
            }
            (id, first)
        };

        if record.role == Role::Gateway {
            gateways.push(id.clone());
        }

        let node = parse_node(id, record, &mut issues);
        candidates.push(Candidate { node, distinct });
    }

    match gateways.len() {
        0 => issues.push(TopologyIssue::NoGateway),
        1 => {}
        _ => issues.push(TopologyIssue::MultipleGateways { ids: gateways }),
    }

    let distinct: Vec<&NodeIdentity> = candidates
        .iter()
        .filter(|c| c.distinct)
        .map(|c| &c.node)
        .collect();
    check_shared_addresses(candidates.iter().map(|c| &c.node), &mut issues);
    check_pool_names(&distinct, &mut issues);
    check_ports(&distinct, modes, options, &mut issues);

    if issues.is_empty() {
        let nodes: Vec<NodeIdentity> = candidates.into_iter().map(|c| c.node).collect();
        debug!(nodes = nodes.len(), "topology snapshot loaded");
        Ok(TopologySnapshot::new(nodes, modes))
    } else {
        debug!(issues = issues.len(), "topology rejected");
        Err(TopologyError { issues })
    }
}

// ── Per-record parsing ──────────────────────────────────────────────

/// Parse one record, pushing every finding. Fields that fail to parse are
/// left empty so later checks still see the rest of the record.
fn parse_node(id: NodeId, record: &RawNode, issues: &mut Vec<TopologyIssue>) -> NodeIdentity {
    let public_address =
        parse_field::<Ipv4Addr>(&id, AddressField::Public, record.public_address.as_deref(), issues);
    let mesh = parse_field::<Ipv4Addr>(&id, AddressField::Mesh, record.mesh_address.as_deref(), issues);
    let overlay =
        parse_field::<Ipv6Addr>(&id, AddressField::Overlay, record.overlay_address.as_deref(), issues);

    match record.role {
        Role::Gateway => {
            if record.public_address.is_none() {
                issues.push(TopologyIssue::GatewayWithoutPublicAddress { id: id.clone() });
            }
        }
        Role::PrivateNode => {
            if record.public_address.is_some() {
                issues.push(TopologyIssue::PublicAddressOnPrivateNode { id: id.clone() });
            }
            if record.mesh_address.is_none() && record.overlay_address.is_none() {
                issues.push(TopologyIssue::NoPrivateAddress { id: id.clone() });
            }
        }
    }

    NodeIdentity {
        id,
        role: record.role,
        public_address,
        addresses: PrivateAddresses::new(mesh, overlay),
    }
}

/// Parse an optional address, tolerating a `/prefix` suffix.
fn parse_field<A: FromStr>(
    id: &NodeId,
    field: AddressField,
    raw: Option<&str>,
    issues: &mut Vec<TopologyIssue>,
) -> Option<A> {
    let raw = raw?;
    let candidate = raw.trim().split('/').next().unwrap_or(raw).trim();
    if let Ok(addr) = candidate.parse() {
        Some(addr)
    } else {
        issues.push(TopologyIssue::InvalidAddress {
            id: id.clone(),
            field,
            value: raw.to_owned(),
        });
        None
    }
}

// ── Cross-record checks ─────────────────────────────────────────────

fn check_shared_addresses<'a>(
    nodes: impl Iterator<Item = &'a NodeIdentity> + Clone,
    issues: &mut Vec<TopologyIssue>,
) {
    for network in PrivateNetwork::PRIORITY {
        let field = match network {
            PrivateNetwork::Mesh => AddressField::Mesh,
            PrivateNetwork::Overlay => AddressField::Overlay,
        };
        let mut owners = HashMap::new();
        for node in nodes.clone() {
            let Some(addr) = node.address_on(network) else {
                continue;
            };
            if let Some(first) = owners.insert(addr, node.id.clone()) {
                issues.push(TopologyIssue::SharedAddress {
                    field,
                    address: addr.to_string(),
                    first,
                    second: node.id.clone(),
                });
            }
        }
    }
}

fn check_pool_names(nodes: &[&NodeIdentity], issues: &mut Vec<TopologyIssue>) {
    let mut names: HashMap<String, &NodeId> = HashMap::new();
    for node in nodes.iter().filter(|n| !n.is_gateway()) {
        if let Some(first) = names.insert(node.id.pool_name(), &node.id) {
            issues.push(TopologyIssue::PoolNameClash {
                first: first.clone(),
                second: node.id.clone(),
            });
        }
    }
}

fn check_ports(
    nodes: &[&NodeIdentity],
    modes: Modes,
    options: &ResolverOptions,
    issues: &mut Vec<TopologyIssue>,
) {
    // Path-only access never publishes node ports.
    let exposed = !modes.port_forwarding_disabled;
    let behind_proxy = modes.gateway_mode == GatewayMode::ReverseProxy;
    let mut owners: HashMap<u16, &NodeId> = HashMap::new();

    for (index, node) in nodes.iter().filter(|n| !n.is_gateway()).enumerate() {
        let Some(position) = ports::position(options.port_strategy, index, &node.id) else {
            issues.push(TopologyIssue::NonNumericId {
                id: node.id.clone(),
            });
            continue;
        };
        let Some(port) = ports::port_at(options.base_port, position) else {
            issues.push(TopologyIssue::PortOutOfRange {
                id: node.id.clone(),
                base_port: options.base_port,
                position,
            });
            continue;
        };
        if let Some(first) = owners.insert(port, &node.id) {
            issues.push(TopologyIssue::PortClash {
                first: first.clone(),
                second: node.id.clone(),
                port,
            });
        }
        if !exposed {
            continue;
        }
        if behind_proxy && options.proxy_listen_ports.contains(&port) {
            issues.push(TopologyIssue::PortIsProxyListener {
                id: node.id.clone(),
                port,
            });
        } else if RESERVED_PORTS.contains(&port) {
            issues.push(TopologyIssue::PortIsReserved {
                id: node.id.clone(),
                port,
            });
        }
    }
}
