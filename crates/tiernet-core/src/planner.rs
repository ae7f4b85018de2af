//! Reachability planner.
//!
//! Decides which private networks each node is exposed through, in
//! priority order (mesh before overlay). A node that lacks an address on
//! every selected network is not an error: it becomes unreachable for the
//! current mode and is reported as a [`Warning`] so the operator notices.

use std::net::IpAddr;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::config::UnreachablePolicy;
use crate::error::ResolveError;
use crate::model::{NetworkMode, NodeId, NodeIdentity, PrivateNetwork, TopologySnapshot};

/// One network a node is reachable through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Target {
    pub network: PrivateNetwork,
    pub address: IpAddr,
}

/// Ordered targets for one private node. May be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodePlan {
    pub node_id: NodeId,
    pub targets: Vec<Target>,
}

impl NodePlan {
    pub fn is_reachable(&self) -> bool {
        !self.targets.is_empty()
    }
}

/// Non-fatal findings attached to a successful resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Warning {
    #[error("node '{node_id}' has no address for network mode {network_mode} and is unreachable")]
    UnreachableNode {
        node_id: NodeId,
        network_mode: NetworkMode,
    },
}

/// Plans for every private node, in snapshot order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReachabilityPlan {
    pub nodes: Vec<NodePlan>,
    pub warnings: Vec<Warning>,
}

impl ReachabilityPlan {
    pub fn unreachable(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes
            .iter()
            .filter(|p| !p.is_reachable())
            .map(|p| &p.node_id)
    }
}

/// Networks through which `node` should be exposed under `mode`.
///
/// The result holds one entry per selected network the node actually has
/// an address on, so its length is 0, 1 or 2.
pub fn plan(node: &NodeIdentity, mode: NetworkMode) -> Vec<Target> {
    mode.networks()
        .iter()
        .filter_map(|&network| {
            node.address_on(network)
                .map(|address| Target { network, address })
        })
        .collect()
}

/// Plan every private node of the snapshot.
pub fn plan_all(snapshot: &TopologySnapshot) -> ReachabilityPlan {
    let mode = snapshot.modes().network_mode;
    let mut result = ReachabilityPlan::default();

    for node in snapshot.private_nodes() {
        let targets = plan(node, mode);
        if targets.is_empty() {
            debug!(node = %node.id, network_mode = %mode, "node unreachable under current network mode");
            result.warnings.push(Warning::UnreachableNode {
                node_id: node.id.clone(),
                network_mode: mode,
            });
        }
        result.nodes.push(NodePlan {
            node_id: node.id.clone(),
            targets,
        });
    }

    result
}

/// Escalate unreachable nodes to a fatal error when the policy demands it.
pub fn enforce(
    policy: UnreachablePolicy,
    plan: &ReachabilityPlan,
    mode: NetworkMode,
) -> Result<(), ResolveError> {
    let unreachable: Vec<NodeId> = plan.unreachable().cloned().collect();
    let refuse = match policy {
        UnreachablePolicy::Warn => false,
        UnreachablePolicy::FailOnAny => !unreachable.is_empty(),
        UnreachablePolicy::FailWhenAllUnreachable => {
            !plan.nodes.is_empty() && unreachable.len() == plan.nodes.len()
        }
    };

    if refuse {
        Err(ResolveError::Unreachable {
            nodes: unreachable,
            network_mode: mode,
            policy,
        })
    } else {
        Ok(())
    }
}
