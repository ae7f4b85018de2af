//! Port allocator.
//!
//! Every private node gets one externally exposed port,
//! `base_port + position`. With the default [`PortStrategy::Sequential`]
//! the position is the node's 1-based index among the snapshot's private
//! nodes, so allocation depends on node *order*, not on id values:
//!
//! - appending a node never changes the ports of existing nodes;
//! - removing or reordering a node shifts the port of every node after it.
//!
//! Node ids are not guaranteed to be dense or numeric, so they cannot
//! serve as positions in general. Deployments that need
//! ports to survive removals can opt into [`PortStrategy::NodeId`], which
//! uses the numeric id itself as the position.
//!
//! Allocation cannot fail on a loaded snapshot: the loader has already
//! rejected clashing and overflowing ports.

use serde::Serialize;

use crate::config::{PortStrategy, ResolverOptions};
use crate::model::{NodeId, NodeIdentity, TopologySnapshot};

/// One node's externally exposed port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortAssignment {
    pub node_id: NodeId,
    pub port: u16,
}

/// Ports for every private node, in snapshot order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PortMap {
    assignments: Vec<PortAssignment>,
}

impl PortMap {
    pub fn get(&self, node: &NodeId) -> Option<u16> {
        self.assignments
            .iter()
            .find(|a| &a.node_id == node)
            .map(|a| a.port)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PortAssignment> {
        self.assignments.iter()
    }

    pub fn as_slice(&self) -> &[PortAssignment] {
        &self.assignments
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

impl<'a> IntoIterator for &'a PortMap {
    type Item = &'a PortAssignment;
    type IntoIter = std::slice::Iter<'a, PortAssignment>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Allocation position of the private node at `index` (0-based).
pub fn position(strategy: PortStrategy, index: usize, id: &NodeId) -> Option<u32> {
    match strategy {
        PortStrategy::Sequential => index.checked_add(1).and_then(|p| u32::try_from(p).ok()),
        PortStrategy::NodeId => id.as_position(),
    }
}

/// `base_port + position`, or `None` past 65535.
pub fn port_at(base_port: u16, position: u32) -> Option<u16> {
    u32::from(base_port)
        .checked_add(position)
        .and_then(|p| u16::try_from(p).ok())
}

/// Allocate ports for an ordered sequence of private nodes.
pub fn allocate<'a>(
    nodes: impl IntoIterator<Item = &'a NodeIdentity>,
    base_port: u16,
    strategy: PortStrategy,
) -> PortMap {
    let assignments = nodes
        .into_iter()
        .enumerate()
        .filter_map(|(index, node)| {
            let pos = position(strategy, index, &node.id)?;
            let port = port_at(base_port, pos)?;
            Some(PortAssignment {
                node_id: node.id.clone(),
                port,
            })
        })
        .collect();
    PortMap { assignments }
}

/// Allocate ports for every private node of a snapshot.
pub fn allocate_snapshot(snapshot: &TopologySnapshot, options: &ResolverOptions) -> PortMap {
    allocate(
        snapshot.private_nodes(),
        options.base_port,
        options.port_strategy,
    )
}
