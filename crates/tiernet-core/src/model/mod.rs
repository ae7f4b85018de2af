// ── Domain model ──
//
// Inputs (node identities, modes, snapshots) and outputs (rules, pools,
// allow entries) of the resolver. No logic beyond accessors lives here.

pub mod node;
pub mod rules;
pub mod topology;

// ── Re-exports ──────────────────────────────────────────────────────

pub use node::{NodeId, NodeIdentity, PrivateAddresses, PrivateNetwork, Role};
pub use rules::{
    AllowReason, FirewallAllowEntry, ForwardingRule, InvalidSourceScope, PathRoute, PoolEntry,
    Protocol, RuleSet, SourceScope, UpstreamPool,
};
pub use topology::{GatewayMode, Modes, NetworkMode, RawNode, TopologySnapshot};
