//! Network topology resolver for two-tier gateway deployments.
//!
//! A gateway with a public address fronts a set of private nodes that are
//! only reachable over two private networks: a routed IPv4 mesh and a
//! self-addressing IPv6 overlay. Given a snapshot of the nodes and three
//! operator flags, this crate computes how every private node becomes
//! reachable from outside:
//!
//! - **[`loader`]**: validates raw node records into an immutable
//!   [`TopologySnapshot`], reporting every problem in one [`TopologyError`].
//!
//! - **[`ports`]**: assigns each private node a unique public port,
//!   `base_port + position`.
//!
//! - **[`planner`]**: picks the networks (mesh before overlay) each node
//!   is exposed through, warning about nodes left unreachable.
//!
//! - **[`synth`]**: builds DNAT rules or reverse-proxy upstream pools plus
//!   the firewall allow-list that exactly matches them.
//!
//! - **[`emit`]**: renders the rule set as a deterministic
//!   [`ConfigurationDocument`] (nftables, nginx, ufw).
//!
//! [`resolve()`] chains the stages. Everything is synchronous and free of
//! I/O; reading topologies and writing documents belongs to the caller.

pub mod config;
pub mod emit;
pub mod error;
pub mod loader;
pub mod model;
pub mod planner;
pub mod ports;
pub mod resolver;
pub mod synth;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{PortStrategy, ResolverOptions, UnreachablePolicy};
pub use emit::{ConfigurationDocument, emit};
pub use error::{AddressField, ConfigurationContradiction, ResolveError, TopologyError, TopologyIssue};
pub use loader::load;
pub use planner::{NodePlan, ReachabilityPlan, Target, Warning};
pub use ports::{PortAssignment, PortMap};
pub use resolver::{Resolution, load_and_resolve, resolve};

pub use model::{
    AllowReason, FirewallAllowEntry, ForwardingRule, GatewayMode, Modes, NetworkMode, NodeId,
    NodeIdentity, PathRoute, PoolEntry, PrivateAddresses, PrivateNetwork, Protocol, RawNode, Role,
    RuleSet, SourceScope, TopologySnapshot, UpstreamPool,
};
