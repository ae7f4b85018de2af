//! Rule synthesizer.
//!
//! Turns port assignments and reachability plans into the concrete rule
//! set for the selected gateway mode, then derives the firewall allow-list
//! from it. The allow-list is computed from the rules, never alongside
//! them: every exposed port gets exactly one allow entry and no allow
//! entry exists without an exposed port behind it.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::ResolverOptions;
use crate::error::ConfigurationContradiction;
use crate::model::{
    AllowReason, FirewallAllowEntry, ForwardingRule, GatewayMode, Modes, PathRoute, PoolEntry,
    Protocol, RuleSet, SourceScope, UpstreamPool,
};
use crate::planner::ReachabilityPlan;
use crate::ports::PortMap;

/// Reject flag combinations that cannot produce a meaningful rule set.
pub fn check_modes(
    modes: Modes,
    options: &ResolverOptions,
) -> Result<(), ConfigurationContradiction> {
    match modes.gateway_mode {
        GatewayMode::DirectForward if modes.port_forwarding_disabled => {
            Err(ConfigurationContradiction::ForwardingDisabledInDirectMode)
        }
        GatewayMode::ReverseProxy
            if modes.port_forwarding_disabled && options.proxy_listen_ports.is_empty() =>
        {
            Err(ConfigurationContradiction::PathOnlyWithoutListener)
        }
        _ => Ok(()),
    }
}

/// Build the rule set and its allow-list.
pub fn synthesize(
    modes: Modes,
    ports: &PortMap,
    plan: &ReachabilityPlan,
    options: &ResolverOptions,
) -> Result<RuleSet, ConfigurationContradiction> {
    check_modes(modes, options)?;

    let mut rules = match modes.gateway_mode {
        GatewayMode::DirectForward => direct_forward(ports, plan, options),
        GatewayMode::ReverseProxy => {
            reverse_proxy(ports, plan, options, modes.port_forwarding_disabled)
        }
    };
    rules.allow = allow_list(&rules, &options.allow_source);

    debug!(
        forwarding = rules.forwarding.len(),
        pools = rules.pools.len(),
        allow = rules.allow.len(),
        "rules synthesized"
    );
    Ok(rules)
}

fn direct_forward(ports: &PortMap, plan: &ReachabilityPlan, options: &ResolverOptions) -> RuleSet {
    let mut rules = RuleSet::default();
    for node in &plan.nodes {
        let Some(public_port) = ports.get(&node.node_id) else {
            continue;
        };
        rules
            .forwarding
            .extend(node.targets.iter().map(|t| ForwardingRule {
                node_id: node.node_id.clone(),
                public_port,
                target_address: t.address,
                target_network: t.network,
                target_port: options.service_port,
            }));
    }
    rules
}

fn reverse_proxy(
    ports: &PortMap,
    plan: &ReachabilityPlan,
    options: &ResolverOptions,
    path_only: bool,
) -> RuleSet {
    let mut rules = RuleSet::default();
    let prefix = options.normalized_prefix();

    let mut listeners = options.proxy_listen_ports.clone();
    listeners.sort_unstable();
    listeners.dedup();
    rules.proxy_listeners = listeners;

    for node in plan.nodes.iter().filter(|n| n.is_reachable()) {
        let pool_id = node.node_id.pool_name();
        let listen_port = if path_only {
            None
        } else {
            ports.get(&node.node_id)
        };

        rules.pools.push(UpstreamPool {
            pool_id: pool_id.clone(),
            node_id: node.node_id.clone(),
            listen_port,
            entries: node
                .targets
                .iter()
                .map(|t| PoolEntry {
                    address: t.address,
                    network: t.network,
                    port: options.service_port,
                })
                .collect(),
        });
        rules.routes.push(PathRoute {
            path: format!("{prefix}{}/", node.node_id),
            pool_id,
        });
    }
    rules
}

/// One allow entry per distinct exposed port, sorted by port.
fn allow_list(rules: &RuleSet, scope: &SourceScope) -> Vec<FirewallAllowEntry> {
    let mut by_port: BTreeMap<u16, AllowReason> = BTreeMap::new();

    for &port in &rules.proxy_listeners {
        by_port.entry(port).or_insert(AllowReason::ProxyListener);
    }
    for rule in &rules.forwarding {
        by_port
            .entry(rule.public_port)
            .or_insert_with(|| AllowReason::NodePort(rule.node_id.clone()));
    }
    for pool in &rules.pools {
        if let Some(port) = pool.listen_port {
            by_port
                .entry(port)
                .or_insert_with(|| AllowReason::NodePort(pool.node_id.clone()));
        }
    }

    by_port
        .into_iter()
        .map(|(port, reason)| FirewallAllowEntry {
            protocol: Protocol::Tcp,
            port,
            source_scope: scope.clone(),
            reason,
        })
        .collect()
}
