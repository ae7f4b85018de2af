//! End-to-end resolver scenarios: load raw records, resolve, and check the
//! rule set, allow-list and rendered document together.
#![allow(clippy::unwrap_used)]

use std::collections::BTreeSet;

use pretty_assertions::assert_eq;
use tiernet_core::{
    ConfigurationContradiction, GatewayMode, Modes, NetworkMode, NodeId, PrivateNetwork, RawNode,
    ResolveError, ResolverOptions, Role, RuleSet, UnreachablePolicy, Warning, load, resolve,
};

// ── Helpers ─────────────────────────────────────────────────────────

const BASE: u16 = tiernet_core::config::DEFAULT_BASE_PORT;

fn gateway() -> RawNode {
    RawNode {
        id: "gw".into(),
        role: Role::Gateway,
        public_address: Some("203.0.113.10".into()),
        mesh_address: Some("10.10.0.1".into()),
        overlay_address: Some("200::1".into()),
    }
}

fn node(id: &str, mesh: Option<&str>, overlay: Option<&str>) -> RawNode {
    RawNode {
        id: id.into(),
        role: Role::PrivateNode,
        public_address: None,
        mesh_address: mesh.map(Into::into),
        overlay_address: overlay.map(Into::into),
    }
}

/// Gateway plus nodes 7 and 8, both on mesh and overlay.
fn two_nodes() -> Vec<RawNode> {
    vec![
        gateway(),
        node("7", Some("10.10.0.7"), Some("200::7")),
        node("8", Some("10.10.0.8"), Some("200::8")),
    ]
}

fn modes(gateway_mode: GatewayMode, network_mode: NetworkMode, disabled: bool) -> Modes {
    Modes {
        gateway_mode,
        network_mode,
        port_forwarding_disabled: disabled,
    }
}

fn run(raw: &[RawNode], modes: Modes) -> Result<tiernet_core::Resolution, ResolveError> {
    let options = ResolverOptions::default();
    let snapshot = load(raw, modes, &options)?;
    resolve(&snapshot, &options)
}

fn allow_ports(rules: &RuleSet) -> BTreeSet<u16> {
    rules.allow.iter().map(|a| a.port).collect()
}

fn pool_networks(rules: &RuleSet, id: &str) -> Vec<PrivateNetwork> {
    rules
        .pools
        .iter()
        .find(|p| p.node_id.as_str() == id)
        .map(|p| p.entries.iter().map(|e| e.network).collect())
        .unwrap_or_default()
}

// ── Scenarios ───────────────────────────────────────────────────────

#[test]
fn reverse_proxy_both_networks() {
    let res = run(
        &two_nodes(),
        modes(GatewayMode::ReverseProxy, NetworkMode::Both, false),
    )
    .unwrap();

    assert_eq!(res.ports.get(&"7".into()), Some(BASE + 1));
    assert_eq!(res.ports.get(&"8".into()), Some(BASE + 2));

    assert_eq!(res.rules.pools.len(), 2);
    for id in ["7", "8"] {
        assert_eq!(
            pool_networks(&res.rules, id),
            vec![PrivateNetwork::Mesh, PrivateNetwork::Overlay]
        );
    }

    assert_eq!(
        allow_ports(&res.rules),
        BTreeSet::from([80, 443, BASE + 1, BASE + 2])
    );
    assert!(res.warnings.is_empty());
}

#[test]
fn reverse_proxy_mesh_only() {
    let res = run(
        &two_nodes(),
        modes(GatewayMode::ReverseProxy, NetworkMode::MeshOnly, false),
    )
    .unwrap();

    for id in ["7", "8"] {
        assert_eq!(pool_networks(&res.rules, id), vec![PrivateNetwork::Mesh]);
    }
    assert!(!res.document.proxy.contains("200::"));
    assert!(res.warnings.is_empty());
}

#[test]
fn overlay_only_node_unreachable_under_mesh_only() {
    let mut raw = two_nodes();
    raw.push(node("9", None, Some("200::9")));

    let res = run(
        &raw,
        modes(GatewayMode::ReverseProxy, NetworkMode::MeshOnly, false),
    )
    .unwrap();

    assert_eq!(
        res.warnings,
        vec![Warning::UnreachableNode {
            node_id: "9".into(),
            network_mode: NetworkMode::MeshOnly,
        }]
    );
    assert_eq!(res.rules.target_count(&"9".into()), 0);
    assert_eq!(res.rules.target_count(&"7".into()), 1);
    assert_eq!(res.rules.target_count(&"8".into()), 1);
    // Node 9 still holds its port so nothing shifts once it becomes reachable.
    assert_eq!(res.ports.get(&"9".into()), Some(BASE + 3));
    assert!(!allow_ports(&res.rules).contains(&(BASE + 3)));
}

#[test]
fn unreachable_nodes_escalate_under_strict_policy() {
    let raw = vec![gateway(), node("9", None, Some("200::9"))];
    let options = ResolverOptions {
        unreachable_policy: UnreachablePolicy::FailWhenAllUnreachable,
        ..ResolverOptions::default()
    };
    let snapshot = load(
        &raw,
        modes(GatewayMode::DirectForward, NetworkMode::MeshOnly, false),
        &options,
    )
    .unwrap();
    let err = resolve(&snapshot, &options).unwrap_err();
    assert_eq!(
        err,
        ResolveError::Unreachable {
            nodes: vec![NodeId::from("9")],
            network_mode: NetworkMode::MeshOnly,
            policy: UnreachablePolicy::FailWhenAllUnreachable,
        }
    );
}

// ── Properties ──────────────────────────────────────────────────────

fn all_modes() -> Vec<Modes> {
    let mut out = Vec::new();
    for gateway_mode in [GatewayMode::DirectForward, GatewayMode::ReverseProxy] {
        for network_mode in [NetworkMode::MeshOnly, NetworkMode::OverlayOnly, NetworkMode::Both] {
            for disabled in [false, true] {
                out.push(modes(gateway_mode, network_mode, disabled));
            }
        }
    }
    out
}

fn mixed_topology() -> Vec<RawNode> {
    vec![
        gateway(),
        node("7", Some("10.10.0.7"), Some("200::7")),
        node("8", Some("10.10.0.8"), None),
        node("9", None, Some("200::9")),
        node("web-a", Some("10.10.0.20"), Some("200::20")),
    ]
}

#[test]
fn resolve_is_deterministic() {
    let raw = mixed_topology();
    for m in all_modes() {
        let first = run(&raw, m);
        let second = run(&raw, m);
        match (first, second) {
            (Ok(a), Ok(b)) => assert_eq!(a.document.render(), b.document.render()),
            (Err(a), Err(b)) => assert_eq!(a, b),
            _ => panic!("resolve diverged for {m:?}"),
        }
    }
}

#[test]
fn allow_list_pairs_exactly_with_exposed_ports() {
    let raw = mixed_topology();
    for m in all_modes() {
        let Ok(res) = run(&raw, m) else {
            continue;
        };
        let allowed: Vec<u16> = res.rules.allow.iter().map(|a| a.port).collect();
        let distinct: BTreeSet<u16> = allowed.iter().copied().collect();
        assert_eq!(allowed.len(), distinct.len(), "duplicate allow entry for {m:?}");
        assert_eq!(distinct, res.rules.exposed_ports(), "allow/rule mismatch for {m:?}");
    }
}

#[test]
fn direct_forward_with_forwarding_disabled_always_fails() {
    let raw = mixed_topology();
    for network_mode in [NetworkMode::MeshOnly, NetworkMode::OverlayOnly, NetworkMode::Both] {
        let err = run(&raw, modes(GatewayMode::DirectForward, network_mode, true)).unwrap_err();
        assert_eq!(
            err,
            ResolveError::Contradiction(ConfigurationContradiction::ForwardingDisabledInDirectMode)
        );
    }
}

#[test]
fn mesh_only_node_degrades_gracefully_under_both() {
    let raw = mixed_topology();
    let direct = run(&raw, modes(GatewayMode::DirectForward, NetworkMode::Both, false)).unwrap();
    let rules_for_8: Vec<_> = direct
        .rules
        .forwarding
        .iter()
        .filter(|r| r.node_id.as_str() == "8")
        .collect();
    assert_eq!(rules_for_8.len(), 1);
    assert_eq!(rules_for_8[0].target_network, PrivateNetwork::Mesh);
    assert!(direct.warnings.is_empty());

    let proxy = run(&raw, modes(GatewayMode::ReverseProxy, NetworkMode::Both, false)).unwrap();
    assert_eq!(pool_networks(&proxy.rules, "8"), vec![PrivateNetwork::Mesh]);
}

#[test]
fn ports_are_unique_across_snapshot() {
    let mut raw = vec![gateway()];
    for i in 0..200 {
        let mesh = format!("10.20.0.{}", i + 2);
        raw.push(node(&format!("n{i}"), Some(mesh.as_str()), None));
    }
    let res = run(&raw, Modes::default()).unwrap();
    let distinct: BTreeSet<u16> = res.ports.iter().map(|a| a.port).collect();
    assert_eq!(distinct.len(), 200);
}

#[test]
fn appending_node_keeps_existing_ports() {
    let before = run(&two_nodes(), Modes::default()).unwrap();
    let mut raw = two_nodes();
    raw.push(node("3", Some("10.10.0.3"), None));
    let after = run(&raw, Modes::default()).unwrap();

    for assignment in &before.ports {
        assert_eq!(after.ports.get(&assignment.node_id), Some(assignment.port));
    }
    assert_eq!(after.ports.get(&"3".into()), Some(BASE + 3));
}

#[test]
fn path_only_mode_exposes_only_listeners() {
    let res = run(
        &two_nodes(),
        modes(GatewayMode::ReverseProxy, NetworkMode::Both, true),
    )
    .unwrap();
    assert!(res.rules.forwarding.is_empty());
    assert_eq!(res.rules.pools.len(), 2);
    assert_eq!(res.rules.routes.len(), 2);
    assert_eq!(allow_ports(&res.rules), BTreeSet::from([80, 443]));
    assert!(res.document.proxy.contains("location /nodes/7/"));
    assert!(!res.document.proxy.contains(&format!("listen {};", BASE + 1)));
}

#[test]
fn direct_forward_document() {
    let res = run(
        &two_nodes(),
        modes(GatewayMode::DirectForward, NetworkMode::Both, false),
    )
    .unwrap();
    let expected = "\
# tiernet configuration document

# section: forwarding
table inet tiernet_nat {
    chain prerouting {
        type nat hook prerouting priority dstnat; policy accept;
        tcp dport 8001 dnat ip to 10.10.0.7:80 comment \"7 via mesh\"
        tcp dport 8001 dnat ip6 to [200::7]:80 comment \"7 via overlay\"
        tcp dport 8002 dnat ip to 10.10.0.8:80 comment \"8 via mesh\"
        tcp dport 8002 dnat ip6 to [200::8]:80 comment \"8 via overlay\"
    }
}

# section: proxy
# no proxy configuration

# section: firewall
ufw allow proto tcp from any to any port 8001 comment 'node 7'
ufw allow proto tcp from any to any port 8002 comment 'node 8'
";
    assert_eq!(res.document.render(), expected);
}

#[test]
fn resolution_serializes_to_json() {
    let res = run(
        &two_nodes(),
        modes(GatewayMode::ReverseProxy, NetworkMode::Both, false),
    )
    .unwrap();
    let value = serde_json::to_value(&res).unwrap();
    assert_eq!(value["modes"]["gateway_mode"], "reverse_proxy");
    assert_eq!(value["ports"][0]["port"], 8001);
    assert_eq!(value["rules"]["pools"][0]["entries"][1]["network"], "overlay");
}

#[test]
fn raw_topology_parses_from_toml() {
    #[derive(serde::Deserialize)]
    struct File {
        nodes: Vec<RawNode>,
    }
    let file: File = toml::from_str(
        r#"
        [[nodes]]
        id = "gw"
        role = "gateway"
        public_address = "203.0.113.10"

        [[nodes]]
        id = "7"
        role = "private_node"
        mesh_address = "10.10.0.7/24"
        "#,
    )
    .unwrap();
    let res = run(&file.nodes, Modes::default()).unwrap();
    assert_eq!(res.rules.forwarding.len(), 1);
}
