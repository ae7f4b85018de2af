//! Emitter: projects a [`RuleSet`] into the text the gateway applies.
//!
//! Three sections: an nftables NAT table for direct forwarding, an nginx
//! `http` block for the reverse proxy, and `ufw` commands for the
//! allow-list. Rendering is a pure, order-preserving function of the rule
//! set, so identical input always yields byte-identical output.

use std::fmt::Write;
use std::net::IpAddr;

use serde::Serialize;

use crate::model::{AllowReason, FirewallAllowEntry, ForwardingRule, RuleSet, SourceScope};

const NAT_TABLE: &str = "tiernet_nat";

/// Rendered configuration for the gateway node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigurationDocument {
    pub forwarding: String,
    pub proxy: String,
    pub firewall: String,
}

impl ConfigurationDocument {
    /// Full document with fixed section headers.
    pub fn render(&self) -> String {
        let mut out = String::from("# tiernet configuration document\n");
        for (name, body) in [
            ("forwarding", &self.forwarding),
            ("proxy", &self.proxy),
            ("firewall", &self.firewall),
        ] {
            let _ = writeln!(out, "\n# section: {name}");
            out.push_str(body);
        }
        out
    }
}

/// Serialize a rule set into a configuration document.
pub fn emit(rules: &RuleSet) -> ConfigurationDocument {
    ConfigurationDocument {
        forwarding: render_forwarding(&rules.forwarding),
        proxy: render_proxy(rules),
        firewall: render_firewall(&rules.allow),
    }
}

fn socket(address: IpAddr, port: u16) -> String {
    match address {
        IpAddr::V4(v4) => format!("{v4}:{port}"),
        IpAddr::V6(v6) => format!("[{v6}]:{port}"),
    }
}

// ── nftables ────────────────────────────────────────────────────────

fn render_forwarding(rules: &[ForwardingRule]) -> String {
    if rules.is_empty() {
        return "# no forwarding rules\n".into();
    }

    let mut out = String::new();
    let _ = writeln!(out, "table inet {NAT_TABLE} {{");
    let _ = writeln!(out, "    chain prerouting {{");
    let _ = writeln!(
        out,
        "        type nat hook prerouting priority dstnat; policy accept;"
    );
    for rule in rules {
        let family = if rule.target_address.is_ipv4() { "ip" } else { "ip6" };
        let _ = writeln!(
            out,
            "        tcp dport {} dnat {family} to {} comment \"{} via {}\"",
            rule.public_port,
            socket(rule.target_address, rule.target_port),
            rule.node_id,
            rule.target_network,
        );
    }
    let _ = writeln!(out, "    }}");
    let _ = writeln!(out, "}}");
    out
}

// ── nginx ───────────────────────────────────────────────────────────

fn render_proxy(rules: &RuleSet) -> String {
    if rules.proxy_listeners.is_empty() && rules.pools.is_empty() {
        return "# no proxy configuration\n".into();
    }

    let mut blocks: Vec<String> = Vec::new();

    for pool in &rules.pools {
        let mut block = format!("upstream {} {{\n", pool.pool_id);
        for entry in &pool.entries {
            let _ = writeln!(
                block,
                "    server {}; # {}",
                socket(entry.address, entry.port),
                entry.network
            );
        }
        block.push_str("}\n");
        blocks.push(block);
    }

    if !rules.proxy_listeners.is_empty() {
        let mut block = String::from("server {\n");
        for port in &rules.proxy_listeners {
            let _ = writeln!(block, "    listen {port};");
        }
        for route in &rules.routes {
            let _ = writeln!(block, "    location {} {{", route.path);
            let _ = writeln!(block, "        proxy_pass http://{}/;", route.pool_id);
            let _ = writeln!(block, "    }}");
        }
        block.push_str("}\n");
        blocks.push(block);
    }

    for pool in &rules.pools {
        let Some(port) = pool.listen_port else {
            continue;
        };
        blocks.push(format!(
            "server {{\n    listen {port};\n    location / {{\n        proxy_pass http://{};\n    }}\n}}\n",
            pool.pool_id
        ));
    }

    blocks.join("\n")
}

// ── ufw ─────────────────────────────────────────────────────────────

fn render_firewall(allow: &[FirewallAllowEntry]) -> String {
    if allow.is_empty() {
        return "# no allow entries\n".into();
    }

    let mut out = String::new();
    for entry in allow {
        let from = match &entry.source_scope {
            SourceScope::Any => "any",
            SourceScope::Cidr(cidr) => cidr.as_str(),
        };
        let comment = match &entry.reason {
            AllowReason::ProxyListener => "proxy listener".to_owned(),
            AllowReason::NodePort(id) => format!("node {id}"),
        };
        let _ = writeln!(
            out,
            "ufw allow proto {} from {from} to any port {} comment '{comment}'",
            entry.protocol, entry.port
        );
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{PathRoute, PoolEntry, PrivateNetwork, Protocol, UpstreamPool};
    use pretty_assertions::assert_eq;

    fn proxy_rules() -> RuleSet {
        RuleSet {
            forwarding: Vec::new(),
            pools: vec![UpstreamPool {
                pool_id: "node_7".into(),
                node_id: "7".into(),
                listen_port: Some(8001),
                entries: vec![
                    PoolEntry {
                        address: "10.10.0.7".parse().unwrap(),
                        network: PrivateNetwork::Mesh,
                        port: 80,
                    },
                    PoolEntry {
                        address: "200::7".parse().unwrap(),
                        network: PrivateNetwork::Overlay,
                        port: 80,
                    },
                ],
            }],
            routes: vec![PathRoute {
                path: "/nodes/7/".into(),
                pool_id: "node_7".into(),
            }],
            proxy_listeners: vec![80],
            allow: vec![
                FirewallAllowEntry {
                    protocol: Protocol::Tcp,
                    port: 80,
                    source_scope: SourceScope::Any,
                    reason: AllowReason::ProxyListener,
                },
                FirewallAllowEntry {
                    protocol: Protocol::Tcp,
                    port: 8001,
                    source_scope: SourceScope::Cidr("198.51.100.0/24".into()),
                    reason: AllowReason::NodePort("7".into()),
                },
            ],
        }
    }

    #[test]
    fn renders_proxy_section() {
        let doc = emit(&proxy_rules());
        let expected = "\
upstream node_7 {
    server 10.10.0.7:80; # mesh
    server [200::7]:80; # overlay
}

server {
    listen 80;
    location /nodes/7/ {
        proxy_pass http://node_7/;
    }
}

server {
    listen 8001;
    location / {
        proxy_pass http://node_7;
    }
}
";
        assert_eq!(doc.proxy, expected);
        assert_eq!(doc.forwarding, "# no forwarding rules\n");
    }

    #[test]
    fn renders_firewall_section() {
        let doc = emit(&proxy_rules());
        assert_eq!(
            doc.firewall,
            "ufw allow proto tcp from any to any port 80 comment 'proxy listener'\n\
             ufw allow proto tcp from 198.51.100.0/24 to any port 8001 comment 'node 7'\n"
        );
    }

    #[test]
    fn renders_forwarding_section() {
        let rules = RuleSet {
            forwarding: vec![
                ForwardingRule {
                    node_id: "7".into(),
                    public_port: 8001,
                    target_address: "10.10.0.7".parse().unwrap(),
                    target_network: PrivateNetwork::Mesh,
                    target_port: 80,
                },
                ForwardingRule {
                    node_id: "7".into(),
                    public_port: 8001,
                    target_address: "200::7".parse().unwrap(),
                    target_network: PrivateNetwork::Overlay,
                    target_port: 80,
                },
            ],
            ..RuleSet::default()
        };
        let doc = emit(&rules);
        let expected = "\
table inet tiernet_nat {
    chain prerouting {
        type nat hook prerouting priority dstnat; policy accept;
        tcp dport 8001 dnat ip to 10.10.0.7:80 comment \"7 via mesh\"
        tcp dport 8001 dnat ip6 to [200::7]:80 comment \"7 via overlay\"
    }
}
";
        assert_eq!(doc.forwarding, expected);
        assert_eq!(doc.proxy, "# no proxy configuration\n");
        assert_eq!(doc.firewall, "# no allow entries\n");
    }

    #[test]
    fn render_joins_sections_with_headers() {
        let doc = emit(&RuleSet::default());
        assert_eq!(
            doc.render(),
            "# tiernet configuration document\n\
             \n# section: forwarding\n# no forwarding rules\n\
             \n# section: proxy\n# no proxy configuration\n\
             \n# section: firewall\n# no allow entries\n"
        );
    }

    #[test]
    fn emit_is_deterministic() {
        let rules = proxy_rules();
        assert_eq!(emit(&rules).render(), emit(&rules).render());
    }
}
