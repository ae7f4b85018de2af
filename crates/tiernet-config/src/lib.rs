//! Shared configuration for tiernet.
//!
//! TOML profiles, topology-file parsing, and translation to
//! `tiernet_core::ResolverOptions` / `Modes`. The CLI adds flag-aware
//! wrappers on top; core never reads files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use tiernet_core::{
    GatewayMode, Modes, NetworkMode, PortStrategy, RawNode, ResolverOptions, SourceScope,
    UnreachablePolicy,
};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found (available: {available})")]
    ProfileNotFound { name: String, available: String },

    #[error("unsupported topology file '{path}': expected a .toml or .json extension")]
    UnsupportedFormat { path: String },

    #[error("failed to parse topology file '{path}': {reason}")]
    TopologyParse { path: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Mode overrides ──────────────────────────────────────────────────

/// Partially specified operator flags. Layers stack with `over`; unset
/// fields fall through to the layer below.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ModeOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_mode: Option<GatewayMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_mode: Option<NetworkMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_forwarding_disabled: Option<bool>,
}

impl ModeOverrides {
    /// `top` wins wherever it is set.
    pub fn over(self, top: Self) -> Self {
        Self {
            gateway_mode: top.gateway_mode.or(self.gateway_mode),
            network_mode: top.network_mode.or(self.network_mode),
            port_forwarding_disabled: top
                .port_forwarding_disabled
                .or(self.port_forwarding_disabled),
        }
    }

    pub fn into_modes(self) -> Modes {
        let defaults = Modes::default();
        Modes {
            gateway_mode: self.gateway_mode.unwrap_or(defaults.gateway_mode),
            network_mode: self.network_mode.unwrap_or(defaults.network_mode),
            port_forwarding_disabled: self
                .port_forwarding_disabled
                .unwrap_or(defaults.port_forwarding_disabled),
        }
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named deployment profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

/// A named deployment profile.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Topology file used when none is given on the command line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topology: Option<PathBuf>,

    /// Operator flags for this deployment.
    #[serde(flatten)]
    pub modes: ModeOverrides,

    /// First port of the allocator range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_port: Option<u16>,

    /// Port the private nodes serve on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_port: Option<u16>,

    /// Reverse proxy listener ports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_listen_ports: Option<Vec<u16>>,

    /// Prefix for path-based routes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,

    /// "sequential" or "node_id".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_strategy: Option<PortStrategy>,

    /// "warn", "fail_when_all_unreachable", or "fail_on_any".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unreachable_policy: Option<UnreachablePolicy>,

    /// "any" or a CIDR block allowed to reach exposed ports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_source: Option<String>,
}

// ── Topology file ───────────────────────────────────────────────────

/// Node inventory written by the provisioning layer, optionally carrying
/// the mode flags for the deployment.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct TopologyFile {
    #[serde(flatten)]
    pub modes: ModeOverrides,

    #[serde(default)]
    pub nodes: Vec<RawNode>,
}

/// Read a topology file, choosing the parser by extension.
pub fn load_topology(path: &Path) -> Result<TopologyFile, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    parse_topology(path, &text)
}

/// Parse topology text; `path` only selects the format and labels errors.
pub fn parse_topology(path: &Path, text: &str) -> Result<TopologyFile, ConfigError> {
    let label = path.display().to_string();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let parsed: Result<TopologyFile, String> = match ext.as_deref() {
        Some("toml") => toml::from_str(text).map_err(|e| e.to_string()),
        Some("json") => serde_json::from_str(text).map_err(|e| e.to_string()),
        _ => return Err(ConfigError::UnsupportedFormat { path: label }),
    };

    let file = parsed.map_err(|reason| ConfigError::TopologyParse {
        path: label.clone(),
        reason,
    })?;
    debug!(path = %label, nodes = file.nodes.len(), "topology file parsed");
    Ok(file)
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "tiernet", "tiernet").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("tiernet");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config from an explicit path, layered over defaults and under
/// `TIERNET_` environment variables (`__` separates nested keys).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("TIERNET_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Profile resolution ──────────────────────────────────────────────

/// Look up a profile by name, listing the available ones on failure.
pub fn find_profile<'a>(cfg: &'a Config, name: &str) -> Result<&'a Profile, ConfigError> {
    cfg.profiles.get(name).ok_or_else(|| {
        let mut names: Vec<_> = cfg.profiles.keys().cloned().collect();
        names.sort();
        ConfigError::ProfileNotFound {
            name: name.into(),
            available: if names.is_empty() {
                "none".into()
            } else {
                names.join(", ")
            },
        }
    })
}

/// Build `ResolverOptions` from a profile alone, without CLI flag overrides.
pub fn profile_to_options(profile: &Profile) -> Result<ResolverOptions, ConfigError> {
    let defaults = ResolverOptions::default();

    let allow_source = match profile.allow_source.as_deref() {
        Some(raw) => raw
            .parse::<SourceScope>()
            .map_err(|e| ConfigError::Validation {
                field: "allow_source".into(),
                reason: e.to_string(),
            })?,
        None => defaults.allow_source,
    };

    let options = ResolverOptions {
        base_port: profile.base_port.unwrap_or(defaults.base_port),
        service_port: profile.service_port.unwrap_or(defaults.service_port),
        proxy_listen_ports: profile
            .proxy_listen_ports
            .clone()
            .unwrap_or(defaults.proxy_listen_ports),
        path_prefix: profile.path_prefix.clone().unwrap_or(defaults.path_prefix),
        port_strategy: profile.port_strategy.unwrap_or(defaults.port_strategy),
        unreachable_policy: profile
            .unreachable_policy
            .unwrap_or(defaults.unreachable_policy),
        allow_source,
    };

    if options.service_port == 0 {
        return Err(ConfigError::Validation {
            field: "service_port".into(),
            reason: "must be between 1 and 65535".into(),
        });
    }
    if options.proxy_listen_ports.contains(&0) {
        return Err(ConfigError::Validation {
            field: "proxy_listen_ports".into(),
            reason: "port 0 cannot be listened on".into(),
        });
    }

    Ok(options)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn mode_layers_prefer_top() {
        let file = ModeOverrides {
            gateway_mode: Some(GatewayMode::ReverseProxy),
            network_mode: Some(NetworkMode::MeshOnly),
            port_forwarding_disabled: None,
        };
        let flags = ModeOverrides {
            network_mode: Some(NetworkMode::Both),
            ..ModeOverrides::default()
        };
        let modes = file.over(flags).into_modes();
        assert_eq!(modes.gateway_mode, GatewayMode::ReverseProxy);
        assert_eq!(modes.network_mode, NetworkMode::Both);
        assert!(!modes.port_forwarding_disabled);
    }

    #[test]
    fn parses_toml_topology_with_modes() {
        let text = r#"
            gateway_mode = "reverse_proxy"
            network_mode = "mesh_only"

            [[nodes]]
            id = "gw"
            role = "gateway"
            public_address = "203.0.113.10"

            [[nodes]]
            id = "7"
            role = "private_node"
            mesh_address = "10.10.0.7"
            overlay_address = "200::7"
        "#;
        let file = parse_topology(Path::new("site.toml"), text).unwrap();
        assert_eq!(file.nodes.len(), 2);
        assert_eq!(file.modes.gateway_mode, Some(GatewayMode::ReverseProxy));
        assert_eq!(file.modes.network_mode, Some(NetworkMode::MeshOnly));
        assert_eq!(file.modes.port_forwarding_disabled, None);
    }

    #[test]
    fn parses_json_topology() {
        let text = r#"{"nodes":[{"id":"gw","role":"gateway","public_address":"203.0.113.10"}]}"#;
        let file = parse_topology(Path::new("site.JSON"), text).unwrap();
        assert_eq!(file.nodes[0].id, "gw");
        assert_eq!(file.modes, ModeOverrides::default());
    }

    #[test]
    fn rejects_unknown_extension() {
        let err = parse_topology(Path::new("site.yaml"), "").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat { .. }));
    }

    #[test]
    fn reports_parse_errors_with_path() {
        let err = parse_topology(Path::new("bad.toml"), "nodes = 3").unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn loads_topology_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("topology.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "[[nodes]]\nid = \"gw\"\nrole = \"gateway\"").unwrap();
        let file = load_topology(&path).unwrap();
        assert_eq!(file.nodes.len(), 1);
    }

    #[test]
    fn profile_options_fall_back_to_defaults() {
        let opts = profile_to_options(&Profile::default()).unwrap();
        assert_eq!(opts, ResolverOptions::default());
    }

    #[test]
    fn profile_options_apply_overrides() {
        let profile = Profile {
            base_port: Some(9000),
            proxy_listen_ports: Some(vec![8443]),
            port_strategy: Some(PortStrategy::NodeId),
            allow_source: Some("198.51.100.0/24".into()),
            ..Profile::default()
        };
        let opts = profile_to_options(&profile).unwrap();
        assert_eq!(opts.base_port, 9000);
        assert_eq!(opts.proxy_listen_ports, vec![8443]);
        assert_eq!(opts.port_strategy, PortStrategy::NodeId);
        assert_eq!(opts.allow_source, SourceScope::Cidr("198.51.100.0/24".into()));
    }

    #[test]
    fn profile_rejects_bad_allow_source() {
        let profile = Profile {
            allow_source: Some("everywhere".into()),
            ..Profile::default()
        };
        let err = profile_to_options(&profile).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "allow_source"));
    }

    #[test]
    fn config_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "lab".into(),
            Profile {
                topology: Some(PathBuf::from("/srv/lab.toml")),
                modes: ModeOverrides {
                    gateway_mode: Some(GatewayMode::ReverseProxy),
                    ..ModeOverrides::default()
                },
                base_port: Some(9000),
                ..Profile::default()
            },
        );
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        let lab = find_profile(&loaded, "lab").unwrap();
        assert_eq!(lab.base_port, Some(9000));
        assert_eq!(lab.modes.gateway_mode, Some(GatewayMode::ReverseProxy));
        assert!(matches!(
            find_profile(&loaded, "prod"),
            Err(ConfigError::ProfileNotFound { ref available, .. }) if available == "lab"
        ));
    }
}
