//! CLI configuration: thin wrapper around `tiernet_config` shared types.
//!
//! Re-exports the shared types and adds CLI-specific resolution that
//! respects `GlobalOpts` flag overrides (--gateway-mode, --base-port, etc.).

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use tracing::debug;

use tiernet_core::{GatewayMode, Modes, NetworkMode, RawNode, ResolverOptions};

use crate::cli::{ColorMode, GatewayModeArg, GlobalOpts, NetworkModeArg, OutputFormat};
use crate::error::CliError;
use crate::output::{self, Output};

// ── Re-exports from shared crate ────────────────────────────────────

pub use tiernet_config::{
    Config, ModeOverrides, Profile, config_path, find_profile, load_config, load_topology,
    profile_to_options, save_config,
};

/// Everything a topology command needs: parsed nodes plus layered settings.
#[derive(Debug)]
pub struct Input {
    pub path: PathBuf,
    pub nodes: Vec<RawNode>,
    pub modes: Modes,
    pub options: ResolverOptions,
}

// ── Flag translation ────────────────────────────────────────────────

impl From<GatewayModeArg> for GatewayMode {
    fn from(arg: GatewayModeArg) -> Self {
        match arg {
            GatewayModeArg::DirectForward => Self::DirectForward,
            GatewayModeArg::ReverseProxy => Self::ReverseProxy,
        }
    }
}

impl From<NetworkModeArg> for NetworkMode {
    fn from(arg: NetworkModeArg) -> Self {
        match arg {
            NetworkModeArg::MeshOnly => Self::MeshOnly,
            NetworkModeArg::OverlayOnly => Self::OverlayOnly,
            NetworkModeArg::Both => Self::Both,
        }
    }
}

/// Mode flags given on the command line; unset flags stay `None`.
pub fn flag_modes(global: &GlobalOpts) -> ModeOverrides {
    ModeOverrides {
        gateway_mode: global.gateway_mode.map(Into::into),
        network_mode: global.network_mode.map(Into::into),
        port_forwarding_disabled: match (global.no_port_forwarding, global.port_forwarding) {
            (true, _) => Some(true),
            (false, true) => Some(false),
            (false, false) => None,
        },
    }
}

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// The active profile. An explicitly requested profile must exist; a
/// missing default profile falls back to built-in defaults.
pub fn active_profile(global: &GlobalOpts, config: &Config) -> Result<Profile, CliError> {
    let name = active_profile_name(global, config);
    match find_profile(config, &name) {
        Ok(profile) => Ok(profile.clone()),
        Err(err) if global.profile.is_some() => Err(err.into()),
        Err(_) => {
            debug!(profile = %name, "profile not configured, using defaults");
            Ok(Profile::default())
        }
    }
}

/// Output settings: flag > config `[defaults]` > table / auto.
pub fn output_settings(global: &GlobalOpts, config: &Config) -> Output {
    let format = global
        .output
        .or_else(|| OutputFormat::from_str(&config.defaults.output, true).ok())
        .unwrap_or(OutputFormat::Table);
    let color = global
        .color
        .or_else(|| ColorMode::from_str(&config.defaults.color, true).ok())
        .unwrap_or(ColorMode::Auto);

    Output {
        format,
        color: output::should_color(color),
        quiet: global.quiet,
    }
}

/// Translate a `Profile` + global flags into `ResolverOptions`.
///
/// CLI flag overrides take priority over profile values.
pub fn resolve_options(profile: &Profile, global: &GlobalOpts) -> Result<ResolverOptions, CliError> {
    let mut options = profile_to_options(profile)?;
    if let Some(base_port) = global.base_port {
        options.base_port = base_port;
    }
    Ok(options)
}

/// Load the topology named on the command line (or by the profile) and
/// layer modes: topology file < profile < flags.
pub fn load_input(
    topology: Option<&Path>,
    global: &GlobalOpts,
    config: &Config,
) -> Result<Input, CliError> {
    let profile = active_profile(global, config)?;

    let path = topology
        .map(Path::to_path_buf)
        .or_else(|| profile.topology.clone())
        .ok_or_else(|| CliError::NoTopology {
            profile: active_profile_name(global, config),
        })?;

    let file = load_topology(&path)?;
    let modes = file
        .modes
        .over(profile.modes)
        .over(flag_modes(global))
        .into_modes();
    let options = resolve_options(&profile, global)?;

    debug!(
        path = %path.display(),
        nodes = file.nodes.len(),
        gateway_mode = %modes.gateway_mode,
        network_mode = %modes.network_mode,
        "input loaded"
    );

    Ok(Input {
        path,
        nodes: file.nodes,
        modes,
        options,
    })
}
