//! `tiernet validate`: run the loader and report every issue at once.

use serde::Serialize;

use tiernet_core::{Modes, load};

use crate::cli::{GlobalOpts, TopologyArgs};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct Report {
    topology: String,
    gateway: String,
    private_nodes: usize,
    modes: Modes,
}

pub fn handle(args: &TopologyArgs, global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    let out = config::output_settings(global, cfg);
    let input = config::load_input(args.topology.as_deref(), global, cfg)?;
    let snapshot = load(&input.nodes, input.modes, &input.options)?;

    let report = Report {
        topology: input.path.display().to_string(),
        gateway: snapshot
            .gateway()
            .map(|g| g.id.to_string())
            .unwrap_or_default(),
        private_nodes: snapshot.private_nodes().count(),
        modes: snapshot.modes(),
    };

    let text = output::render_single(out.format, &report, |r| {
        format!(
            "{}: ok (gateway '{}', {} private node(s), {} / {})",
            r.topology, r.gateway, r.private_nodes, r.modes.gateway_mode, r.modes.network_mode
        )
    })?;
    output::print_output(&text, out.quiet);
    Ok(())
}
