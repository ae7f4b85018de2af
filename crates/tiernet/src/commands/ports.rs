//! `tiernet ports`: public port per private node.

use tabled::Tabled;

use tiernet_core::{PortAssignment, load, ports};

use crate::cli::{GlobalOpts, TopologyArgs};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct PortRow {
    #[tabled(rename = "Node")]
    node: String,
    #[tabled(rename = "Port")]
    port: u16,
}

fn row(a: &PortAssignment) -> PortRow {
    PortRow {
        node: a.node_id.to_string(),
        port: a.port,
    }
}

pub fn handle(args: &TopologyArgs, global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    let out = config::output_settings(global, cfg);
    let input = config::load_input(args.topology.as_deref(), global, cfg)?;
    let snapshot = load(&input.nodes, input.modes, &input.options)?;
    let map = ports::allocate_snapshot(&snapshot, &input.options);

    let text = output::render_list(out.format, map.as_slice(), row, |a| {
        format!("{} {}", a.node_id, a.port)
    })?;
    output::print_output(&text, out.quiet);
    Ok(())
}
