//! `tiernet plan`: reachability per private node.

use tabled::Tabled;

use tiernet_core::{NodePlan, load, planner, ports};

use crate::cli::{GlobalOpts, TopologyArgs};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "Node")]
    node: String,
    #[tabled(rename = "Port")]
    port: String,
    #[tabled(rename = "Targets")]
    targets: String,
    #[tabled(rename = "Reachable")]
    reachable: &'static str,
}

fn targets(plan: &NodePlan) -> String {
    if plan.targets.is_empty() {
        return "-".into();
    }
    plan.targets
        .iter()
        .map(|t| format!("{} {}", t.network, t.address))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn handle(args: &TopologyArgs, global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    let out = config::output_settings(global, cfg);
    let input = config::load_input(args.topology.as_deref(), global, cfg)?;
    let snapshot = load(&input.nodes, input.modes, &input.options)?;

    let port_map = ports::allocate_snapshot(&snapshot, &input.options);
    let plan = planner::plan_all(&snapshot);
    output::print_warnings(&plan.warnings, out.color);

    let text = output::render_list(
        out.format,
        &plan.nodes,
        |p| PlanRow {
            node: p.node_id.to_string(),
            port: port_map
                .get(&p.node_id)
                .map_or_else(|| "-".into(), |port| port.to_string()),
            targets: targets(p),
            reachable: if p.is_reachable() { "yes" } else { "no" },
        },
        |p| format!("{} {}", p.node_id, targets(p)),
    )?;
    output::print_output(&text, out.quiet);

    planner::enforce(
        input.options.unreachable_policy,
        &plan,
        snapshot.modes().network_mode,
    )?;
    Ok(())
}
