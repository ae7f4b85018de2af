// ── Resolve facade ──
//
// Loader → port allocator → planner → synthesizer → emitter. Every stage
// is a pure function of its input and a resolve holds no state between
// calls.

use serde::Serialize;
use tracing::info;

use crate::config::ResolverOptions;
use crate::emit::{self, ConfigurationDocument};
use crate::error::ResolveError;
use crate::loader;
use crate::model::{Modes, RawNode, RuleSet, TopologySnapshot};
use crate::planner::{self, ReachabilityPlan, Warning};
use crate::ports::{self, PortMap};
use crate::synth;

/// Everything one successful resolve produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub modes: Modes,
    pub ports: PortMap,
    pub plan: ReachabilityPlan,
    pub rules: RuleSet,
    pub warnings: Vec<Warning>,
    pub document: ConfigurationDocument,
}

impl Resolution {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Resolve a validated snapshot into rules and a configuration document.
///
/// Fatal errors abort before anything is emitted; unreachable nodes are
/// returned as warnings unless `options.unreachable_policy` escalates them.
pub fn resolve(
    snapshot: &TopologySnapshot,
    options: &ResolverOptions,
) -> Result<Resolution, ResolveError> {
    let modes = snapshot.modes();
    synth::check_modes(modes, options)?;

    let ports = ports::allocate_snapshot(snapshot, options);
    let plan = planner::plan_all(snapshot);
    planner::enforce(options.unreachable_policy, &plan, modes.network_mode)?;

    let rules = synth::synthesize(modes, &ports, &plan, options)?;
    let document = emit::emit(&rules);
    let warnings = plan.warnings.clone();

    info!(
        gateway_mode = %modes.gateway_mode,
        network_mode = %modes.network_mode,
        nodes = ports.len(),
        warnings = warnings.len(),
        "topology resolved"
    );

    Ok(Resolution {
        modes,
        ports,
        plan,
        rules,
        warnings,
        document,
    })
}

/// Validate raw records, then resolve.
pub fn load_and_resolve(
    raw: &[RawNode],
    modes: Modes,
    options: &ResolverOptions,
) -> Result<Resolution, ResolveError> {
    let snapshot = loader::load(raw, modes, options)?;
    resolve(&snapshot, options)
}
