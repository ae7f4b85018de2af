//! `tiernet resolve`: run every stage and print the configuration document.

use tracing::info;

use tiernet_core::load_and_resolve;

use crate::cli::{GlobalOpts, ResolveArgs};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

pub async fn handle(args: &ResolveArgs, global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    let out = config::output_settings(global, cfg);
    let input = config::load_input(args.input.topology.as_deref(), global, cfg)?;

    let resolution = load_and_resolve(&input.nodes, input.modes, &input.options)?;
    output::print_warnings(&resolution.warnings, out.color);
    if args.deny_warnings && resolution.has_warnings() {
        return Err(CliError::WarningsDenied {
            count: resolution.warnings.len(),
        });
    }

    let rendered = resolution.document.render();
    if let Some(ref path) = args.write {
        tokio::fs::write(path, &rendered).await?;
        info!(path = %path.display(), bytes = rendered.len(), "document written");
    }

    let text = output::render_single(out.format, &resolution, |_| {
        rendered.trim_end().to_owned()
    })?;
    output::print_output(&text, out.quiet);
    Ok(())
}
