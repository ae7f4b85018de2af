//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Table view of the config: the TOML as it would be written.
fn format_config(cfg: &Config) -> String {
    toml::to_string_pretty(cfg)
        .map(|text| text.trim_end().to_owned())
        .unwrap_or_else(|e| format!("# failed to render config: {e}"))
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    let out = config::output_settings(global, cfg);

    match args.command {
        // ── Init: starter file with one profile ─────────────────────
        ConfigCommand::Init { topology, force } => {
            let path = config::config_path();
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }

            let profile_name = global.profile.clone().unwrap_or_else(|| "default".into());
            let mut fresh = Config {
                default_profile: Some(profile_name.clone()),
                ..Config::default()
            };
            fresh.profiles.insert(
                profile_name.clone(),
                Profile {
                    topology,
                    modes: config::flag_modes(global),
                    base_port: global.base_port,
                    ..Profile::default()
                },
            );

            let written = config::save_config(&fresh)?;
            if !out.quiet {
                eprintln!("✓ Wrote profile '{profile_name}' to {}", written.display());
            }
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let text = output::render_single(out.format, cfg, format_config)?;
            output::print_output(&text, out.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), out.quiet);
            Ok(())
        }
    }
}
