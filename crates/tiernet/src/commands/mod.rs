//! Command dispatch: bridges CLI args -> resolver stages -> output formatting.

pub mod config_cmd;
pub mod plan;
pub mod ports;
pub mod resolve;
pub mod validate;

use crate::cli::{Command, GlobalOpts};
use crate::config::Config;
use crate::error::CliError;

/// Dispatch a topology command to the appropriate handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts, config: &Config) -> Result<(), CliError> {
    match cmd {
        Command::Resolve(args) => resolve::handle(&args, global, config).await,
        Command::Validate(args) => validate::handle(&args, global, config),
        Command::Ports(args) => ports::handle(&args, global, config),
        Command::Plan(args) => plan::handle(&args, global, config),
        Command::Config(args) => config_cmd::handle(args, global, config),
        // Completions are handled before dispatch
        Command::Completions(_) => unreachable!(),
    }
}
