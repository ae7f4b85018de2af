//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one line per item.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use tiernet_core::Warning;

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

/// Format, color and quiet settings shared by every command.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub format: OutputFormat,
    pub color: bool,
    pub quiet: bool,
}

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stderr().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Print resolve warnings to stderr. Warnings are shown even with `--quiet`.
pub fn print_warnings(warnings: &[Warning], color: bool) {
    let mut stderr = io::stderr().lock();
    for warning in warnings {
        let label = if color {
            "warning".yellow().bold().to_string()
        } else {
            "warning".to_owned()
        };
        let _ = writeln!(stderr, "{label}: {warning}");
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact` / `yaml`: serializes the original data
/// - `plain`: calls `line_fn` on each item
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    line_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Plain => Ok(data.iter().map(&line_fn).collect::<Vec<_>>().join("\n")),
        structured => render_structured(structured, data),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table and plain output come from `text_fn`; there is no tabular view of
/// a single item.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    text_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table | OutputFormat::Plain => Ok(text_fn(data)),
        structured => render_structured(structured, data),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_structured<T: serde::Serialize + ?Sized>(
    format: OutputFormat,
    data: &T,
) -> Result<String, CliError> {
    let rendered = match format {
        OutputFormat::JsonCompact => serde_json::to_string(data).map_err(|e| e.to_string()),
        OutputFormat::Yaml => serde_yaml::to_string(data).map_err(|e| e.to_string()),
        _ => serde_json::to_string_pretty(data).map_err(|e| e.to_string()),
    };
    rendered.map_err(CliError::Serialization)
}
