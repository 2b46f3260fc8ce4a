//! Output formatting for CLI commands.
//!
//! Every printer supports human-readable text and JSON (`--json`).
//!
//! Submodules:
//! - [`color`]: semantic color helpers
//! - [`paths`]: single-line rendering of resolved dependency paths

pub mod color;
pub mod paths;

use crate::domain::{Component, Coordinate, Occurrence, OccurrenceId, Resolution};
use crate::engine::ScanReport;
use serde::Serialize;
use std::env;
use std::io::{self, Write};

pub use color::{error, info, success, warning};
pub use paths::format_path;

use color::{bold, colorize_severity, dimmed};

/// Configuration for output formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    /// Whether to use ASCII-only connectors instead of Unicode.
    pub use_ascii: bool,
    /// Whether to use colors in output.
    pub use_colors: bool,
}

impl OutputConfig {
    /// Create a new OutputConfig with explicit values.
    pub fn new(use_ascii: bool, use_colors: bool) -> Self {
        Self {
            use_ascii,
            use_colors,
        }
    }

    /// Create an OutputConfig by reading from environment variables.
    ///
    /// Reads:
    /// - `DEPCHAIN_ASCII`: "1" or "true" for ASCII connectors (default: false)
    /// - `NO_COLOR`: any value disables colors
    /// - `DEPCHAIN_COLOR`: "0" or "false" disables colors (default: true)
    pub fn from_env() -> Self {
        let use_ascii = match env::var("DEPCHAIN_ASCII") {
            Ok(v) if v == "1" || v.eq_ignore_ascii_case("true") => true,
            Ok(v) if v == "0" || v.eq_ignore_ascii_case("false") || v.is_empty() => false,
            Ok(v) => {
                tracing::warn!(
                    env_var = "DEPCHAIN_ASCII",
                    value = %v,
                    "Invalid value (expected '1', 'true', '0', or 'false'), using default"
                );
                false
            }
            Err(_) => false,
        };

        // https://no-color.org/
        let use_colors = env::var("NO_COLOR").is_err()
            && env::var("DEPCHAIN_COLOR")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true);

        Self {
            use_ascii,
            use_colors,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::new(false, true)
    }
}

/// Output mode for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable text format
    Text,
    /// JSON format for programmatic use
    Json,
}

/// An occurrence together with the coordinate it was registered under
#[derive(Debug, Clone, Serialize)]
pub struct OccurrenceRow {
    /// Component name
    pub name: String,
    /// Component version
    pub version: String,
    /// The stored occurrence
    #[serde(flatten)]
    pub occurrence: Occurrence,
}

impl OccurrenceRow {
    /// Pair an occurrence with its coordinate
    pub fn new(occurrence: Occurrence, coordinate: Coordinate) -> Self {
        Self {
            name: coordinate.name,
            version: coordinate.version,
            occurrence,
        }
    }
}

/// Print any serializable value as pretty JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_json(&mut handle, value)
}

fn write_json<W: Write, T: Serialize + ?Sized>(w: &mut W, value: &T) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *w, value).map_err(io::Error::other)?;
    writeln!(w)
}

/// Print the dependency paths to an occurrence
pub fn print_resolution(resolution: &Resolution, mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match mode {
        OutputMode::Text => paths::write_resolution(&mut handle, resolution, &OutputConfig::from_env()),
        OutputMode::Json => write_json(&mut handle, resolution),
    }
}

/// Print an occurrence listing
pub fn print_occurrences(rows: &[OccurrenceRow], mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match mode {
        OutputMode::Text => write_occurrences_text(&mut handle, rows, &OutputConfig::from_env()),
        OutputMode::Json => write_json(&mut handle, rows),
    }
}

fn write_occurrences_text<W: Write>(
    w: &mut W,
    rows: &[OccurrenceRow],
    config: &OutputConfig,
) -> io::Result<()> {
    if rows.is_empty() {
        writeln!(w, "No occurrences found.")?;
        return Ok(());
    }

    for row in rows {
        let o = &row.occurrence;
        let mut line = format!(
            "{:>6}  {}@{}",
            info(&o.id.to_string(), config),
            bold(&row.name, config),
            row.version
        );
        if let Some(pm) = &o.metadata.package_manager {
            line.push_str(&format!("  {}", dimmed(pm, config)));
        }
        let licenses: Vec<&str> = o
            .metadata
            .licenses
            .iter()
            .map(|l| l.spdx_identifier.as_str())
            .collect();
        line.push_str(&format!(
            "  {}",
            dimmed(
                &if licenses.is_empty() {
                    "unknown".to_string()
                } else {
                    licenses.join(",")
                },
                config
            )
        ));
        if let Some(severity) = o.metadata.highest_severity {
            line.push_str(&format!("  {}", colorize_severity(severity, config)));
        }
        writeln!(w, "{line}")?;
    }
    writeln!(w, "\n{} occurrence(s)", rows.len())
}

/// Print a component search result
pub fn print_components(components: &[Component], mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let config = OutputConfig::from_env();

    match mode {
        OutputMode::Json => write_json(&mut handle, components),
        OutputMode::Text => {
            if components.is_empty() {
                return writeln!(handle, "No components found.");
            }
            for c in components {
                let kind = format!("{:?}/{:?}", c.purl_type, c.component_type).to_lowercase();
                writeln!(
                    handle,
                    "{:>6}  {}  {}",
                    info(&c.id.to_string(), &config),
                    bold(&c.name, &config),
                    dimmed(&kind, &config)
                )?;
            }
            Ok(())
        }
    }
}

/// Print the outcome of an ingest
pub fn print_scan_report(report: &ScanReport, mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    match mode {
        OutputMode::Json => write_json(
            &mut handle,
            &serde_json::json!({
                "occurrences": report.occurrences.iter().map(|o| o.id).collect::<Vec<_>>(),
                "closure_rows": report.closure_rows,
            }),
        ),
        OutputMode::Text => {
            let config = OutputConfig::from_env();
            writeln!(
                handle,
                "{} {} occurrence(s), {} closure row(s) written",
                success("Ingested", &config),
                report.occurrences.len(),
                report.closure_rows
            )
        }
    }
}

/// Print the answer to a reachability query
pub fn print_reachability(
    ancestor: OccurrenceId,
    descendant: OccurrenceId,
    distance: Option<u32>,
    mode: OutputMode,
) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    match mode {
        OutputMode::Json => write_json(
            &mut handle,
            &serde_json::json!({
                "ancestor": ancestor,
                "descendant": descendant,
                "path_length": distance,
            }),
        ),
        OutputMode::Text => {
            let config = OutputConfig::from_env();
            match distance {
                Some(n) => writeln!(
                    handle,
                    "{} is an ancestor of {} ({n} hop(s))",
                    info(&ancestor.to_string(), &config),
                    info(&descendant.to_string(), &config)
                ),
                None => writeln!(
                    handle,
                    "No recorded path from {ancestor} to {descendant} (unknown beyond the depth bound)"
                ),
            }
        }
    }
}
