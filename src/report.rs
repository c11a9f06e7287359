//! Output formatting for coverage results.
//!
//! Supports two output formats:
//! - Pretty: colored terminal output, one section per declaring header
//! - JSON: structured output for programmatic consumption

use colored::*;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

use crate::capabilities::CapabilityTable;
use crate::coverage::{CoverageReport, FileCoverage};

// =============================================================================
// Pretty Format
// =============================================================================

/// Render the coverage report as colored text.
pub fn render_pretty(report: &CoverageReport) -> String {
    let mut out = String::new();

    for file in &report.files {
        write_file_section(&mut out, file);
    }

    let _ = writeln!(
        out,
        "\n{} {}% ({} functions out of {} are being called)\n",
        "Total coverage:".bold(),
        report.percent,
        report.used,
        report.total
    );
    out
}

/// Print the coverage report to stdout.
pub fn write_pretty(report: &CoverageReport) {
    print!("{}", render_pretty(report));
}

fn write_file_section(out: &mut String, file: &FileCoverage) {
    let _ = writeln!(
        out,
        "\n  File {}, coverage {}% ({} out of {}):",
        base_name(&file.path).bold(),
        colored_percent(file.percent),
        file.used,
        file.total
    );

    for entry in &file.entries {
        let line = if entry.used {
            format!("✓ {}", entry.definition.display).green()
        } else {
            format!("✗ {}", entry.definition.display).red()
        };
        let _ = writeln!(out, "      {}", line);
    }
}

fn colored_percent(p: u32) -> ColoredString {
    match p {
        p if p >= 90 => p.to_string().green().bold(),
        p if p >= 50 => p.to_string().yellow(),
        _ => p.to_string().red(),
    }
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// =============================================================================
// JSON Format
// =============================================================================

#[derive(Serialize)]
struct JsonReport<'a> {
    version: &'static str,
    #[serde(flatten)]
    report: &'a CoverageReport,
}

/// Render the coverage report as pretty-printed JSON.
pub fn render_json(report: &CoverageReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonReport {
        version: env!("CARGO_PKG_VERSION"),
        report,
    })
}

/// Print the coverage report to stdout as JSON.
pub fn write_json(report: &CoverageReport) -> anyhow::Result<()> {
    println!("{}", render_json(report)?);
    Ok(())
}

// =============================================================================
// Capability table
// =============================================================================

/// Render a capability table, one class per line.
pub fn render_capabilities(table: &CapabilityTable) -> String {
    let mut out = String::new();
    for (class, caps) in table.iter() {
        let flag = |on: bool, name: &str| {
            if on {
                name.green().to_string()
            } else {
                name.dimmed().to_string()
            }
        };
        let _ = writeln!(
            out,
            "  {:<32} {} {} {}",
            class,
            flag(caps.to_string, "to_string"),
            flag(caps.indexable, "indexable"),
            flag(caps.async_initable, "async_initable"),
        );
    }
    out
}
