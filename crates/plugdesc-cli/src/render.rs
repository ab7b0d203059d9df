//! Rendering reports for people and for tools

use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use serde::Serialize;
use std::path::Path;

use plugdesc_ast::{Diagnostic, Severity};

use crate::driver::ProcessReport;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum MessageFormat {
    /// Compiler-style lines on stderr
    #[default]
    Human,
    /// One JSON document on stdout
    Json,
}

fn severity_label(severity: Severity) -> ColoredString {
    match severity {
        Severity::Notice => "note:".cyan().bold(),
        Severity::Warning => "warning:".yellow().bold(),
        Severity::Error => "error:".red().bold(),
    }
}

/// `file:line: error: message`, followed by one indented line per cause
pub fn render_diagnostic(diagnostic: &Diagnostic) -> String {
    let mut out = String::new();
    if let Some(location) = &diagnostic.location {
        out.push_str(&format!("{}:{}: ", location.file.display(), location.line));
    }
    out.push_str(&format!(
        "{} {}",
        severity_label(diagnostic.severity),
        diagnostic.message
    ));
    for cause in &diagnostic.causes {
        out.push_str(&format!("\n  {} {}", "caused by:".dimmed(), cause));
    }
    out
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{} {}", count, word)
    } else {
        format!("{} {}s", count, word)
    }
}

/// One line describing how the run ended, e.g. `2 descriptors written in 1 round`
pub fn summary_line(report: &ProcessReport, done: &str) -> String {
    let errors = report.error_count();
    let outcome = format!(
        "{} {} in {}",
        plural(report.written.len(), "descriptor"),
        done,
        plural(report.rounds, "round")
    );
    if errors == 0 {
        outcome
    } else {
        format!("{}; {}", plural(errors, "error").red().bold(), outcome)
    }
}

/// Paths shown relative to `base` where possible
pub fn display_path(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}

#[derive(Serialize)]
struct JsonDescriptor<'a> {
    id: &'a str,
    main: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a Path>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    backend: &'a str,
    rounds: usize,
    sources: usize,
    errors: usize,
    unresolved: usize,
    descriptors: Vec<JsonDescriptor<'a>>,
    diagnostics: &'a [Diagnostic],
}

/// The report as pretty JSON; paths are left out when the output is
/// thrown away afterwards
pub fn render_json(
    report: &ProcessReport,
    include_paths: bool,
) -> Result<String, serde_json::Error> {
    let json = JsonReport {
        backend: report.backend.as_str(),
        rounds: report.rounds,
        sources: report.sources,
        errors: report.error_count(),
        unresolved: report.unresolved,
        descriptors: report
            .written
            .iter()
            .map(|w| JsonDescriptor {
                id: &w.descriptor.id,
                main: &w.descriptor.main,
                path: include_paths.then_some(w.path.as_path()),
            })
            .collect(),
        diagnostics: &report.diagnostics,
    };
    serde_json::to_string_pretty(&json)
}
