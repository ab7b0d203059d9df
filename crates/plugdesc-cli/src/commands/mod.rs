pub mod check;
pub mod config;
pub mod process;

use anyhow::{bail, Context, Result};
use clap::Args;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use plugdesc_config::{BackendChoice, ConfigOverlay, ProcessorConfig};

use crate::common::GlobalOpts;
use crate::driver::ProcessReport;
use crate::render::{render_diagnostic, render_json, summary_line, MessageFormat};
use plugdesc_ast::Severity;

/// Arguments shared by `process` and `check`
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Source roots to scan (default: the project directory)
    pub roots: Vec<PathBuf>,

    /// Compiler model to read declarations with
    #[arg(long, short = 'b')]
    pub backend: Option<BackendChoice>,

    /// Project directory holding plugdesc.toml
    #[arg(long, default_value = ".")]
    pub project: PathBuf,

    /// Upper bound on processing rounds
    #[arg(long)]
    pub max_rounds: Option<usize>,

    /// Override a config setting, e.g. --set reserved-ids=velocity,proxy
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub overrides: Vec<String>,

    #[arg(long, value_enum, default_value_t = MessageFormat::Human)]
    pub message_format: MessageFormat,
}

impl SourceArgs {
    /// Layered config with the command-line flags applied last
    pub fn load_config(&self, output_dir: Option<&Path>) -> Result<ProcessorConfig> {
        let base = ProcessorConfig::load(&self.project).with_context(|| {
            format!(
                "Failed to load configuration for {}",
                self.project.display()
            )
        })?;

        let mut overlay = ConfigOverlay::default();
        for assignment in &self.overrides {
            let Some((key, value)) = assignment.split_once('=') else {
                bail!("Expected KEY=VALUE, got '{}'", assignment);
            };
            overlay.set(key.trim(), value.trim())?;
        }
        if let Some(backend) = self.backend {
            overlay.backend = Some(backend);
        }
        if let Some(rounds) = self.max_rounds {
            overlay.max_rounds = Some(rounds);
        }
        if let Some(dir) = output_dir {
            overlay.output_dir = Some(dir.to_path_buf());
        }

        let config = base.merged(overlay);
        config.validate()?;
        Ok(config)
    }

    pub fn source_roots(&self) -> Vec<PathBuf> {
        if self.roots.is_empty() {
            vec![self.project.clone()]
        } else {
            self.roots.clone()
        }
    }
}

/// Print diagnostics and the summary; `include_paths` is false when the
/// output directory does not outlive the command
pub fn emit_report(
    report: &ProcessReport,
    format: MessageFormat,
    opts: &GlobalOpts,
    done: &str,
    include_paths: bool,
) -> Result<()> {
    match format {
        MessageFormat::Json => {
            let json = render_json(report, include_paths)?;
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", json)?;
        }
        MessageFormat::Human => {
            let mut stderr = io::stderr().lock();
            for diagnostic in &report.diagnostics {
                if opts.quiet && diagnostic.severity != Severity::Error {
                    continue;
                }
                if diagnostic.severity == Severity::Notice && opts.verbosity_level() == 0 {
                    continue;
                }
                writeln!(stderr, "{}", render_diagnostic(diagnostic))?;
            }
            if !opts.quiet {
                let mut stdout = io::stdout().lock();
                if include_paths {
                    for written in &report.written {
                        writeln!(stdout, "{}", written.path.display())?;
                    }
                }
                writeln!(stdout, "{}", summary_line(report, done))?;
            }
        }
    }
    Ok(())
}
