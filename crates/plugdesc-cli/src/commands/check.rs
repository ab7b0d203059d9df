use anyhow::{Context, Result};
use clap::Args;
use tempfile::TempDir;

use crate::commands::{emit_report, SourceArgs};
use crate::common::GlobalOpts;
use crate::driver;

#[derive(Args, Debug, Clone)]
pub struct CheckCommand {
    #[command(flatten)]
    pub sources: SourceArgs,
}

/// Run the full pipeline into a scratch directory that is removed afterwards
pub fn handle_check(cmd: CheckCommand, opts: &GlobalOpts) -> Result<bool> {
    let config = cmd.sources.load_config(None)?;
    let scratch = TempDir::new().context("Failed to create a scratch output directory")?;

    let report = driver::run(&config, &cmd.sources.source_roots(), scratch.path())?;
    emit_report(
        &report,
        cmd.sources.message_format,
        opts,
        "validated",
        false,
    )?;
    Ok(report.succeeded())
}
