use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use tracing::debug;

use crate::commands::{emit_report, SourceArgs};
use crate::common::GlobalOpts;
use crate::driver;

/// Output directory used when neither `--out` nor the config names one
pub const DEFAULT_OUTPUT_DIR: &str = "build/plugdesc";

#[derive(Args, Debug, Clone)]
pub struct ProcessCommand {
    #[command(flatten)]
    pub sources: SourceArgs,

    /// Directory that receives the descriptors
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
}

/// Returns whether the run finished without error diagnostics
pub fn handle_process(cmd: ProcessCommand, opts: &GlobalOpts) -> Result<bool> {
    let config = cmd.sources.load_config(cmd.out.as_deref())?;
    // --out is relative to the working directory, the config value to the project
    let output_dir = match (&cmd.out, &config.output_dir) {
        (Some(dir), _) => dir.clone(),
        (None, Some(dir)) => cmd.sources.project.join(dir),
        (None, None) => cmd.sources.project.join(DEFAULT_OUTPUT_DIR),
    };
    debug!(
        "Processing with the {} backend into {:?}",
        config.backend, output_dir
    );

    let report = driver::run(&config, &cmd.sources.source_roots(), &output_dir)?;
    emit_report(&report, cmd.sources.message_format, opts, "written", true)?;
    Ok(report.succeeded())
}
