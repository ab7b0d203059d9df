use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;

use plugdesc::{
    commands::{
        check::{self, CheckCommand},
        config::{self, ConfigAction},
        process::{self, ProcessCommand},
    },
    logging, GlobalOpts,
};

#[derive(Parser)]
#[command(name = "plugdesc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Plugin descriptor generator",
    long_about = "plugdesc reads plugin marker annotations from Java or Kotlin sources and writes the plugin descriptor files a plugin loader expects."
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate descriptors for every annotated class
    Process(ProcessCommand),
    /// Validate annotated classes without keeping any output
    Check(CheckCommand),
    /// Inspect the effective configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,

        /// Project directory holding plugdesc.toml
        #[arg(long, default_value = ".")]
        project: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if cli.global.no_color {
        colored::control::set_override(false);
    }
    logging::init_logging(cli.global.verbosity_level());

    let result = match cli.command {
        Commands::Process(cmd) => process::handle_process(cmd, &cli.global),
        Commands::Check(cmd) => check::handle_check(cmd, &cli.global),
        Commands::Config { action, project } => {
            config::handle_config(action, &project).map(|()| true)
        }
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
