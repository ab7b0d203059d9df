use anyhow::{anyhow, Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::io::{self, Write};
use std::path::Path;

use plugdesc_config::{user_config_path, ProcessorConfig, PROJECT_CONFIG_FILE};

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print where configuration is read from
    Path,
    /// Print a single setting
    Get { key: String },
}

fn load(project: &Path) -> Result<ProcessorConfig> {
    ProcessorConfig::load(project)
        .with_context(|| format!("Failed to load configuration for {}", project.display()))
}

pub fn handle_config(action: ConfigAction, project: &Path) -> Result<()> {
    let mut stdout = io::stdout().lock();
    match action {
        ConfigAction::Show => {
            let config = load(project)?;
            write!(stdout, "{}", config.to_toml()?)?;
        }
        ConfigAction::Path => {
            let project_file = project.join(PROJECT_CONFIG_FILE);
            match user_config_path() {
                Some(user) => writeln!(stdout, "{} {}", "user".cyan(), describe(&user))?,
                None => writeln!(stdout, "{} (no home directory)", "user".cyan())?,
            }
            writeln!(stdout, "{} {}", "project".cyan(), describe(&project_file))?;
        }
        ConfigAction::Get { key } => {
            let config = load(project)?;
            let value = config
                .get(&key)
                .ok_or_else(|| anyhow!("Unknown or unset config key '{}'", key))?;
            writeln!(stdout, "{}", value)?;
        }
    }
    Ok(())
}

fn describe(path: &Path) -> String {
    if path.exists() {
        path.display().to_string()
    } else {
        format!("{} (not found)", path.display())
    }
}
