//! CLI command implementations

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::info;

use relock_core::{ConfigurationSnapshot, PreferencesError, MAX_READING};

use crate::report::EvaluationReport;

/// Relock CLI - re-authentication gating policy tools
#[derive(Parser)]
#[command(name = "relock")]
#[command(about = "Inspect relock preferences and replay gating decisions")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the preferences file
    #[arg(long, global = true, env = "RELOCK_PREFERENCES")]
    pub preferences: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write default preferences
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the loaded preferences
    Show,

    /// Replay a scenario and print the policy's decisions
    Evaluate {
        /// Active accounts
        #[arg(long, default_value_t = 1)]
        accounts: usize,

        /// Seconds spent inactive; omit for an app that never went inactive
        #[arg(long)]
        inactive_for: Option<f64>,

        /// A biometric prompt is showing
        #[arg(long)]
        biometric_prompt: bool,
    },
}

/// Error type for CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Preferences error: {0}")]
    Preferences(#[from] PreferencesError),

    #[error("Preferences already exist at {0} (use --force to overwrite)")]
    AlreadyExists(PathBuf),

    #[error("Invalid inactivity duration: {0}")]
    InvalidDuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Cli {
    /// Preferences path from the flag, the environment, or the data dir
    pub fn preferences_path(&self) -> Result<PathBuf, CliError> {
        match &self.preferences {
            Some(path) => Ok(path.clone()),
            None => Ok(ConfigurationSnapshot::default_path()?),
        }
    }
}

/// Parse fractional seconds into a duration no longer than the clock can hold
pub fn parse_inactivity(secs: f64) -> Result<Duration, CliError> {
    let duration = Duration::try_from_secs_f64(secs)
        .map_err(|e| CliError::InvalidDuration(format!("{secs}: {e}")))?;

    if duration > MAX_READING {
        return Err(CliError::InvalidDuration(format!(
            "{secs}: exceeds the longest trackable period of {}s",
            MAX_READING.as_secs()
        )));
    }

    Ok(duration)
}

/// Run the CLI
pub fn run(cli: Cli) -> Result<(), CliError> {
    let path = cli.preferences_path()?;

    match cli.command {
        Commands::Init { force } => {
            if path.exists() && !force {
                return Err(CliError::AlreadyExists(path));
            }
            ConfigurationSnapshot::default().save(&path)?;
            info!("Wrote default preferences to {:?}", path);
            println!("Preferences written to {}", path.display());
        }

        Commands::Show => {
            let prefs = ConfigurationSnapshot::load(&path)?;
            println!("{}", serde_json::to_string_pretty(&prefs)?);
        }

        Commands::Evaluate {
            accounts,
            inactive_for,
            biometric_prompt,
        } => {
            let prefs = ConfigurationSnapshot::load(&path)?;
            let inactive_for = inactive_for.map(parse_inactivity).transpose()?;

            let report = EvaluationReport::replay(prefs, accounts, inactive_for, biometric_prompt);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
