pub mod config;
pub mod doctor;
pub mod session;
pub mod stats;

use clap::{Parser, Subcommand};

/// API quota and credential management for the crowd-counting app.
#[derive(Debug, Parser)]
#[command(name = "crowdcount", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print today's API usage (default when no subcommand is given).
    Stats {
        /// Output as JSON instead of plain text.
        #[arg(long)]
        json: bool,
    },
    /// Run diagnostic checks against the current configuration.
    Doctor,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Open an interactive session that makes quota-guarded calls.
    Session {
        /// Session key to start with.
        #[arg(long, default_value = "cli")]
        key: String,
    },
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path specified by `CROWDCOUNT_CONFIG`
/// (or `config.toml` by default).  Returns the parsed config and the path
/// that was used.  A missing file means all defaults.
pub fn load_config() -> anyhow::Result<(crowd_domain::config::Config, String)> {
    let config_path =
        std::env::var("CROWDCOUNT_CONFIG").unwrap_or_else(|_| "config.toml".into());
    let config = load_config_from(&config_path)?;
    Ok((config, config_path))
}

pub fn load_config_from(config_path: &str) -> anyhow::Result<crowd_domain::config::Config> {
    if !std::path::Path::new(config_path).exists() {
        return Ok(crowd_domain::config::Config::default());
    }
    let raw = std::fs::read_to_string(config_path)
        .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
    toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))
}
