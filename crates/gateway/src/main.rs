use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crowd_gateway::bootstrap;
use crowd_gateway::cli::{Cli, Command, ConfigCommand};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // Default to stats when no subcommand is given.
        None => {
            init_cli_tracing();
            let (config, _) = crowd_gateway::cli::load_config()?;
            let state = bootstrap::build_app_state(Arc::new(config))?;
            crowd_gateway::cli::stats::run(&state, false)
        }
        Some(Command::Stats { json }) => {
            init_cli_tracing();
            let (config, _) = crowd_gateway::cli::load_config()?;
            let state = bootstrap::build_app_state(Arc::new(config))?;
            crowd_gateway::cli::stats::run(&state, json)
        }
        Some(Command::Doctor) => {
            init_cli_tracing();
            let (config, config_path) = crowd_gateway::cli::load_config()?;
            let state = bootstrap::state_for_diagnostics(Arc::new(config));
            let passed = crowd_gateway::cli::doctor::run(&state, &config_path)?;
            if !passed {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            let (config, config_path) = crowd_gateway::cli::load_config()?;
            let valid = crowd_gateway::cli::config::validate(&config, &config_path);
            if !valid {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _config_path) = crowd_gateway::cli::load_config()?;
            crowd_gateway::cli::config::show(&config)
        }
        Some(Command::Session { key }) => {
            init_cli_tracing();
            let (config, _) = crowd_gateway::cli::load_config()?;
            crowd_gateway::cli::session::session(Arc::new(config), key)
        }
        Some(Command::Version) => {
            println!("crowdcount {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Initialize compact stderr-only tracing for CLI commands.
///
/// Defaults to `warn` level so diagnostic output does not pollute stdout.
/// Set `RUST_LOG=crowd_domain::trace=info` to see usage and credential events.
fn init_cli_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
