//! dispatch-platform command line
//!
//! Starts the built-in modules against an in-memory command table and
//! prints operator views of the platform.
//!
//! ```bash
//! dispatch-platform --config platform.toml status
//! dispatch-platform commands
//! dispatch-platform breakers
//! dispatch-platform check-config --config platform.toml
//! dispatch-platform run
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use dispatch_platform::config::PlatformConfig;
use dispatch_platform::module::{builtin, CommandTable, ModuleManager};
use dispatch_platform::utils::env::ENV_CONFIG_PATH;
use dispatch_platform::utils::{env_opt, init_logging_from_config, wait_for_shutdown_signal};

/// Module lifecycle and resiliency platform
#[derive(Parser, Debug)]
#[command(name = "dispatch-platform")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (TOML, or JSON by extension); falls back to DISPATCH_CONFIG
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, overrides the configured one (RUST_LOG still wins)
    #[arg(long, global = true)]
    log_filter: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the modules and print their status as JSON
    Status,
    /// Start the modules and print the bound command table as JSON
    Commands,
    /// Print circuit breaker states for the known services as JSON
    Breakers,
    /// Load and validate the configuration, then exit
    CheckConfig,
    /// Start the modules and keep running until SIGTERM or Ctrl+C
    Run,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.clone())?;
    config.apply_env_overrides();
    if let Some(filter) = cli.log_filter.clone() {
        config.logging.filter = Some(filter);
    }
    init_logging_from_config(&config.logging);
    config.validate().context("Invalid configuration")?;

    let breakers = Arc::new(config.breaker_registry());

    if let Commands::CheckConfig = cli.command {
        println!("Configuration OK");
        return Ok(());
    }

    if let Commands::Breakers = cli.command {
        breakers.messaging();
        breakers.payments();
        breakers.database();
        println!("{}", serde_json::to_string_pretty(&breakers.all_states())?);
        return Ok(());
    }

    let mut manager =
        ModuleManager::with_host_version(config.modules.clone(), config.host_version.clone());
    let mut table = CommandTable::new();

    let startup = manager
        .startup(&builtin::catalog(Arc::clone(&breakers)), &mut table)
        .await;

    let result = match startup {
        Ok(report) => {
            info!(
                "Startup complete: {} discovered, {} enabled",
                report.discovery.discovered,
                report.enablement.succeeded.len()
            );
            match cli.command {
                Commands::Status => print_json(&manager.get_status().await),
                Commands::Commands => print_json(&table),
                Commands::Run => {
                    info!("Running; press Ctrl+C to stop");
                    wait_for_shutdown_signal().await;
                    Ok(())
                }
                Commands::Breakers | Commands::CheckConfig => Ok(()),
            }
        }
        Err(e) => Err(anyhow::Error::new(e).context("Module startup failed")),
    };

    let shutdown = manager.shutdown_all().await;
    if !shutdown.failed.is_empty() {
        warn!("{} modules reported shutdown errors", shutdown.failed.len());
    }

    result
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<PlatformConfig> {
    match path.or_else(|| env_opt(ENV_CONFIG_PATH).map(PathBuf::from)) {
        Some(path) => PlatformConfig::from_file(&path),
        None => Ok(PlatformConfig::default()),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
