//! pkgpress - single-flight build cache for asset packages
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use pkgpress::cli::{Cli, Commands};
use pkgpress::config::{Config, ConfigManager};
use pkgpress::error::{PkgpressError, PkgpressResult};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> PkgpressResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };

    // Find local config unless --no-local is set
    let local_config_path = if cli.no_local {
        None
    } else {
        let cwd = std::env::current_dir()
            .map_err(|e| PkgpressError::io("getting current directory", e))?;
        ConfigManager::find_local_config(&cwd)
    };

    let config = config_manager
        .load_effective(local_config_path.as_deref())
        .await?;

    init_logging(cli.verbose, &config);
    match local_config_path {
        Some(ref path) => debug!("Using local config: {}", path.display()),
        None => debug!("Using config: {}", config_manager.path().display()),
    }

    pkgpress::ui::init_theme();

    match cli.command {
        Commands::Build(args) => pkgpress::cli::commands::build(args, &config).await,
        Commands::Reset(args) => pkgpress::cli::commands::reset(args, &config).await,
        Commands::Info(args) => pkgpress::cli::commands::info(args, &config).await,
        Commands::List(args) => pkgpress::cli::commands::list(args, &config).await,
    }
}

/// 0 = warn (spinners only), 1 = info, 2+ = debug
fn init_logging(verbose: u8, config: &Config) {
    let filter = match verbose {
        0 => EnvFilter::new("pkgpress=warn"),
        1 => EnvFilter::new("pkgpress=info"),
        _ => EnvFilter::new("pkgpress=debug"),
    };

    if config.general.log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
            .init();
    }
}
