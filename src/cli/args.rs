//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// pkgpress - build combined asset packages once, serve them from cache
///
/// Packages are combined (and compressed by an external program) at most
/// once across all processes sharing a runtime directory.
#[derive(Parser, Debug)]
#[command(name = "pkgpress")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "PKGPRESS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip local pkgpress.toml discovery
    #[arg(long, global = true)]
    pub no_local: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a package now, replacing any cached build
    Build(BuildArgs),

    /// Remove cached builds and their files
    Reset(ResetArgs),

    /// Show cached build details
    Info(InfoArgs),

    /// List packages with a cached build
    List(ListArgs),
}

/// Arguments for the build command
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Package to build (all configured packages when omitted)
    pub key: Option<String>,
}

/// Arguments for the reset command
#[derive(Parser, Debug)]
pub struct ResetArgs {
    /// Package to reset (all packages when omitted)
    pub key: Option<String>,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the info command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Package to describe (all built packages when omitted)
    pub key: Option<String>,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: DetailFormat,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Output format for list command
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Output format for info command
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DetailFormat {
    /// Human-readable listing
    Table,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_build_all() {
        let cli = Cli::parse_from(["pkgpress", "build"]);
        match cli.command {
            Commands::Build(args) => assert!(args.key.is_none()),
            _ => panic!("expected Build command"),
        }
    }

    #[test]
    fn cli_parses_reset_with_key() {
        let cli = Cli::parse_from(["pkgpress", "reset", "app", "--yes"]);
        match cli.command {
            Commands::Reset(args) => {
                assert_eq!(args.key.as_deref(), Some("app"));
                assert!(args.yes);
            }
            _ => panic!("expected Reset command"),
        }
    }

    #[test]
    fn cli_parses_info_json() {
        let cli = Cli::parse_from(["pkgpress", "info", "app", "--format", "json"]);
        match cli.command {
            Commands::Info(args) => {
                assert_eq!(args.key.as_deref(), Some("app"));
                assert!(matches!(args.format, DetailFormat::Json));
            }
            _ => panic!("expected Info command"),
        }
    }

    #[test]
    fn cli_rejects_plain_info() {
        assert!(Cli::try_parse_from(["pkgpress", "info", "--format", "plain"]).is_err());
    }

    #[test]
    fn cli_global_flags() {
        let cli = Cli::parse_from([
            "pkgpress",
            "list",
            "-vv",
            "--no-local",
            "--config",
            "/etc/pkgpress.toml",
        ]);
        assert_eq!(cli.verbose, 2);
        assert!(cli.no_local);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/pkgpress.toml")));
        assert!(matches!(
            cli.command,
            Commands::List(ListArgs {
                format: OutputFormat::Table
            })
        ));
    }
}
