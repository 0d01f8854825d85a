//! FileVault CLI - Command-line client for a FileVault server
//!
//! Provides commands for:
//! - Synchronizing a local folder with the server
//! - Listing, uploading, downloading and deleting files
//! - Viewing storage statistics
//! - Managing the local configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    config::ConfigCommand,
    files::{DeleteCommand, DownloadCommand, ListCommand, StatsCommand, UploadCommand},
    sync::SyncCommand,
    CommandContext,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "filevault", version, about = "Command-line client for FileVault")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Push new and changed files from a local folder
    Sync(SyncCommand),
    /// List stored files
    List(ListCommand),
    /// Upload a single file
    Upload(UploadCommand),
    /// Download a file by id
    Download(DownloadCommand),
    /// Delete one or more files by id
    Delete(DeleteCommand),
    /// Show storage statistics
    Stats(StatsCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let ctx = CommandContext::new(format, cli.config);

    match cli.command {
        Commands::Sync(cmd) => cmd.execute(&ctx).await,
        Commands::List(cmd) => cmd.execute(&ctx).await,
        Commands::Upload(cmd) => cmd.execute(&ctx).await,
        Commands::Download(cmd) => cmd.execute(&ctx).await,
        Commands::Delete(cmd) => cmd.execute(&ctx).await,
        Commands::Stats(cmd) => cmd.execute(&ctx).await,
        Commands::Config(cmd) => cmd.execute(&ctx).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sync_with_flags() {
        let cli = Cli::parse_from(["filevault", "--json", "sync", "/tmp/docs", "--yes"]);
        assert!(cli.json);
        match cli.command {
            Commands::Sync(cmd) => {
                assert_eq!(cmd.dir, PathBuf::from("/tmp/docs"));
                assert!(cmd.yes);
                assert!(!cmd.dry_run);
            }
            _ => panic!("expected sync"),
        }
    }

    #[test]
    fn test_parse_global_options_after_subcommand() {
        let cli = Cli::parse_from(["filevault", "list", "-vv", "--config", "/tmp/c.yaml"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.yaml")));
        assert!(matches!(cli.command, Commands::List(_)));
    }

    #[test]
    fn test_parse_delete_many() {
        let cli = Cli::parse_from(["filevault", "delete", "a", "b", "c"]);
        match cli.command {
            Commands::Delete(cmd) => assert_eq!(cmd.ids, vec!["a", "b", "c"]),
            _ => panic!("expected delete"),
        }
    }

    #[test]
    fn test_delete_requires_an_id() {
        assert!(Cli::try_parse_from(["filevault", "delete"]).is_err());
    }

    #[test]
    fn test_download_rejects_malformed_id() {
        assert!(Cli::try_parse_from(["filevault", "download", "not-a-uuid"]).is_err());
    }

    #[test]
    fn test_parse_config_set() {
        let cli = Cli::parse_from(["filevault", "config", "set", "client.token", "abc"]);
        match cli.command {
            Commands::Config(ConfigCommand::Set { key, value }) => {
                assert_eq!(key, "client.token");
                assert_eq!(value, "abc");
            }
            _ => panic!("expected config set"),
        }
    }
}
