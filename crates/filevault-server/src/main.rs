//! FileVault Server - `filevaultd`
//!
//! Serves the HTTP API and administers users:
//!
//! - `filevaultd serve` (default) opens the database and blob root, then
//!   serves until SIGTERM/SIGINT
//! - `filevaultd add-user <name>` registers a user and prints its token once
//!
//! Shutdown is driven by a `CancellationToken` cancelled from the signal
//! handler; axum finishes in-flight requests before the pool is closed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use filevault_cache::{pool::DatabasePool, SqliteMetadataStore, SqliteUserDirectory};
use filevault_core::config::Config;
use filevault_core::domain::User;
use filevault_core::ports::IUserDirectory;
use filevault_core::usecases::{FileService, UploadPolicy};
use filevault_server::{create_router, AppState};
use filevault_store::FsBlobStore;

// ============================================================================
// Command line
// ============================================================================

#[derive(Parser)]
#[command(name = "filevaultd")]
#[command(author, version, about = "FileVault HTTP API server")]
struct Cli {
    /// Path to the config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API (default)
    Serve {
        /// Override server.bind_address
        #[arg(long)]
        bind: Option<String>,
    },
    /// Register a user and print its API token
    AddUser {
        /// Unique user name
        username: String,
    },
}

// ============================================================================
// Startup
// ============================================================================

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load_or_default(&Config::default_path()),
    };

    let errors = config.validate();
    if !errors.is_empty() {
        let details: Vec<String> = errors
            .iter()
            .map(ToString::to_string)
            .collect();
        anyhow::bail!("Invalid configuration: {}", details.join("; "));
    }
    Ok(config)
}

fn init_tracing(level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();
}

async fn open_database(config: &Config) -> Result<DatabasePool> {
    let db_path = &config.storage.database;
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    DatabasePool::new(db_path)
        .await
        .with_context(|| format!("Failed to open database at {}", db_path.display()))
}

// ============================================================================
// Commands
// ============================================================================

async fn serve(config: Config, bind: Option<String>) -> Result<()> {
    let db = open_database(&config).await?;

    let blobs = FsBlobStore::new(config.storage.root.clone());
    blobs
        .ensure_root()
        .await
        .context("Failed to prepare blob storage root")?;

    let users: Arc<dyn IUserDirectory> =
        Arc::new(SqliteUserDirectory::new(db.pool().clone()));
    let files = FileService::new(
        Arc::new(blobs),
        Arc::new(SqliteMetadataStore::new(db.pool().clone())),
        users.clone(),
        UploadPolicy::from_config(&config.uploads),
    );
    let app = create_router(AppState::new(Arc::new(files), users));

    let bind_address = bind.unwrap_or_else(|| config.server.bind_address.clone());
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;
    info!(
        address = %bind_address,
        storage_root = %config.storage.root.display(),
        max_file_size_mb = config.uploads.max_file_size_mb,
        "FileVault server listening"
    );

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("Server error");

    db.close().await;
    result
}

async fn add_user(config: Config, username: String) -> Result<()> {
    let db = open_database(&config).await?;
    let users = SqliteUserDirectory::new(db.pool().clone());
    let result = register_user(&users, username).await;
    db.close().await;

    let (user, token) = result?;
    info!(user = %user.username(), id = %user.id(), "User registered");

    println!("User:  {}", user.username());
    println!("Id:    {}", user.id());
    println!("Token: {token}");
    println!();
    println!("Store the token now; it cannot be shown again.");
    Ok(())
}

/// Registers `username`, refusing names that are already taken
async fn register_user(users: &SqliteUserDirectory, username: String) -> Result<(User, String)> {
    let user = User::new(username).context("Invalid user name")?;
    if let Some(existing) = users
        .find_by_username(user.username())
        .await
        .context("Failed to look up user")?
    {
        anyhow::bail!(
            "User '{}' already exists (id {}); pick another name",
            existing.username(),
            existing.id()
        );
    }

    let token = users
        .register(&user)
        .await
        .context("Failed to register user")?;
    Ok((user, token))
}

// ============================================================================
// Graceful shutdown
// ============================================================================

/// Waits for SIGTERM or SIGINT and cancels `token`
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

// ============================================================================
// Main entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = load_config(cli.config.as_deref());
    let level = loaded
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_tracing(&level);
    let config = loaded?;

    match cli.command.unwrap_or(Commands::Serve { bind: None }) {
        Commands::Serve { bind } => {
            let result = serve(config, bind).await;
            match &result {
                Ok(()) => info!("FileVault server shut down gracefully"),
                Err(e) => error!(error = %format!("{e:#}"), "FileVault server exiting with error"),
            }
            result
        }
        Commands::AddUser { username } => add_user(config, username).await,
    }
}
