//! Config command - View and manage FileVault configuration
//!
//! Provides the `filevault config` CLI command which:
//! 1. Shows the current configuration (YAML or JSON)
//! 2. Writes a default configuration file
//! 3. Sets individual configuration values via dot-notation keys
//! 4. Validates the configuration file and reports errors

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use filevault_core::config::Config;

use super::CommandContext;
use crate::output::plural;

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "client.server_url")
        key: String,
        /// New value
        value: String,
    },
    /// Validate configuration file
    Validate,
}

impl ConfigCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(ctx),
            ConfigCommand::Init { force } => self.execute_init(ctx, *force),
            ConfigCommand::Set { key, value } => self.execute_set(ctx, key, value),
            ConfigCommand::Validate => self.execute_validate(ctx),
        }
    }

    fn execute_show(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let mut config = ctx.load_config()?;
        if config.client.token.is_some() {
            config.client.token = Some("********".to_string());
        }

        info!(config_path = %ctx.config_path.display(), "Showing configuration");

        if ctx.is_json() {
            let json = serde_json::to_value(&config)
                .context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
        } else {
            formatter.success(&format!("Configuration ({})", ctx.config_path.display()));
            formatter.info("");

            let yaml = serde_yaml::to_string(&config)
                .context("Failed to serialize configuration to YAML")?;
            for line in yaml.lines() {
                formatter.info(line);
            }
        }
        Ok(())
    }

    fn execute_init(&self, ctx: &CommandContext, force: bool) -> Result<()> {
        let formatter = ctx.formatter();
        let path = &ctx.config_path;

        if path.exists() && !force {
            anyhow::bail!(
                "{} already exists; use --force to overwrite it",
                path.display()
            );
        }

        Config::default()
            .save(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(config_path = %path.display(), "Wrote default configuration");

        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "config_path": path.display().to_string(),
            }));
        } else {
            formatter.success(&format!("Wrote {}", path.display()));
            formatter.info("Set your token with 'filevault config set client.token <token>'");
        }
        Ok(())
    }

    fn execute_set(&self, ctx: &CommandContext, key: &str, value: &str) -> Result<()> {
        let formatter = ctx.formatter();
        let mut config = ctx.load_config()?;

        info!(key = %key, "Setting configuration value");

        if let Err(e) = apply_config_value(&mut config, key, value) {
            if ctx.is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "error": e.to_string(),
                }));
            } else {
                formatter.error(&format!("Failed to set '{key}': {e}"));
                formatter.info("");
                formatter.info("Supported keys:");
                for (name, help) in SUPPORTED_KEYS {
                    formatter.info(&format!("  {name:<28} - {help}"));
                }
            }
            return Ok(());
        }

        let errors: Vec<String> = config
            .validate()
            .iter()
            .filter(|e| e.field == key)
            .map(|e| e.message.clone())
            .collect();
        if !errors.is_empty() {
            if ctx.is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "errors": errors,
                }));
            } else {
                formatter.error(&format!("Invalid value for '{key}': {}", errors.join("; ")));
            }
            return Ok(());
        }

        config
            .save(&ctx.config_path)
            .context("Failed to write configuration file")?;

        let shown = if key == "client.token" { "********" } else { value };
        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "key": key,
                "value": shown,
                "config_path": ctx.config_path.display().to_string(),
            }));
        } else {
            formatter.success(&format!("Set {key} = {shown}"));
            formatter.info(&format!("Saved to {}", ctx.config_path.display()));
        }
        Ok(())
    }

    fn execute_validate(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let path = &ctx.config_path;

        let config = match Config::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                let message = if path.exists() {
                    format!("Failed to parse configuration: {e}")
                } else {
                    "Configuration file not found. Using defaults.".to_string()
                };
                if ctx.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "valid": false,
                        "config_path": path.display().to_string(),
                        "errors": [message],
                    }));
                } else {
                    formatter.error(&message);
                    formatter.info(&format!("File: {}", path.display()));
                }
                return Ok(());
            }
        };

        info!(config_path = %path.display(), "Validating configuration");
        let errors = config.validate();

        if ctx.is_json() {
            let error_strings: Vec<String> = errors.iter().map(ToString::to_string).collect();
            formatter.print_json(&serde_json::json!({
                "valid": errors.is_empty(),
                "config_path": path.display().to_string(),
                "errors": error_strings,
            }));
        } else if errors.is_empty() {
            formatter.success("Configuration is valid");
            formatter.info(&format!("File: {}", path.display()));
        } else {
            formatter.error(&format!(
                "Configuration has {} error{}:",
                errors.len(),
                plural(errors.len())
            ));
            formatter.info(&format!("File: {}", path.display()));
            formatter.info("");
            for error in &errors {
                formatter.info(&format!("  {} - {}", error.field, error.message));
            }
        }
        Ok(())
    }
}

const SUPPORTED_KEYS: &[(&str, &str)] = &[
    ("server.bind_address", "host:port the server listens on"),
    ("storage.root", "Blob storage directory"),
    ("storage.database", "SQLite database file"),
    ("uploads.max_file_size_mb", "Largest accepted upload (MiB)"),
    ("uploads.allowed_types", "Comma-separated extensions"),
    ("client.server_url", "Base URL of the server"),
    ("client.token", "API token (empty or 'none' clears it)"),
    ("client.timeout_secs", "Request timeout in seconds"),
    ("client.max_file_size_mb", "Largest file sync will push (MiB)"),
    ("client.allowed_extensions", "Comma-separated extensions"),
    ("logging.level", "trace|debug|info|warn|error"),
];

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().trim_start_matches('.').to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Apply a dot-notation key/value pair to a Config struct
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "server.bind_address" => {
            config.server.bind_address = value.to_string();
        }

        "storage.root" => {
            config.storage.root = PathBuf::from(value);
        }
        "storage.database" => {
            config.storage.database = PathBuf::from(value);
        }

        "uploads.max_file_size_mb" => {
            config.uploads.max_file_size_mb = value
                .parse::<u64>()
                .context("Expected a positive integer for uploads.max_file_size_mb")?;
        }
        "uploads.allowed_types" => {
            config.uploads.allowed_types = parse_list(value);
        }

        "client.server_url" => {
            config.client.server_url = value.to_string();
        }
        "client.token" => {
            config.client.token = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.to_string())
            };
        }
        "client.timeout_secs" => {
            config.client.timeout_secs = value
                .parse::<u64>()
                .context("Expected a positive integer for client.timeout_secs")?;
        }
        "client.max_file_size_mb" => {
            config.client.max_file_size_mb = value
                .parse::<u64>()
                .context("Expected a positive integer for client.max_file_size_mb")?;
        }
        "client.allowed_extensions" => {
            config.client.allowed_extensions = parse_list(value);
        }

        "logging.level" => {
            config.logging.level = value.to_string();
        }

        _ => {
            anyhow::bail!("Unknown configuration key: '{}'", key);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;

    #[test]
    fn test_apply_server_url() {
        let mut config = Config::default();
        apply_config_value(&mut config, "client.server_url", "https://files.example.com").unwrap();
        assert_eq!(config.client.server_url, "https://files.example.com");
    }

    #[test]
    fn test_apply_token_and_clear() {
        let mut config = Config::default();
        apply_config_value(&mut config, "client.token", "abc123").unwrap();
        assert_eq!(config.client.token.as_deref(), Some("abc123"));

        apply_config_value(&mut config, "client.token", "none").unwrap();
        assert_eq!(config.client.token, None);
    }

    #[test]
    fn test_apply_storage_paths() {
        let mut config = Config::default();
        apply_config_value(&mut config, "storage.root", "/srv/blobs").unwrap();
        apply_config_value(&mut config, "storage.database", "/srv/meta.db").unwrap();
        assert_eq!(config.storage.root, PathBuf::from("/srv/blobs"));
        assert_eq!(config.storage.database, PathBuf::from("/srv/meta.db"));
    }

    #[test]
    fn test_apply_numeric_keys() {
        let mut config = Config::default();
        apply_config_value(&mut config, "uploads.max_file_size_mb", "50").unwrap();
        apply_config_value(&mut config, "client.timeout_secs", "10").unwrap();
        apply_config_value(&mut config, "client.max_file_size_mb", "25").unwrap();
        assert_eq!(config.uploads.max_file_size_mb, 50);
        assert_eq!(config.client.timeout_secs, 10);
        assert_eq!(config.client.max_file_size_mb, 25);
    }

    #[test]
    fn test_apply_extension_lists() {
        let mut config = Config::default();
        apply_config_value(&mut config, "client.allowed_extensions", "TXT, .md,,pdf").unwrap();
        assert_eq!(config.client.allowed_extensions, vec!["txt", "md", "pdf"]);

        apply_config_value(&mut config, "uploads.allowed_types", "png").unwrap();
        assert_eq!(config.uploads.allowed_types, vec!["png"]);
    }

    #[test]
    fn test_apply_logging_level() {
        let mut config = Config::default();
        apply_config_value(&mut config, "logging.level", "debug").unwrap();
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_apply_unknown_key_fails() {
        let mut config = Config::default();
        assert!(apply_config_value(&mut config, "sync.root", "/tmp").is_err());
    }

    #[test]
    fn test_apply_negative_number_fails() {
        let mut config = Config::default();
        assert!(apply_config_value(&mut config, "client.timeout_secs", "-5").is_err());
    }

    #[tokio::test]
    async fn test_init_then_set_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let ctx = CommandContext::new(OutputFormat::Json, Some(path.clone()));

        ConfigCommand::Init { force: false }.execute(&ctx).await.unwrap();
        assert!(path.exists());
        assert!(ConfigCommand::Init { force: false }.execute(&ctx).await.is_err());

        ConfigCommand::Set {
            key: "client.server_url".to_string(),
            value: "https://vault.example.com".to_string(),
        }
        .execute(&ctx)
        .await
        .unwrap();

        let saved = Config::load(&path).unwrap();
        assert_eq!(saved.client.server_url, "https://vault.example.com");
    }

    #[tokio::test]
    async fn test_set_rejects_invalid_value_without_saving() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let ctx = CommandContext::new(OutputFormat::Json, Some(path.clone()));
        ConfigCommand::Init { force: false }.execute(&ctx).await.unwrap();

        ConfigCommand::Set {
            key: "client.server_url".to_string(),
            value: "ftp://vault.example.com".to_string(),
        }
        .execute(&ctx)
        .await
        .unwrap();

        let saved = Config::load(&path).unwrap();
        assert_eq!(saved.client.server_url, Config::default().client.server_url);
    }

    #[test]
    fn test_supported_keys_are_applicable() {
        for (key, _) in SUPPORTED_KEYS {
            let mut config = Config::default();
            let value = if key.ends_with("_mb") || key.ends_with("_secs") { "1" } else { "x" };
            assert!(apply_config_value(&mut config, key, value).is_ok(), "{key}");
        }
    }
}
