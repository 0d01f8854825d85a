//! Subcommands of `filevault`
//!
//! Every command receives a [`CommandContext`] carrying the output format
//! and the config file chosen with `--config`.

pub mod config;
pub mod files;
pub mod sync;

use std::path::PathBuf;

use anyhow::{Context, Result};

use filevault_client::ApiClient;
use filevault_core::config::Config;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Global options shared by all commands
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub format: OutputFormat,
    pub config_path: PathBuf,
    /// Whether the path came from `--config` (a missing file is then an error)
    pub explicit_config: bool,
}

impl CommandContext {
    pub fn new(format: OutputFormat, config: Option<PathBuf>) -> Self {
        match config {
            Some(path) => Self {
                format,
                config_path: path,
                explicit_config: true,
            },
            None => Self {
                format,
                config_path: Config::default_path(),
                explicit_config: false,
            },
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.format)
    }

    /// Loads the config file, falling back to defaults unless `--config`
    /// named it explicitly
    pub fn load_config(&self) -> Result<Config> {
        if self.explicit_config {
            Config::load(&self.config_path).with_context(|| {
                format!("Failed to load config from {}", self.config_path.display())
            })
        } else {
            Ok(Config::load_or_default(&self.config_path))
        }
    }

    /// Builds an API client from the `client` section
    pub fn client(&self, config: &Config) -> Result<ApiClient> {
        ApiClient::from_config(&config.client).with_context(|| {
            format!(
                "Invalid client settings in {}",
                self.config_path.display()
            )
        })
    }
}
