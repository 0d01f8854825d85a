//! Configuration module for FileVault.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.
//! The server reads `server`, `storage` and `uploads`; the CLI reads `client`;
//! both read `logging`.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for FileVault.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub uploads: UploadsConfig,
    pub client: ClientConfig,
    pub logging: LoggingConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address the API listens on, e.g. `127.0.0.1:8080`.
    pub bind_address: String,
}

/// Where blobs and metadata live on the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory holding one sub-directory per owner.
    pub root: PathBuf,
    /// Path to the SQLite metadata database.
    pub database: PathBuf,
}

/// Server-side upload rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadsConfig {
    /// Largest accepted file (in MiB).
    pub max_file_size_mb: u64,
    /// Accepted extensions without dot. Empty accepts every type.
    #[serde(default)]
    pub allowed_types: Vec<String>,
}

/// Sync client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the FileVault server.
    pub server_url: String,
    /// Bearer token issued by `filevaultd add-user`.
    #[serde(default)]
    pub token: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Local files above this size (in MiB) are skipped by `sync`.
    pub max_file_size_mb: u64,
    /// Extensions `sync` considers, lowercase and without dot.
    pub allowed_extensions: Vec<String>,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

const MIB: u64 = 1024 * 1024;

impl UploadsConfig {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(MIB)
    }
}

impl ClientConfig {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(MIB)
    }
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    ///
    /// Missing sections take their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Serialize to YAML and write to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/filevault/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("filevault")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("filevault")
}

/// Extensions the sync client looks at when none are configured.
pub const DEFAULT_CLIENT_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "txt", "md", "pdf", "doc", "docx", "py", "c", "cpp", "cs",
    "js", "html", "css", "zip", "rar", "7z",
];

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            root: data_dir.join("blobs"),
            database: data_dir.join("filevault.db"),
        }
    }
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 50,
            allowed_types: Vec::new(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080".to_string(),
            token: None,
            timeout_secs: 60,
            max_file_size_mb: 50,
            allowed_extensions: DEFAULT_CLIENT_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"client.timeout_secs"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- server ---
        if self.server.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError {
                field: "server.bind_address".into(),
                message: format!(
                    "invalid socket address '{}'; expected host:port",
                    self.server.bind_address
                ),
            });
        }

        // --- storage ---
        if self.storage.root.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.root".into(),
                message: "must not be empty".into(),
            });
        }
        if self.storage.database.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.database".into(),
                message: "must not be empty".into(),
            });
        }

        // --- uploads ---
        if self.uploads.max_file_size_mb == 0 {
            errors.push(ValidationError {
                field: "uploads.max_file_size_mb".into(),
                message: "must be greater than 0".into(),
            });
        }
        check_extensions(
            "uploads.allowed_types",
            &self.uploads.allowed_types,
            &mut errors,
        );

        // --- client ---
        match url::Url::parse(&self.client.server_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(ValidationError {
                field: "client.server_url".into(),
                message: format!("unsupported scheme '{}'; use http or https", url.scheme()),
            }),
            Err(e) => errors.push(ValidationError {
                field: "client.server_url".into(),
                message: format!("invalid URL '{}': {}", self.client.server_url, e),
            }),
        }
        if self.client.timeout_secs == 0 {
            errors.push(ValidationError {
                field: "client.timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.client.max_file_size_mb == 0 {
            errors.push(ValidationError {
                field: "client.max_file_size_mb".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.client.allowed_extensions.is_empty() {
            errors.push(ValidationError {
                field: "client.allowed_extensions".into(),
                message: "must list at least one extension".into(),
            });
        }
        check_extensions(
            "client.allowed_extensions",
            &self.client.allowed_extensions,
            &mut errors,
        );

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

fn check_extensions(field: &str, extensions: &[String], errors: &mut Vec<ValidationError>) {
    for ext in extensions {
        if ext.is_empty() || ext.contains(['.', '/', '\\']) || ext.chars().any(char::is_whitespace)
        {
            errors.push(ValidationError {
                field: field.into(),
                message: format!("invalid extension '{ext}'; use bare names like 'txt'"),
            });
        }
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use filevault_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .storage_root(PathBuf::from("/srv/filevault/blobs"))
///     .uploads_max_file_size_mb(100)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- server ---

    pub fn server_bind_address(mut self, address: impl Into<String>) -> Self {
        self.config.server.bind_address = address.into();
        self
    }

    // --- storage ---

    pub fn storage_root(mut self, root: PathBuf) -> Self {
        self.config.storage.root = root;
        self
    }

    pub fn storage_database(mut self, database: PathBuf) -> Self {
        self.config.storage.database = database;
        self
    }

    // --- uploads ---

    pub fn uploads_max_file_size_mb(mut self, mb: u64) -> Self {
        self.config.uploads.max_file_size_mb = mb;
        self
    }

    pub fn uploads_allowed_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.uploads.allowed_types = types.into_iter().map(Into::into).collect();
        self
    }

    // --- client ---

    pub fn client_server_url(mut self, url: impl Into<String>) -> Self {
        self.config.client.server_url = url.into();
        self
    }

    pub fn client_token(mut self, token: impl Into<String>) -> Self {
        self.config.client.token = Some(token.into());
        self
    }

    pub fn client_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.client.timeout_secs = seconds;
        self
    }

    pub fn client_max_file_size_mb(mut self, mb: u64) -> Self {
        self.config.client.max_file_size_mb = mb;
        self
    }

    pub fn client_allowed_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.client.allowed_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
