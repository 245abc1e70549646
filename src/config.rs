//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub harvest: HarvestConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Event store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file, or `:memory:`
    #[serde(default = "default_store_path")]
    pub path: String,

    /// Create the series tables on startup if missing
    #[serde(default = "default_create_schema")]
    pub create_schema: bool,
}

fn default_store_path() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("reporter").join("events.db").to_string_lossy().to_string())
        .unwrap_or_else(|| "./reporter_data/events.db".to_string())
}

fn default_create_schema() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            create_schema: default_create_schema(),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    2345
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Query limits
#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    /// Most windows one time series request may plan
    #[serde(default = "default_max_timeseries_windows")]
    pub max_timeseries_windows: usize,
}

fn default_max_timeseries_windows() -> usize {
    crate::query::DEFAULT_MAX_WINDOWS
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_timeseries_windows: default_max_timeseries_windows(),
        }
    }
}

/// Harvest settings the reporter exposes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HarvestConfig {
    #[serde(default)]
    pub territories: Vec<TerritoryConfig>,
}

/// One harvested territory, as listed by `/territory/list`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerritoryConfig {
    pub name: String,

    #[serde(default)]
    pub networks: Vec<String>,

    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| match e {
            ConfigError::Parse { error, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                error,
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            error: e.to_string(),
        })
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("reporter").join("config.toml")),
            Some(PathBuf::from("/etc/reporter/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("REPORTER_STORE_PATH") {
            self.store.path = path;
        }

        if let Some(host) = lookup("REPORTER_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = lookup("REPORTER_API_PORT") {
            match port.parse() {
                Ok(p) => self.api.port = p,
                Err(_) => tracing::warn!("Ignoring invalid REPORTER_API_PORT {:?}", port),
            }
        }

        if let Some(max) = lookup("REPORTER_MAX_TIMESERIES_WINDOWS") {
            match max.parse() {
                Ok(n) => self.query.max_timeseries_windows = n,
                Err(_) => tracing::warn!(
                    "Ignoring invalid REPORTER_MAX_TIMESERIES_WINDOWS {:?}",
                    max
                ),
            }
        }

        if let Some(level) = lookup("REPORTER_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("REPORTER_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Territory Reporter Configuration
#
# Environment variables override these settings:
# - REPORTER_STORE_PATH
# - REPORTER_API_HOST
# - REPORTER_API_PORT
# - REPORTER_MAX_TIMESERIES_WINDOWS
# - REPORTER_LOG_LEVEL
# - REPORTER_LOG_FORMAT

[store]
# SQLite database holding the harvested series (":memory:" for a throwaway store)
path = "~/.local/share/reporter/events.db"

# Create the series tables on startup if they are missing
create_schema = true

[api]
# API server host
host = "0.0.0.0"

# API server port
port = 2345

# Allowed CORS origins (empty allows any origin)
cors_origins = []

# Request timeout in seconds
request_timeout_secs = 30

[query]
# Most windows a single time series request may ask for
# (10080 is a week at one-minute resolution)
max_timeseries_windows = 10080

# Territories listed by /territory/list
[[harvest.territories]]
name = "example"
networks = ["twitter", "facebook"]
keywords = ["rust"]

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file path
# file = "/var/log/reporter/reporter.log"
"#
    .to_string()
}
