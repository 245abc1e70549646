//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use crate::config::{self, TerritoryConfig};
use crate::query::QueryExecutor;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Query executor (owns the store handle)
    pub executor: Arc<QueryExecutor>,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Configured territories
    pub territories: Arc<Vec<TerritoryConfig>>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        executor: Arc<QueryExecutor>,
        config: ApiConfig,
        territories: Vec<TerritoryConfig>,
    ) -> Self {
        Self {
            executor,
            config: Arc::new(config),
            territories: Arc::new(territories),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Whether the backing store answers
    pub async fn store_reachable(&self) -> bool {
        self.executor.store().has_access().await
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Time allowed to produce response headers
    pub request_timeout: Duration,
    /// Allowed CORS origins; empty allows any
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::from(&config::ApiConfig::default())
    }
}

impl From<&config::ApiConfig> for ApiConfig {
    fn from(config: &config::ApiConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            cors_origins: config.cors_origins.clone(),
        }
    }
}

impl ApiConfig {
    /// Create config with custom host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_file_config() {
        let file = config::ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 9000,
            cors_origins: vec!["http://localhost:3000".to_string()],
            request_timeout_secs: 5,
        };

        let api = ApiConfig::from(&file);
        assert_eq!(api.addr(), "127.0.0.1:9000");
        assert_eq!(api.request_timeout, Duration::from_secs(5));
        assert_eq!(api.cors_origins.len(), 1);
    }

    #[test]
    fn test_new_keeps_defaults() {
        let api = ApiConfig::new("localhost", 1234);
        assert_eq!(api.addr(), "localhost:1234");
        assert_eq!(api.request_timeout, Duration::from_secs(30));
        assert!(api.cors_origins.is_empty());
    }
}
