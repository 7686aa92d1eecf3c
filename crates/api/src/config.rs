//! Application configuration loaded from environment variables.

use std::time::Duration;

use sales::{CoordinatorConfig, RetryPolicy};

use crate::auth::Credentials;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: PostgreSQL URL; unset means the in-memory store
/// - `DB_MAX_CONNECTIONS`: pool size (default: `10`)
/// - `API_USER` / `API_PASSWORD`: Basic credentials for `/api/*`; both must be set
/// - `SALE_TIMEOUT_MS`: deadline per sale submission (default: `5000`)
/// - `SALE_MAX_RETRIES`: retries after a transient failure (default: `3`)
/// - `SALE_RETRY_BASE_MS`: first backoff delay (default: `50`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub credentials: Option<Credentials>,
    pub sale_timeout: Duration,
    pub sale_max_retries: usize,
    pub sale_retry_base: Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let parsed = |key: &str| non_empty(key).and_then(|v| v.trim().parse::<u64>().ok());

        let credentials = match (non_empty("API_USER"), non_empty("API_PASSWORD")) {
            (Some(user), Some(password)) => Some(Credentials::new(user, password)),
            _ => None,
        };

        Self {
            host: non_empty("HOST").unwrap_or(defaults.host),
            port: non_empty("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: non_empty("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match non_empty("LOG_FORMAT") {
                Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
            database_url: non_empty("DATABASE_URL"),
            db_max_connections: non_empty("DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.db_max_connections),
            credentials,
            sale_timeout: parsed("SALE_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.sale_timeout),
            sale_max_retries: parsed("SALE_MAX_RETRIES")
                .map(|n| n as usize)
                .unwrap_or(defaults.sale_max_retries),
            sale_retry_base: parsed("SALE_RETRY_BASE_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.sale_retry_base),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Deadline and backoff for the sale coordinator.
    pub fn coordinator(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            timeout: self.sale_timeout,
            retry: RetryPolicy::exponential(self.sale_max_retries, self.sale_retry_base),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            db_max_connections: 10,
            credentials: None,
            sale_timeout: Duration::from_millis(5000),
            sale_max_retries: 3,
            sale_retry_base: Duration::from_millis(50),
        }
    }
}
