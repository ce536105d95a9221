//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "plain" | "text" => Ok(LogFormat::Plain),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `plain` or `json` (default: `plain`)
/// - `DATABASE_URL`: PostgreSQL connection string; unset runs in memory
/// - `AUTO_CANCEL_INTERVAL_SECS`: auto-cancel cadence (default: `120`)
/// - `ORDER_STALENESS_SECS`: age after which a pending order expires (default: `120`)
/// - `STOCK_SYNC_INTERVAL_SECS`: stock sync cadence (default: `120`)
/// - `UPSTREAM_TIMEOUT_MS`: bound on every outbound HTTP call (default: `5000`)
/// - `LEDGER_URL`, `WAREHOUSE_URL`, `SHOP_URL`: base URL of a separately
///   deployed ledger, warehouse allocator or shop; unset calls it in-process
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub auto_cancel_interval: Duration,
    pub order_staleness: Duration,
    pub stock_sync_interval: Duration,
    pub upstream_timeout: Duration,
    pub ledger_url: Option<String>,
    pub warehouse_url: Option<String>,
    pub shop_url: Option<String>,
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: env_parse("PORT").unwrap_or(defaults.port),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: env_parse("LOG_FORMAT").unwrap_or(defaults.log_format),
            database_url: env_non_empty("DATABASE_URL"),
            auto_cancel_interval: env_parse("AUTO_CANCEL_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.auto_cancel_interval),
            order_staleness: env_parse("ORDER_STALENESS_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.order_staleness),
            stock_sync_interval: env_parse("STOCK_SYNC_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.stock_sync_interval),
            upstream_timeout: env_parse("UPSTREAM_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.upstream_timeout),
            ledger_url: env_non_empty("LEDGER_URL"),
            warehouse_url: env_non_empty("WAREHOUSE_URL"),
            shop_url: env_non_empty("SHOP_URL"),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Plain,
            database_url: None,
            auto_cancel_interval: Duration::from_secs(120),
            order_staleness: Duration::from_secs(120),
            stock_sync_interval: Duration::from_secs(120),
            upstream_timeout: Duration::from_millis(5000),
            ledger_url: None,
            warehouse_url: None,
            shop_url: None,
        }
    }
}
