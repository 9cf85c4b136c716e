//! Configuration module for stockchat.

use serde::Deserialize;
use std::path::Path;

use crate::{ChatError, Result};

/// Placeholder substituted with the stock symbol in the quote API URL.
pub const SYMBOL_PLACEHOLDER: &str = "{symbol}";

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Whether to serve static files.
    #[serde(default)]
    pub serve_static: bool,
    /// Path to static files directory.
    #[serde(default = "default_static_path")]
    pub static_path: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_static_path() -> String {
    "web/static".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
            serve_static: false,
            static_path: default_static_path(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/stockchat.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Queue backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueBackend {
    /// NATS JetStream broker.
    Nats,
    /// In-process queues (single process only).
    Memory,
}

/// Queue transport configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Backend to use.
    #[serde(default = "default_queue_backend")]
    pub backend: QueueBackend,
    /// Broker URL.
    #[serde(default = "default_queue_url")]
    pub url: String,
    /// Broker user (empty for anonymous).
    #[serde(default)]
    pub user: String,
    /// Broker password.
    #[serde(default)]
    pub password: String,
    /// Queue carrying stock quote requests.
    #[serde(default = "default_request_queue")]
    pub request_queue: String,
    /// Queue carrying stock quote results.
    #[serde(default = "default_result_queue")]
    pub result_queue: String,
    /// Durable consumer name shared by all consumers of a queue.
    #[serde(default = "default_consumer_group")]
    pub consumer_group: String,
    /// Publish acknowledgement timeout in seconds.
    #[serde(default = "default_publish_timeout")]
    pub publish_timeout_secs: u64,
}

fn default_queue_backend() -> QueueBackend {
    QueueBackend::Nats
}

fn default_queue_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_request_queue() -> String {
    "stock_requests".to_string()
}

fn default_result_queue() -> String {
    "stock_results".to_string()
}

fn default_consumer_group() -> String {
    "stock_bots".to_string()
}

fn default_publish_timeout() -> u64 {
    5
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            backend: default_queue_backend(),
            url: default_queue_url(),
            user: String::new(),
            password: String::new(),
            request_queue: default_request_queue(),
            result_queue: default_result_queue(),
            consumer_group: default_consumer_group(),
            publish_timeout_secs: default_publish_timeout(),
        }
    }
}

/// Quote lookup configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteConfig {
    /// URL template; `{symbol}` is replaced with the requested symbol.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Total request timeout in seconds.
    #[serde(default = "default_quote_timeout")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://stooq.com/q/l/?s={symbol}&f=sd2t2ohlcv&h&e=csv".to_string()
}

fn default_quote_timeout() -> u64 {
    10
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_secs: default_quote_timeout(),
        }
    }
}

/// Room hub configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    /// Maximum time a single delivery may take before the connection is evicted.
    #[serde(default = "default_send_timeout")]
    pub send_timeout_ms: u64,
    /// Capacity of each connection's outbound buffer.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
    /// Number of recent messages replayed on join.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_send_timeout() -> u64 {
    500
}

fn default_outbound_buffer() -> usize {
    64
}

fn default_history_limit() -> usize {
    50
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            send_timeout_ms: default_send_timeout(),
            outbound_buffer: default_outbound_buffer(),
            history_limit: default_history_limit(),
        }
    }
}

/// Quote bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Number of concurrent consumers in one bot process.
    #[serde(default = "default_consumers")]
    pub consumers: usize,
}

fn default_consumers() -> usize {
    1
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            consumers: default_consumers(),
        }
    }
}

/// Session configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Name of the session cookie.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Absolute session lifetime in seconds.
    #[serde(default = "default_session_duration")]
    pub duration_secs: u64,
}

fn default_cookie_name() -> String {
    "stockchat_session".to_string()
}

fn default_session_duration() -> u64 {
    24 * 60 * 60
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            duration_secs: default_session_duration(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/stockchat.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Queue transport configuration.
    #[serde(default)]
    pub queue: QueueConfig,
    /// Quote lookup configuration.
    #[serde(default)]
    pub quote: QuoteConfig,
    /// Room hub configuration.
    #[serde(default)]
    pub hub: HubConfig,
    /// Quote bot configuration.
    #[serde(default)]
    pub bot: BotConfig,
    /// Session configuration.
    #[serde(default)]
    pub session: SessionConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ChatError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| ChatError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `STOCKCHAT_QUEUE_URL`, `STOCKCHAT_QUEUE_USER`, `STOCKCHAT_QUEUE_PASSWORD`
    /// - `STOCKCHAT_REQUEST_QUEUE`, `STOCKCHAT_RESULT_QUEUE`
    /// - `STOCK_API_URL`
    ///
    /// Empty values are ignored.
    pub fn apply_env_overrides(&mut self) {
        let overrides: [(&str, &mut String); 6] = [
            ("STOCKCHAT_QUEUE_URL", &mut self.queue.url),
            ("STOCKCHAT_QUEUE_USER", &mut self.queue.user),
            ("STOCKCHAT_QUEUE_PASSWORD", &mut self.queue.password),
            ("STOCKCHAT_REQUEST_QUEUE", &mut self.queue.request_queue),
            ("STOCKCHAT_RESULT_QUEUE", &mut self.queue.result_queue),
            ("STOCK_API_URL", &mut self.quote.api_url),
        ];

        for (name, target) in overrides {
            if let Ok(value) = std::env::var(name) {
                if !value.is_empty() {
                    *target = value;
                }
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.queue.request_queue.is_empty() || self.queue.result_queue.is_empty() {
            return Err(ChatError::Config("queue names must not be empty".to_string()));
        }
        if self.queue.request_queue == self.queue.result_queue {
            return Err(ChatError::Config(
                "request_queue and result_queue must differ".to_string(),
            ));
        }
        if self.quote.api_url.matches(SYMBOL_PLACEHOLDER).count() != 1 {
            return Err(ChatError::Config(format!(
                "quote.api_url must contain {SYMBOL_PLACEHOLDER} exactly once"
            )));
        }
        if self.hub.send_timeout_ms == 0
            || self.hub.outbound_buffer == 0
            || self.hub.history_limit == 0
        {
            return Err(ChatError::Config(
                "hub limits must be greater than zero".to_string(),
            ));
        }
        if self.bot.consumers == 0 {
            return Err(ChatError::Config(
                "bot.consumers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
