use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub sites_file: String,
    pub rules_file: Option<String>,
    pub feed: FeedConfig,
    pub api: ApiConfig,
    pub alerts: AlertConfig,
    pub directories: DirectoryConfig,
    pub logging: LoggingConfig,
    pub shutdown_grace: Duration,
}

#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub url: String,
    pub reconnect: bool,
    pub reconnect_delay: Duration,
    pub connect_timeout: Duration,
    /// Longest silence tolerated on an open connection before it is treated as dead.
    pub idle_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub max_attempts: u32,
    pub retry_interval: Duration,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AlertConfig {
    pub telegram_bot_token: Option<String>,
    pub chat_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub logs_dir: String,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
    #[error("{0} must be at least 1")]
    ZeroAttempts(&'static str),
}

impl ApiConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.stackexchange.com/2.2";

    /// Longest a single post fetch can take: every attempt timing out, with the retry
    /// interval between attempts.
    pub fn worst_case_fetch(&self) -> Duration {
        let attempts = self.max_attempts.max(1);
        self.request_timeout * attempts + self.retry_interval * (attempts - 1)
    }
}

impl FeedConfig {
    pub const DEFAULT_URL: &'static str = "wss://qa.sockets.stackexchange.com/";
}
