//! Evaluator configuration

use std::env;
use std::path::PathBuf;

/// Configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Billing-as-code declaration to evaluate against
    pub billing_config_path: PathBuf,
    /// Emit JSON log lines instead of human-readable ones
    pub log_json: bool,
    /// `tracing_subscriber::EnvFilter` directive
    pub log_filter: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            billing_config_path: env::var("BILLKIT_CONFIG_PATH")
                .map(PathBuf::from)
                .map_err(|_| ConfigError::Missing("BILLKIT_CONFIG_PATH"))?,
            log_json: env::var("BILLKIT_LOG_JSON")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false),
            log_filter: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
