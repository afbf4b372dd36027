//! # Runtime Configuration
//!
//! Defaults with environment overrides.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `WALLET_DATA_DIR` | `./data` | Directory of the JSON file store |
//! | `WALLET_LOG_LEVEL` | `info` | Log filter when `RUST_LOG` is unset |
//! | `WALLET_JSON_LOGS` | `false` | JSON log lines instead of pretty output |
//! | `WALLET_CLEAR_ON_LOCK` | `true` | Reject all pending requests when the wallet locks |
//! | `WALLET_POLL_ATTEMPTS` | `10` | Confirmation lookups for polled transactions |
//! | `WALLET_POLL_INTERVAL_MS` | `1000` | Delay between confirmation lookups |

use consent_arbiter::ConsentConfig;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("confirmation_poll_attempts must be at least 1")]
    ZeroPollAttempts,

    #[error("command_buffer must be at least 1")]
    ZeroCommandBuffer,

    #[error("invalid log level filter: {0}")]
    InvalidLogLevel(String),
}

/// Complete runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Directory of the JSON file store.
    pub data_dir: PathBuf,
    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Emit JSON log lines.
    pub json_logs: bool,
    /// Clear the consent queue when the wallet locks.
    pub clear_on_lock: bool,
    /// Consent arbiter settings.
    pub consent: ConsentConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            log_level: "info".to_string(),
            json_logs: false,
            clear_on_lock: true,
            consent: ConsentConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load defaults overridden by the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load defaults overridden by `lookup`.
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup("WALLET_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(level) = lookup("WALLET_LOG_LEVEL") {
            config.log_level = level;
        }
        if let Some(value) = lookup("WALLET_JSON_LOGS") {
            config.json_logs = parse_flag(&value);
        }
        if let Some(value) = lookup("WALLET_CLEAR_ON_LOCK") {
            config.clear_on_lock = parse_flag(&value);
        }
        if let Some(value) = lookup("WALLET_POLL_ATTEMPTS") {
            match value.parse() {
                Ok(attempts) => config.consent.confirmation_poll_attempts = attempts,
                Err(_) => warn!(value = %value, "Ignoring invalid WALLET_POLL_ATTEMPTS"),
            }
        }
        if let Some(value) = lookup("WALLET_POLL_INTERVAL_MS") {
            match value.parse() {
                Ok(ms) => config.consent.confirmation_poll_interval = Duration::from_millis(ms),
                Err(_) => warn!(value = %value, "Ignoring invalid WALLET_POLL_INTERVAL_MS"),
            }
        }

        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.consent.confirmation_poll_attempts == 0 {
            return Err(ConfigError::ZeroPollAttempts);
        }
        if self.consent.command_buffer == 0 {
            return Err(ConfigError::ZeroCommandBuffer);
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}
