//! Service configuration loading from config.toml
//!
//! All sections are optional; anything missing falls back to the defaults below.
//! Monetary settings are written in dollars and converted to cents once, at load.

use crate::core::money;
use crate::errors::{Error, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings
    pub server: ServerSettings,
    /// Pool rules
    pub pool: PoolSettings,
    /// Members created on startup if missing
    pub members: Vec<MemberSeed>,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Socket address to bind (e.g., `"0.0.0.0:8080"`)
    pub listen_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Rules the pool enforces on requests and contributions
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    /// Smallest amount a member may request
    pub min_request_amount: Decimal,
    /// Minimum number of characters in a request description
    pub min_description_length: usize,
    /// Share of a member's savings that may be committed to active requests
    pub contribution_cap_percent: u8,
    /// Contributions are impossible once the cap drops below this amount
    pub min_contribution_amount: Decimal,
    /// Retries after the first attempt on a serialization conflict
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry
    pub retry_base_delay_ms: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            min_request_amount: Decimal::new(500, 2),
            min_description_length: 10,
            contribution_cap_percent: 50,
            min_contribution_amount: Decimal::ONE,
            max_retries: 3,
            retry_base_delay_ms: 25,
        }
    }
}

impl PoolSettings {
    /// Retry policy for serialization conflicts.
    #[must_use]
    pub const fn retry(&self) -> RetrySettings {
        RetrySettings {
            max_retries: self.max_retries,
            retry_base_delay_ms: self.retry_base_delay_ms,
        }
    }

    /// Minimum request amount in cents.
    pub fn min_request_cents(&self) -> Result<i64> {
        money::to_cents(self.min_request_amount, "min_request_amount")
    }

    /// Minimum useful contribution in cents.
    pub fn min_contribution_cents(&self) -> Result<i64> {
        money::to_cents(self.min_contribution_amount, "min_contribution_amount")
    }

    /// Rejects settings that would make the pool rules meaningless.
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.contribution_cap_percent) {
            return Err(Error::Config {
                message: format!(
                    "contribution_cap_percent must be between 1 and 100, got {}",
                    self.contribution_cap_percent
                ),
            });
        }
        if self.min_request_cents()? <= 0 {
            return Err(Error::Config {
                message: "min_request_amount must be positive".to_string(),
            });
        }
        if self.min_contribution_cents()? <= 0 {
            return Err(Error::Config {
                message: "min_contribution_amount must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Retry policy for [`crate::errors::ErrorKind::Concurrency`] failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry
    pub retry_base_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_base_delay_ms: 25,
        }
    }
}

impl RetrySettings {
    /// Backoff before retry number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1_u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.retry_base_delay_ms.saturating_mul(factor))
    }
}

/// A member to create on startup
#[derive(Debug, Clone, Deserialize)]
pub struct MemberSeed {
    /// Display name, unique across members
    pub name: String,
}

/// Loads and validates configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - The pool settings are out of range
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;
    parse_config(&contents)
}

/// Parses and validates configuration from TOML text.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    config.pool.validate()?;
    Ok(config)
}

/// Loads configuration from `KAMBIO_CONFIG` (or `./config.toml`).
///
/// A missing file is not an error: the service starts with defaults.
pub fn load_default_config() -> Result<AppConfig> {
    let path = std::env::var("KAMBIO_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    if Path::new(&path).exists() {
        info!("Loading configuration from {path}");
        load_config(&path)
    } else {
        warn!("Config file {path} not found, using defaults");
        Ok(AppConfig::default())
    }
}
