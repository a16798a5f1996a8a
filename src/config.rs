use anyhow::Context;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::price::{PollPolicy, FALLBACK_PRICE, MIN_INTERVAL_SECS, POLL_INTERVAL_SECS};

/// Env var that overrides `price.endpoint`.
pub const ENDPOINT_ENV: &str = "MEMEVOTE_PRICE_ENDPOINT";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("{0} must be a positive price")]
    NonPositivePrice(&'static str),
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub general: General,
    pub countdown: CountdownConfig,
    pub price: PriceConfig,
    pub proxy: ProxyConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct General {
    pub log_level: String,
}

impl Default for General {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CountdownConfig {
    pub tick_ms: u64,
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self { tick_ms: 1000 }
    }
}

impl CountdownConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PriceConfig {
    /// Local quote proxy, returns `{ "price": number }`
    pub endpoint: String,
    pub poll_interval_secs: u64,
    pub min_interval_secs: i64,
    pub fallback_price: Decimal,
    /// None keeps the transport default
    pub request_timeout_secs: Option<u64>,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8787/api/price".to_string(),
            poll_interval_secs: POLL_INTERVAL_SECS,
            min_interval_secs: MIN_INTERVAL_SECS,
            fallback_price: FALLBACK_PRICE,
            request_timeout_secs: None,
        }
    }
}

impl PriceConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn policy(&self) -> PollPolicy {
        PollPolicy {
            min_interval: chrono::Duration::seconds(self.min_interval_secs),
            fallback: self.fallback_price,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub bind: String,
    /// Third-party quote URL, answers `{ "<asset>": { "<currency>": number } }`
    pub upstream_url: String,
    pub asset: String,
    pub currency: String,
    pub fallback_price: Decimal,
    pub request_timeout_secs: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8787".to_string(),
            upstream_url: "https://api.coingecko.com/api/v3/simple/price?ids=solana&vs_currencies=usd"
                .to_string(),
            asset: "solana".to_string(),
            currency: "usd".to_string(),
            fallback_price: FALLBACK_PRICE,
            request_timeout_secs: 10,
        }
    }
}

impl Config {
    /// Parse a TOML file. Missing sections and keys take defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
        Self::parse(&contents).with_context(|| format!("parsing {}", path))
    }

    /// Like [`load`](Self::load), but a missing file is `Ok(None)`.
    /// Callers log that after the subscriber is up.
    pub fn load_optional(path: &str) -> anyhow::Result<Option<Self>> {
        if Path::new(path).exists() {
            Self::load(path).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides (after `.env` has been loaded).
    pub fn with_env(mut self) -> Self {
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            if !endpoint.trim().is_empty() {
                self.price.endpoint = endpoint.trim().to_string();
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.countdown.tick_ms == 0 {
            return Err(ConfigError::Zero("countdown.tick_ms"));
        }
        if self.price.poll_interval_secs == 0 {
            return Err(ConfigError::Zero("price.poll_interval_secs"));
        }
        if self.price.fallback_price <= Decimal::ZERO {
            return Err(ConfigError::NonPositivePrice("price.fallback_price"));
        }
        if self.proxy.fallback_price <= Decimal::ZERO {
            return Err(ConfigError::NonPositivePrice("proxy.fallback_price"));
        }
        Ok(())
    }
}
