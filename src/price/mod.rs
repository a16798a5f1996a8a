mod http;

pub use http::{parse_quote, HttpPriceSource};
pub(crate) use http::decimal_from_json;

use chrono::{DateTime, Duration, Utc};
use futures_util::future::BoxFuture;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Value shown when no quote could be obtained.
pub const FALLBACK_PRICE: Decimal = dec!(150);

/// Minimum spacing between two real fetches.
pub const MIN_INTERVAL_SECS: i64 = 60;

/// Period of the scheduled polling loop.
pub const POLL_INTERVAL_SECS: u64 = 120;

/// Why a quote could not be used.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("quote endpoint returned HTTP {0}")]
    Status(u16),

    #[error("malformed quote body: {0}")]
    Body(#[from] serde_json::Error),

    #[error("quote body has no price field")]
    MissingPrice,

    #[error("price is not a positive number: {0}")]
    InvalidPrice(String),
}

/// Most recent price. Only one is ever kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceSample {
    pub value: Decimal,
    pub fetched_at: DateTime<Utc>,
}

impl PriceSample {
    pub fn new(value: Decimal, fetched_at: DateTime<Utc>) -> Self {
        Self { value, fetched_at }
    }

    /// Age of the sample at `now`.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.fetched_at
    }
}

/// Where quotes come from.
pub trait PriceSource: Send + Sync {
    /// Fetch one quote. Implementations must not cache.
    fn fetch_quote(&self) -> BoxFuture<'_, Result<Decimal, FetchError>>;
}

/// Outcome of a refresh. Every branch carries a usable sample.
#[derive(Debug)]
pub enum Refresh {
    /// Previous sample is younger than the minimum interval. Nothing was fetched.
    Skipped(PriceSample),
    /// Fresh quote.
    Fetched(PriceSample),
    /// Fetch failed; sample holds the fallback value.
    Fallback {
        sample: PriceSample,
        reason: FetchError,
    },
}

impl Refresh {
    pub fn sample(&self) -> &PriceSample {
        match self {
            Self::Skipped(s) | Self::Fetched(s) => s,
            Self::Fallback { sample, .. } => sample,
        }
    }

    pub fn into_sample(self) -> PriceSample {
        match self {
            Self::Skipped(s) | Self::Fetched(s) => s,
            Self::Fallback { sample, .. } => sample,
        }
    }

    /// True if a request was issued (fetched or fell back).
    pub fn is_new(&self) -> bool {
        !matches!(self, Self::Skipped(_))
    }
}

/// Refresh policy knobs.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    pub min_interval: Duration,
    pub fallback: Decimal,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            min_interval: Duration::seconds(MIN_INTERVAL_SECS),
            fallback: FALLBACK_PRICE,
        }
    }
}

/// Applies the min-interval guard and fallback rules around a [`PriceSource`].
#[derive(Clone)]
pub struct PricePoller {
    source: Arc<dyn PriceSource>,
    policy: PollPolicy,
}

impl PricePoller {
    pub fn new(source: Arc<dyn PriceSource>, policy: PollPolicy) -> Self {
        Self { source, policy }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Produce the next sample. Never fails.
    pub async fn refresh(&self, previous: Option<&PriceSample>, now: DateTime<Utc>) -> Refresh {
        if let Some(prev) = previous {
            if prev.age(now) < self.policy.min_interval {
                debug!(age_secs = prev.age(now).num_seconds(), "price refresh skipped");
                return Refresh::Skipped(prev.clone());
            }
        }

        match self.source.fetch_quote().await {
            Ok(value) => {
                debug!(%value, "price fetched");
                Refresh::Fetched(PriceSample::new(value, now))
            }
            Err(reason) => {
                warn!(error = %reason, fallback = %self.policy.fallback, "price fetch failed, using fallback");
                Refresh::Fallback {
                    sample: PriceSample::new(self.policy.fallback, now),
                    reason,
                }
            }
        }
    }
}
