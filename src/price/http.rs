use futures_util::future::BoxFuture;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use super::{FetchError, PriceSource};

/// Fetches `{ "price": number }` from the local quote proxy.
#[derive(Debug, Clone)]
pub struct HttpPriceSource {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPriceSource {
    /// `timeout` of `None` leaves the transport default in place.
    pub fn new(endpoint: impl Into<String>, timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        Ok(Self {
            client: builder.build()?,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn fetch(&self) -> Result<Decimal, FetchError> {
        // no-cache forces the proxy (and anything in front of it) to go to origin
        let response = self
            .client
            .get(&self.endpoint)
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        debug!(endpoint = %self.endpoint, bytes = body.len(), "quote received");
        parse_quote(&body)
    }
}

impl PriceSource for HttpPriceSource {
    fn fetch_quote(&self) -> BoxFuture<'_, Result<Decimal, FetchError>> {
        Box::pin(self.fetch())
    }
}

/// Extract the `price` field of a quote body.
///
/// Accepts a JSON number or a numeric string. Zero, negative and missing
/// prices are rejected.
pub fn parse_quote(body: &[u8]) -> Result<Decimal, FetchError> {
    let value: Value = serde_json::from_slice(body)?;
    let price = value.get("price").ok_or(FetchError::MissingPrice)?;
    decimal_from_json(price)
}

/// Convert a JSON number (or numeric string) into a positive Decimal.
pub(crate) fn decimal_from_json(price: &Value) -> Result<Decimal, FetchError> {
    let raw = match price {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        Value::Null => return Err(FetchError::MissingPrice),
        other => return Err(FetchError::InvalidPrice(other.to_string())),
    };

    let parsed = Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .map_err(|_| FetchError::InvalidPrice(raw.clone()))?;

    if parsed <= Decimal::ZERO {
        return Err(FetchError::InvalidPrice(raw));
    }
    Ok(parsed)
}
