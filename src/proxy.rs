//! Local quote proxy.
//!
//! Serves `GET /api/price` as `{ "price": number }`. Upstream trouble never
//! surfaces as an error status: the fallback price is embedded instead, so
//! clients only ever see HTTP 200.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ProxyConfig;
use crate::price::FetchError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceBody {
    // Serialized as a JSON number
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

/// Upstream quote settings shared by all requests.
pub struct ProxyState {
    client: reqwest::Client,
    upstream_url: String,
    asset: String,
    currency: String,
    fallback: Decimal,
}

impl ProxyState {
    pub fn new(cfg: &ProxyConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            upstream_url: cfg.upstream_url.clone(),
            asset: cfg.asset.clone(),
            currency: cfg.currency.clone(),
            fallback: cfg.fallback_price,
        })
    }

    async fn fetch_upstream(&self) -> Result<Decimal, FetchError> {
        let response = self
            .client
            .get(&self.upstream_url)
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        parse_upstream(&body, &self.asset, &self.currency)
    }

    /// Upstream price, or the fallback on any failure.
    pub async fn quote(&self) -> Decimal {
        match self.fetch_upstream().await {
            Ok(price) => {
                debug!(%price, asset = %self.asset, "upstream quote");
                price
            }
            Err(e) => {
                warn!(error = %e, fallback = %self.fallback, "upstream quote failed, serving fallback");
                self.fallback
            }
        }
    }
}

/// Pull `body[asset][currency]` out of a simple-price response.
pub fn parse_upstream(body: &[u8], asset: &str, currency: &str) -> Result<Decimal, FetchError> {
    let value: Value = serde_json::from_slice(body)?;
    let price = value
        .get(asset)
        .and_then(|a| a.get(currency))
        .ok_or(FetchError::MissingPrice)?;
    crate::price::decimal_from_json(price)
}

async fn price_handler(State(state): State<Arc<ProxyState>>) -> (StatusCode, Json<PriceBody>) {
    let price = state.quote().await;
    (StatusCode::OK, Json(PriceBody { price }))
}

async fn health_handler() -> &'static str {
    "ok"
}

pub fn router(state: Arc<ProxyState>) -> Router {
    Router::new()
        .route("/api/price", get(price_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::price::{parse_quote, HttpPriceSource, PriceSource};
    use rust_decimal_macros::dec;
    use serde_json::json;
    use tokio::net::TcpListener;

    async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn proxy_config(upstream_url: String) -> ProxyConfig {
        ProxyConfig {
            upstream_url,
            asset: "solana".to_string(),
            currency: "usd".to_string(),
            fallback_price: dec!(150),
            request_timeout_secs: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_upstream() {
        let body = br#"{"solana": {"usd": 172.35}}"#;
        assert_eq!(parse_upstream(body, "solana", "usd").unwrap(), dec!(172.35));
        assert!(matches!(parse_upstream(body, "solana", "eur"), Err(FetchError::MissingPrice)));
        assert!(matches!(parse_upstream(body, "bonk", "usd"), Err(FetchError::MissingPrice)));
    }

    #[test]
    fn test_body_is_json_number() {
        let body = serde_json::to_vec(&PriceBody { price: dec!(172.35) }).unwrap();
        assert_eq!(body, br#"{"price":172.35}"#.to_vec());
        assert_eq!(parse_quote(&body).unwrap(), dec!(172.35));
    }

    #[tokio::test]
    async fn test_proxy_passes_upstream_price() {
        let upstream = Router::new().route(
            "/simple/price",
            get(|| async { Json(json!({ "solana": { "usd": 172.35 } })) }),
        );
        let upstream = serve(upstream).await;

        let state = ProxyState::new(&proxy_config(format!("{}/simple/price", upstream))).unwrap();
        let proxy = serve(router(Arc::new(state))).await;

        let source = HttpPriceSource::new(format!("{}/api/price", proxy), None).unwrap();
        assert_eq!(source.fetch_quote().await.unwrap(), dec!(172.35));
    }

    #[tokio::test]
    async fn test_proxy_absorbs_upstream_failure() {
        let upstream = Router::new().route(
            "/simple/price",
            get(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let upstream = serve(upstream).await;

        let state = ProxyState::new(&proxy_config(format!("{}/simple/price", upstream))).unwrap();
        let proxy = serve(router(Arc::new(state))).await;

        let response = reqwest::get(format!("{}/api/price", proxy)).await.unwrap();
        assert_eq!(response.status().as_u16(), 200);
        let body = response.bytes().await.unwrap();
        assert_eq!(parse_quote(&body).unwrap(), dec!(150));
    }

    #[tokio::test]
    async fn test_health() {
        let state = ProxyState::new(&proxy_config("http://127.0.0.1:1/".to_string())).unwrap();
        let proxy = serve(router(Arc::new(state))).await;

        let text = reqwest::get(format!("{}/health", proxy)).await.unwrap().text().await.unwrap();
        assert_eq!(text, "ok");
    }
}
