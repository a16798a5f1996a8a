use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

use memevote_rs::config::Config;
use memevote_rs::logging;
use memevote_rs::proxy::{router, ProxyState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let loaded = Config::load_optional(&path)?;
    let found = loaded.is_some();
    let cfg = loaded.unwrap_or_default();
    logging::init(&cfg.general.log_level);
    if !found {
        info!(%path, "config file not found, using defaults");
    }

    let state = Arc::new(ProxyState::new(&cfg.proxy)?);
    let listener = TcpListener::bind(&cfg.proxy.bind)
        .await
        .with_context(|| format!("binding {}", cfg.proxy.bind))?;

    info!(bind = %cfg.proxy.bind, upstream = %cfg.proxy.upstream_url, "price proxy listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    info!("price proxy stopped");
    Ok(())
}
