use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{info, warn};

use memevote_rs::clock::{next_boundary, Clock, SystemClock};
use memevote_rs::config::Config;
use memevote_rs::events::Event;
use memevote_rs::logging;
use memevote_rs::presenter::{CountdownPresenter, PriceTickerPresenter};
use memevote_rs::price::{HttpPriceSource, PricePoller};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let loaded = Config::load_optional(&path)?;
    let found = loaded.is_some();
    let cfg = loaded.unwrap_or_default().with_env();
    logging::init(&cfg.general.log_level);
    if !found {
        info!(%path, "config file not found, using defaults");
    }
    info!(?cfg, "loaded config");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    info!(boundary = %next_boundary(clock.now()), "voting round closes");

    let source = HttpPriceSource::new(cfg.price.endpoint.clone(), cfg.price.request_timeout())?;
    info!(endpoint = source.endpoint(), "polling price quotes");
    let poller = PricePoller::new(Arc::new(source), cfg.price.policy());

    // Create the event channel
    let (tx, mut rx) = mpsc::channel::<Event>(100);

    let mut countdown = CountdownPresenter::mount(clock.clone(), cfg.countdown.tick(), Some(tx.clone()))?;
    let mut ticker = PriceTickerPresenter::mount(poller, clock, cfg.price.poll_interval(), Some(tx.clone()))?;

    let shutdown_tx = tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(Event::Shutdown).await;
        }
    });
    drop(tx);

    info!("starting event loop (Ctrl+C to quit)");
    while let Some(event) = rx.recv().await {
        match event {
            Event::Countdown(frame) => {
                println!("round ends in {} [{}]", frame.text, frame.urgency.as_str());
            }
            Event::Price(frame) => {
                if frame.fallback {
                    warn!("price unavailable, showing fallback");
                }
                if frame.visible {
                    println!("price {}", frame.text);
                }
            }
            Event::Shutdown => {
                info!("shutting down");
                break;
            }
        }
    }

    countdown.teardown();
    ticker.teardown();
    Ok(())
}
