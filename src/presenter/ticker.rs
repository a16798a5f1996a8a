use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::lock;
use crate::clock::Clock;
use crate::events::Event;
use crate::price::{PricePoller, PriceSample, Refresh};
use crate::schedule::{Liveness, RepeatingTask, ScheduleError};

/// What the price ticker shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerFrame {
    /// Hidden until the first refresh lands.
    pub visible: bool,
    pub value: Decimal,
    /// Last refresh used the fallback value.
    pub fallback: bool,
    /// `$NNN.NN`
    pub text: String,
}

impl TickerFrame {
    fn new(sample: Option<&PriceSample>, fallback_value: Decimal, fallback: bool) -> Self {
        let value = sample.map(|s| s.value).unwrap_or(fallback_value);
        Self {
            visible: sample.is_some(),
            value,
            fallback,
            text: format_price(value),
        }
    }
}

/// Two-decimal dollar formatting, half away from zero.
pub fn format_price(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("${:.2}", rounded)
}

#[derive(Debug, Default)]
struct TickerState {
    sample: Option<PriceSample>,
    fallback: bool,
    revision: u64,
}

struct TickerInner {
    poller: PricePoller,
    clock: Arc<dyn Clock>,
    state: Mutex<TickerState>,
    // Held for the whole refresh so two never overlap
    in_flight: tokio::sync::Mutex<()>,
    liveness: Liveness,
    events: Option<mpsc::Sender<Event>>,
}

impl TickerInner {
    fn frame(&self) -> TickerFrame {
        let st = lock(&self.state);
        TickerFrame::new(st.sample.as_ref(), self.poller.policy().fallback, st.fallback)
    }

    /// Refresh through the guard and commit if still mounted.
    /// Returns the committed frame, or None if skipped or torn down.
    async fn poll(&self) -> Option<TickerFrame> {
        let _guard = self.in_flight.lock().await;
        if !self.liveness.is_alive() {
            return None;
        }

        let previous = lock(&self.state).sample.clone();
        let outcome = self.poller.refresh(previous.as_ref(), self.clock.now()).await;

        let fallback = match &outcome {
            Refresh::Skipped(_) => return None,
            Refresh::Fetched(_) => false,
            Refresh::Fallback { .. } => true,
        };

        let frame = {
            // Checked under the lock teardown takes, so a commit either
            // lands before teardown or not at all
            let mut st = lock(&self.state);
            if !self.liveness.is_alive() {
                debug!("price arrived after teardown, discarded");
                return None;
            }
            if st.sample.is_none() {
                info!(price = %outcome.sample().value, fallback, "price ticker visible");
            }
            st.sample = Some(outcome.into_sample());
            st.fallback = fallback;
            st.revision += 1;
            TickerFrame::new(st.sample.as_ref(), self.poller.policy().fallback, fallback)
        };

        if let Some(tx) = &self.events {
            let _ = tx.send(Event::Price(frame.clone())).await;
        }
        Some(frame)
    }
}

/// Cloneable trigger for a manual refresh.
/// Outlives the presenter harmlessly: after teardown it does nothing.
#[derive(Clone)]
pub struct TickerHandle {
    inner: Arc<TickerInner>,
}

impl TickerHandle {
    /// Manual refresh. Subject to the minimum interval guard.
    pub async fn refresh_now(&self) -> Option<TickerFrame> {
        self.inner.poll().await
    }
}

/// Owns the single price sample and the polling loop that refreshes it.
pub struct PriceTickerPresenter {
    inner: Arc<TickerInner>,
    task: RepeatingTask,
}

impl PriceTickerPresenter {
    /// Mount and start polling. The first poll runs immediately.
    pub fn mount(
        poller: PricePoller,
        clock: Arc<dyn Clock>,
        period: Duration,
        events: Option<mpsc::Sender<Event>>,
    ) -> Result<Self, ScheduleError> {
        let liveness = Liveness::new();
        let inner = Arc::new(TickerInner {
            poller,
            clock,
            state: Mutex::new(TickerState::default()),
            in_flight: tokio::sync::Mutex::new(()),
            liveness: liveness.clone(),
            events,
        });

        let shared = inner.clone();
        let task = RepeatingTask::start("price-ticker", period, liveness, move |_| {
            let inner = shared.clone();
            async move {
                inner.poll().await;
            }
        })?;

        debug!(period_secs = period.as_secs(), "price ticker mounted");
        Ok(Self { inner, task })
    }

    pub fn frame(&self) -> TickerFrame {
        self.inner.frame()
    }

    pub fn sample(&self) -> Option<PriceSample> {
        lock(&self.inner.state).sample.clone()
    }

    /// Number of committed samples.
    pub fn revision(&self) -> u64 {
        lock(&self.inner.state).revision
    }

    pub fn handle(&self) -> TickerHandle {
        TickerHandle {
            inner: self.inner.clone(),
        }
    }

    pub async fn refresh_now(&self) -> Option<TickerFrame> {
        self.inner.poll().await
    }

    pub fn is_mounted(&self) -> bool {
        self.task.is_running()
    }

    /// Stop polling and drop any in-flight result.
    pub fn teardown(&mut self) {
        let _st = lock(&self.inner.state);
        self.task.stop();
        debug!(task = self.task.name(), "price ticker torn down");
    }
}
