use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::lock;
use crate::clock::{compute_remaining, Clock, RemainingTime, Urgency};
use crate::events::Event;
use crate::schedule::{Liveness, RepeatingTask, ScheduleError};

/// What the countdown shows at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountdownFrame {
    pub remaining: RemainingTime,
    pub urgency: Urgency,
    /// `HH:MM:SS`
    pub text: String,
}

impl CountdownFrame {
    pub fn at(now: DateTime<Utc>) -> Self {
        let remaining = compute_remaining(now);
        Self {
            remaining,
            urgency: Urgency::of(&remaining),
            text: remaining.to_string(),
        }
    }
}

#[derive(Debug)]
struct CountdownState {
    frame: CountdownFrame,
    revision: u64,
}

/// Owns the countdown to the next daily boundary and the timer that drives it.
///
/// State lives only as long as the presenter. After [`teardown`](Self::teardown)
/// no tick can touch it.
pub struct CountdownPresenter {
    state: Arc<Mutex<CountdownState>>,
    task: RepeatingTask,
}

impl CountdownPresenter {
    /// Mount and start ticking. The first tick runs immediately.
    pub fn mount(
        clock: Arc<dyn Clock>,
        tick: Duration,
        events: Option<mpsc::Sender<Event>>,
    ) -> Result<Self, ScheduleError> {
        let state = Arc::new(Mutex::new(CountdownState {
            frame: CountdownFrame::at(clock.now()),
            revision: 0,
        }));

        let shared = state.clone();
        let task = RepeatingTask::start("countdown", tick, Liveness::new(), move |alive| {
            let frame = CountdownFrame::at(clock.now());
            let state = shared.clone();
            let events = events.clone();
            async move {
                {
                    // Checked under the lock teardown takes, so a commit either
                    // lands before teardown or not at all
                    let mut st = lock(&state);
                    if !alive.is_alive() {
                        return;
                    }
                    if st.frame.urgency != frame.urgency {
                        info!(urgency = frame.urgency.as_str(), remaining = %frame.text, "countdown urgency changed");
                    }
                    st.frame = frame.clone();
                    st.revision += 1;
                }
                if let Some(tx) = events {
                    let _ = tx.send(Event::Countdown(frame)).await;
                }
            }
        })?;

        debug!(tick_ms = tick.as_millis() as u64, "countdown mounted");
        Ok(Self { state, task })
    }

    /// Latest frame.
    pub fn frame(&self) -> CountdownFrame {
        lock(&self.state).frame.clone()
    }

    /// Number of committed ticks.
    pub fn revision(&self) -> u64 {
        lock(&self.state).revision
    }

    pub fn is_mounted(&self) -> bool {
        self.task.is_running()
    }

    /// Stop the timer. Nothing is written afterwards.
    pub fn teardown(&mut self) {
        let _st = lock(&self.state);
        self.task.stop();
        debug!(task = self.task.name(), "countdown torn down");
    }
}
