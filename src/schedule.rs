use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

/// Shared "still mounted" flag.
/// Captured by every job so results landing after teardown can be dropped.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Flip to dead. Cannot be revived.
    pub fn kill(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("task {0} needs a non-zero period")]
    ZeroPeriod(&'static str),
}

/// A cancellable job run on a fixed period.
///
/// The first run happens immediately. A slow run delays the next tick instead
/// of bursting to catch up.
#[derive(Debug)]
pub struct RepeatingTask {
    name: &'static str,
    liveness: Liveness,
    handle: Option<JoinHandle<()>>,
}

impl RepeatingTask {
    /// Spawn the task on the current tokio runtime. A zero period is rejected.
    pub fn start<F, Fut>(
        name: &'static str,
        period: Duration,
        liveness: Liveness,
        mut job: F,
    ) -> Result<Self, ScheduleError>
    where
        F: FnMut(Liveness) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if period.is_zero() {
            return Err(ScheduleError::ZeroPeriod(name));
        }

        let alive = liveness.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            debug!(task = name, period_ms = period.as_millis() as u64, "task started");

            loop {
                ticker.tick().await;
                if !alive.is_alive() {
                    break;
                }
                job(alive.clone()).await;
            }

            debug!(task = name, "task exited");
        });

        Ok(Self {
            name,
            liveness,
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the task. Aborts an in-flight job. Safe to call twice.
    pub fn stop(&mut self) {
        self.liveness.kill();
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!(task = self.name, "task stopped");
        }
    }
}

impl Drop for RepeatingTask {
    fn drop(&mut self) {
        self.stop();
    }
}
