// Seconds-since-last-push counter driven by a rescheduled timer
use crate::domain::status_format::format_ago;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

#[derive(Debug, Default)]
pub struct StalenessClock {
    seconds: Arc<AtomicU64>,
    rearm: Arc<Notify>,
    ticker: Option<JoinHandle<()>>,
}

impl StalenessClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start ticking from zero. A clock that is already running is left alone.
    pub fn start(&mut self, tick: Duration) {
        if self.is_running() {
            return;
        }

        self.seconds.store(0, Ordering::SeqCst);
        let seconds = self.seconds.clone();
        let rearm = self.rearm.clone();
        self.ticker = Some(tokio::spawn(async move {
            // A reset restarts the period instead of keeping the old phase.
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(tick) => {
                        seconds.fetch_add(1, Ordering::SeqCst);
                    }
                    _ = rearm.notified() => {}
                }
            }
        }));
        tracing::debug!(tick_ms = tick.as_millis() as u64, "Staleness clock started");
    }

    pub fn stop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
            tracing::debug!("Staleness clock stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.ticker.as_ref().is_some_and(|ticker| !ticker.is_finished())
    }

    /// Advance by one second by hand.
    pub fn tick(&self) -> u64 {
        self.seconds.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn reset(&self) {
        self.seconds.store(0, Ordering::SeqCst);
        if self.is_running() {
            self.rearm.notify_one();
        }
    }

    pub fn seconds_since_update(&self) -> u64 {
        self.seconds.load(Ordering::SeqCst)
    }

    pub fn label(&self) -> String {
        format_ago(self.seconds_since_update())
    }
}

impl Drop for StalenessClock {
    fn drop(&mut self) {
        self.stop();
    }
}
