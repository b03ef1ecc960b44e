//! Convergence counter for pending hide/show batches.
//!
//! Host hide/show calls can lag behind on windows with hundreds of tabs. The
//! reporter polls how many tabs have not reached their target state yet and
//! shows that number on the badge until it drops to zero.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::services::badge::BadgeSink;

/// Default time between two polls.
pub const POLL_PERIOD: Duration = Duration::from_millis(500);

/// Owns at most one polling task at a time.
pub struct ProgressReporter<B> {
    badge: Arc<B>,
    period: Duration,
    task: Option<JoinHandle<()>>,
}

impl<B: BadgeSink> ProgressReporter<B> {
    pub fn new(badge: Arc<B>) -> Self {
        Self::with_period(badge, POLL_PERIOD)
    }

    pub fn with_period(badge: Arc<B>, period: Duration) -> Self {
        Self {
            badge,
            period,
            task: None,
        }
    }

    pub fn badge(&self) -> &Arc<B> {
        &self.badge
    }

    /// Show `count` immediately, without polling.
    pub fn publish(&self, count: usize) {
        self.badge.publish_count(count);
    }

    /// Start polling `poll` every period, publishing each result.
    ///
    /// Any loop already running is cancelled first. The loop ends by itself
    /// once `poll` reports zero and leaves the badge cleared.
    pub fn start_tracking<F, Fut>(&mut self, poll: F)
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = usize> + Send + 'static,
    {
        self.stop();

        let badge = Arc::clone(&self.badge);
        let period = self.period;
        self.task = Some(tokio::spawn(async move {
            let mut ticker = time::interval_at(time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let remaining = poll().await;
                badge.publish_count(remaining);
                if remaining == 0 {
                    log::debug!("pending batch converged");
                    break;
                }
            }
        }));
    }

    /// Cancel the running loop, if any. The badge keeps its last value.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Cancel the running loop and clear the badge.
    pub fn cancel(&mut self) {
        self.stop();
        self.badge.publish_count(0);
    }

    pub fn is_tracking(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl<B> Drop for ProgressReporter<B> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
