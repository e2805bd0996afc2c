use std::{sync::Arc, time::Duration};

use tokio::task::JoinHandle;
use tracing::trace;

type ExpiryCallback = Arc<dyn Fn(u64) + Send + Sync>;

/// Single-shot, restartable timer that notices when feedback stops arriving.
///
/// Every `arm` and `cancel` bumps a generation counter. The callback receives
/// the generation it was armed with, so a handler can tell a stale expiry from
/// a current one even if it raced with a re-arm.
pub struct FeedbackWatchdog {
    delay: Duration,
    on_expire: ExpiryCallback,
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for FeedbackWatchdog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedbackWatchdog")
            .field("delay", &self.delay)
            .field("generation", &self.generation)
            .field("armed", &self.is_armed())
            .finish()
    }
}

impl FeedbackWatchdog {
    /// Watchdog firing `on_expire` after `delay` of silence.
    pub fn new(delay: Duration, on_expire: impl Fn(u64) + Send + Sync + 'static) -> Self {
        Self {
            delay,
            on_expire: Arc::new(on_expire),
            generation: 0,
            pending: None,
        }
    }

    /// Configured delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Start the timer, superseding any pending one. Returns its generation.
    pub fn arm(&mut self) -> u64 {
        self.abort_pending();
        self.generation += 1;

        let generation = self.generation;
        let delay = self.delay;
        let on_expire = Arc::clone(&self.on_expire);
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            trace!(generation, "Feedback watchdog expired");
            on_expire(generation);
        }));

        generation
    }

    /// Stop a pending timer; harmless when none is pending.
    pub fn cancel(&mut self) {
        self.abort_pending();
        self.generation += 1;
    }

    /// Whether `generation` belongs to the most recent arm.
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    /// Whether a timer is still counting down.
    pub fn is_armed(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn abort_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for FeedbackWatchdog {
    fn drop(&mut self) {
        self.abort_pending();
    }
}
