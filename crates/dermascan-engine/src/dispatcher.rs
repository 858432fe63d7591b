//! Single-concurrency dispatch with a pluggable pause between items.
//!
//! The dispatcher does not own the work: callers drive their own loop and
//! ask a [`DispatchRun`] for the next slot, which applies the throttle
//! policy between consecutive items (never before the first one).

use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Pause inserted between two consecutive dispatches.
pub trait ThrottlePolicy: Send + Sync {
    fn pause(&self) -> Duration;
}

/// Constant delay, independent of response times or failures.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

impl ThrottlePolicy for FixedDelay {
    fn pause(&self) -> Duration {
        self.0
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl ThrottlePolicy for NoDelay {
    fn pause(&self) -> Duration {
        Duration::ZERO
    }
}

/// Counts over exactly the items processed by one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

#[derive(Clone)]
pub struct SequentialDispatcher {
    policy: Arc<dyn ThrottlePolicy>,
}

impl SequentialDispatcher {
    pub fn new(policy: impl ThrottlePolicy + 'static) -> Self {
        Self {
            policy: Arc::new(policy),
        }
    }

    #[must_use]
    pub fn fixed_delay(delay: Duration) -> Self {
        Self::new(FixedDelay(delay))
    }

    #[must_use]
    pub fn unthrottled() -> Self {
        Self::new(NoDelay)
    }

    #[must_use]
    pub fn pause(&self) -> Duration {
        self.policy.pause()
    }

    /// Start one sequential run.
    #[must_use]
    pub fn begin(&self) -> DispatchRun<'_> {
        DispatchRun {
            policy: self.policy.as_ref(),
            dispatched: 0,
            summary: BatchSummary::default(),
            started: Instant::now(),
        }
    }
}

/// State of one sequential run: pacing and outcome counters.
pub struct DispatchRun<'a> {
    policy: &'a dyn ThrottlePolicy,
    dispatched: usize,
    summary: BatchSummary,
    started: Instant,
}

impl DispatchRun<'_> {
    /// Wait until the next item may be dispatched.
    pub async fn next_slot(&mut self) {
        if self.dispatched > 0 {
            let pause = self.policy.pause();
            if !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
        }
        self.dispatched += 1;
    }

    pub fn record(&mut self, succeeded: bool) {
        if succeeded {
            self.summary.succeeded += 1;
        } else {
            self.summary.failed += 1;
        }
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }

    pub fn finish(self) -> BatchSummary {
        self.summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant as TokioInstant;

    #[tokio::test(start_paused = true)]
    async fn fixed_delay_applies_between_items_only() {
        let dispatcher = SequentialDispatcher::fixed_delay(Duration::from_millis(500));
        let start = TokioInstant::now();
        let mut run = dispatcher.begin();

        run.next_slot().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        run.record(true);

        run.next_slot().await;
        run.record(false);
        run.next_slot().await;
        run.record(true);

        assert_eq!(start.elapsed(), Duration::from_millis(1000));
        assert_eq!(
            run.finish(),
            BatchSummary {
                succeeded: 2,
                failed: 1
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn no_delay_never_sleeps() {
        let dispatcher = SequentialDispatcher::unthrottled();
        let start = TokioInstant::now();
        let mut run = dispatcher.begin();
        for _ in 0..5 {
            run.next_slot().await;
            run.record(true);
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(run.finish().total(), 5);
    }
}
