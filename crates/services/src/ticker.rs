//! One-second scheduling for the question countdown.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Source of countdown ticks.
///
/// `reset` discards any tick already scheduled; the next one fires a full
/// period later.
#[async_trait]
pub trait Ticker: Send {
    /// Wait for the next tick. Returns `false` once the ticker can no longer fire.
    async fn tick(&mut self) -> bool;

    fn reset(&mut self);
}

/// Wall-clock ticker backed by `tokio::time::interval`.
pub struct IntervalTicker {
    period: Duration,
    interval: Interval,
}

impl IntervalTicker {
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: Self::fresh(period),
        }
    }

    fn fresh(period: Duration) -> Interval {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    }
}

impl Default for IntervalTicker {
    fn default() -> Self {
        Self::new(TICK_PERIOD)
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) -> bool {
        self.interval.tick().await;
        true
    }

    fn reset(&mut self) {
        self.interval = Self::fresh(self.period);
    }
}

/// Ticks on demand. Each `fire` on the paired [`TickHandle`] produces one tick.
pub struct ManualTicker {
    rx: mpsc::UnboundedReceiver<()>,
    resets: usize,
}

#[derive(Clone)]
pub struct TickHandle {
    tx: mpsc::UnboundedSender<()>,
}

impl TickHandle {
    /// Returns `false` if the ticker was dropped.
    pub fn fire(&self) -> bool {
        self.tx.send(()).is_ok()
    }
}

impl ManualTicker {
    #[must_use]
    pub fn channel() -> (Self, TickHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx, resets: 0 }, TickHandle { tx })
    }

    /// How many times the ticker was reset.
    #[must_use]
    pub fn resets(&self) -> usize {
        self.resets
    }
}

#[async_trait]
impl Ticker for ManualTicker {
    async fn tick(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }

    fn reset(&mut self) {
        // drop ticks that were queued for the previous question
        while self.rx.try_recv().is_ok() {}
        self.resets += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn manual_reset_discards_pending_ticks() {
        let (mut ticker, handle) = ManualTicker::channel();
        assert!(handle.fire());
        assert!(handle.fire());
        ticker.reset();
        assert_eq!(ticker.resets(), 1);

        assert!(handle.fire());
        assert!(ticker.tick().await);
        drop(handle);
        assert!(!ticker.tick().await);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_ticks_once_per_period() {
        let mut ticker = IntervalTicker::default();
        let start = Instant::now();
        assert!(ticker.tick().await);
        assert!(ticker.tick().await);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn interval_reset_restarts_the_period() {
        let mut ticker = IntervalTicker::default();
        tokio::time::advance(Duration::from_millis(700)).await;
        ticker.reset();
        let start = Instant::now();
        assert!(ticker.tick().await);
        assert_eq!(start.elapsed(), TICK_PERIOD);
    }
}
