// =============================================================================
// Scheduling seams: refresh ticks and wall-clock time
// =============================================================================
//
// The refresh loop waits on a `Ticker` and the desk reads time from a `Clock`,
// so tests can drive both by hand. The hand-driven variants are test-only.

#[cfg(test)]
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

// =============================================================================
// Ticker
// =============================================================================

/// Source of refresh ticks. `tick` resolves when the next refresh is due and
/// returns `false` once the source is exhausted.
#[async_trait]
pub trait Ticker: Send {
    async fn tick(&mut self) -> bool;
}

/// Fixed-period ticker backed by `tokio::time::interval`.
///
/// The first tick fires one full period after construction; the initial
/// refresh is done explicitly at startup. Missed ticks are delayed rather than
/// burst.
pub struct IntervalTicker {
    inner: Interval,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        let mut inner = interval_at(Instant::now() + period, period);
        inner.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { inner }
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) -> bool {
        self.inner.tick().await;
        true
    }
}

/// Ticker driven by explicit triggers. Ends when every handle is dropped.
#[cfg(test)]
pub struct ManualTicker {
    rx: mpsc::UnboundedReceiver<()>,
}

#[cfg(test)]
#[derive(Clone)]
pub struct ManualTrigger {
    tx: mpsc::UnboundedSender<()>,
}

#[cfg(test)]
impl ManualTrigger {
    /// Request one tick. Returns `false` if the ticker is gone.
    pub fn fire(&self) -> bool {
        self.tx.send(()).is_ok()
    }
}

#[cfg(test)]
impl ManualTicker {
    pub fn channel() -> (Self, ManualTrigger) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx }, ManualTrigger { tx })
    }
}

#[cfg(test)]
#[async_trait]
impl Ticker for ManualTicker {
    async fn tick(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }
}

// =============================================================================
// Clock
// =============================================================================

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock with millisecond resolution.
#[cfg(test)]
#[derive(Debug)]
pub struct FixedClock {
    millis: AtomicI64,
}

#[cfg(test)]
impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(at.timestamp_millis()),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.millis.store(at.timestamp_millis(), Ordering::SeqCst);
    }

    pub fn advance(&self, by: chrono::Duration) {
        self.millis.fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }
}

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = self.millis.load(Ordering::SeqCst);
        DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn manual_ticker_follows_triggers() {
        let (mut ticker, trigger) = ManualTicker::channel();
        assert!(trigger.fire());
        assert!(trigger.fire());
        assert!(ticker.tick().await);
        assert!(ticker.tick().await);
        drop(trigger);
        assert!(!ticker.tick().await);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_ticker_waits_one_period_first() {
        let mut ticker = IntervalTicker::new(Duration::from_secs(60));
        let before = tokio::time::Instant::now();
        assert!(ticker.tick().await);
        assert!(before.elapsed() >= Duration::from_secs(60));
        assert!(ticker.tick().await);
        assert!(before.elapsed() >= Duration::from_secs(120));
    }

    #[test]
    fn fixed_clock_moves_only_when_told() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let clock = FixedClock::new(t0);
        assert_eq!(clock.now(), t0);
        clock.advance(chrono::Duration::minutes(2));
        assert_eq!(clock.now(), t0 + chrono::Duration::minutes(2));
        clock.set(t0);
        assert_eq!(clock.now(), t0);
    }

    #[test]
    fn system_clock_is_current() {
        let before = Utc::now();
        let now = SystemClock.now();
        assert!(now >= before);
    }
}
