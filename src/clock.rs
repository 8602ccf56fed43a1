// Wall-clock source for sample timestamps and query windows, plus the fixed-cadence ticker
// that drives the sampler and sweeper loops.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Unix-epoch seconds.
pub trait Clock: Send + Sync {
    fn now_unix(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Settable clock for tests and replay.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(now)),
        }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_unix(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Fixed-cadence timer. Deadlines sit on the grid `start + k * period`, so slow ticks do
/// not accumulate drift. After an overrun the next `tick` returns at once, and later
/// deadlines resume on the first grid point after that; missed slots are dropped, not replayed.
/// Runs on tokio's clock, so paused test time drives it.
#[derive(Debug)]
pub struct Ticker {
    period: Duration,
    next: Instant,
    missed: u64,
}

impl Ticker {
    /// First tick fires immediately.
    pub fn new(period: Duration) -> Self {
        Self::starting_at(Instant::now(), period)
    }

    pub fn starting_at(start: Instant, period: Duration) -> Self {
        assert!(!period.is_zero(), "ticker period must be non-zero");
        Self {
            period,
            next: start,
            missed: 0,
        }
    }

    /// Grid slots skipped so far because a tick overran.
    pub fn missed(&self) -> u64 {
        self.missed
    }

    /// Waits for the next deadline and returns it.
    pub async fn tick(&mut self) -> Instant {
        tokio::time::sleep_until(self.next).await;
        let fired = self.next;
        let (next, skipped) = next_deadline(fired, self.period, Instant::now());
        self.next = next;
        self.missed += skipped;
        fired
    }
}

/// First grid point after `fired` that is still in the future at `now`, and how many grid
/// points were passed over to get there.
fn next_deadline(fired: Instant, period: Duration, now: Instant) -> (Instant, u64) {
    let behind = now.saturating_duration_since(fired).as_nanos();
    let slots = u64::try_from(behind / period.as_nanos()).unwrap_or(u64::MAX);
    let on_grid = u32::try_from(slots.saturating_add(1))
        .ok()
        .and_then(|n| period.checked_mul(n))
        .and_then(|offset| fired.checked_add(offset));
    match on_grid {
        Some(next) => (next, slots),
        // Too far behind to count in periods: restart the grid from now.
        None => (now + period, slots),
    }
}
