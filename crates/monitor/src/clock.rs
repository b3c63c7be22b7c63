//! Capture and scheduling clocks

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use contracts::{Clock, Timestamp};
use tokio::time::Instant;

/// Wall-clock time anchored once, then advanced by the monotonic tokio clock
///
/// Wall-clock steps (NTP, manual changes) after startup never make
/// timestamps go backwards. Copies share the anchor, so the driver and the
/// scheduler agree on time. Resolution is one microsecond.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    anchor: Timestamp,
    started: Instant,
}

impl MonotonicClock {
    /// Anchor at the current system time
    pub fn new() -> Self {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        let micros = i64::try_from(since_epoch.as_micros()).unwrap_or(i64::MAX);
        Self::starting_at(Timestamp::from_micros(micros))
    }

    /// Anchor at a fixed point in time
    pub fn starting_at(anchor: Timestamp) -> Self {
        Self {
            anchor,
            started: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        let elapsed = i64::try_from(self.started.elapsed().as_micros()).unwrap_or(i64::MAX);
        Timestamp::from_nanos(
            self.anchor
                .as_nanos()
                .saturating_add(elapsed.saturating_mul(1_000)),
        )
    }
}

/// Clock that only moves when told to
///
/// Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            nanos: Arc::new(AtomicI64::new(start.as_nanos())),
        }
    }

    pub fn set(&self, at: Timestamp) {
        self.nanos.store(at.as_nanos(), Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        let next = self.now() + by;
        self.set(next);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}
