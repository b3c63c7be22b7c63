//! Blocking delay providers

use std::time::Duration;

use embedded_hal::delay::DelayNs;

/// Sleeps the calling thread
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns)));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}

/// Returns immediately, accumulating the requested time
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDelay {
    requested_ns: u64,
}

impl NoopDelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of all delays asked for so far
    pub fn requested(&self) -> Duration {
        Duration::from_nanos(self.requested_ns)
    }
}

impl DelayNs for NoopDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.requested_ns += u64::from(ns);
    }

    fn delay_us(&mut self, us: u32) {
        self.requested_ns += u64::from(us) * 1_000;
    }

    fn delay_ms(&mut self, ms: u32) {
        self.requested_ns += u64::from(ms) * 1_000_000;
    }
}
