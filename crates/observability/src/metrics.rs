//! Monitor metrics
//!
//! Thin wrappers over the `metrics` facade; without an installed recorder
//! every call is a no-op.

use std::time::Duration;

use contracts::DerivedReading;
use metrics::{counter, gauge, histogram};

/// Stage of a tick that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickFailure {
    Schedule,
    Capture,
    Ingest,
    Output,
}

impl TickFailure {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Schedule => "schedule",
            Self::Capture => "capture",
            Self::Ingest => "ingest",
            Self::Output => "output",
        }
    }
}

/// Completed tick, with time spent from capture to last sink write
pub fn record_tick(elapsed: Duration) {
    counter!("iaq_monitor_ticks_total").increment(1);
    histogram!("iaq_monitor_tick_duration_ms").record(elapsed.as_secs_f64() * 1000.0);
}

pub fn record_reading(reading: &DerivedReading) {
    counter!("iaq_monitor_readings_total").increment(1);
    gauge!("iaq_monitor_iaq").set(f64::from(reading.iaq));
    gauge!("iaq_monitor_accuracy").set(f64::from(reading.accuracy.level()));
    gauge!("iaq_monitor_temperature_celsius").set(f64::from(reading.temperature));
}

/// Failed tick and the length of the current failure run
pub fn record_tick_failure(stage: TickFailure, consecutive: u32) {
    counter!("iaq_monitor_tick_failures_total", "stage" => stage.as_str()).increment(1);
    gauge!("iaq_monitor_consecutive_failures").set(f64::from(consecutive));
}

pub fn record_state_save(success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!("iaq_monitor_state_saves_total", "status" => status).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_stage_labels() {
        assert_eq!(TickFailure::Capture.as_str(), "capture");
        assert_eq!(TickFailure::Output.as_str(), "output");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_tick(Duration::from_millis(12));
        record_tick_failure(TickFailure::Ingest, 3);
        record_state_save(false);
    }
}
