//! Line layouts of the readings stream

use chrono::{DateTime, Local};
use contracts::{Accuracy, DerivedReading};

/// Field names of the pipe-delimited stream, in column order
pub const PIPE_HEADER: &str = "Timestamp|Temperature|Pressure|RelativeHumidity|GasRawReading|IAQ";

/// `secs.millis|°C|hPa|%rH%|Ω|IAQ`
///
/// Downstream consumers split on `|` and expect exactly six fields.
pub fn pipe_line(reading: &DerivedReading) -> String {
    format!(
        "{:.3}|{:.1}|{:.1}|{:.1}%|{:.0}|{:.1}",
        reading.timestamp.as_secs_f64(),
        reading.temperature,
        reading.pressure / 100.0,
        reading.humidity,
        reading.gas_resistance,
        reading.iaq,
    )
}

/// Human-readable line with local wall time
pub fn console_line(reading: &DerivedReading) -> String {
    let when = DateTime::from_timestamp_nanos(reading.timestamp.as_nanos()).with_timezone(&Local);
    format!(
        "[{}] T: {:.1}°C, P: {:.1} hPa, rH: {:.1}%, G: {:.0} Ω, IAQ: {:.1} ({})",
        when.format("%Y-%m-%d %H:%M:%S%.3f"),
        reading.temperature,
        reading.pressure / 100.0,
        reading.humidity,
        reading.gas_resistance,
        reading.iaq,
        accuracy_label(reading.accuracy),
    )
}

pub fn accuracy_label(accuracy: Accuracy) -> &'static str {
    match accuracy {
        Accuracy::Unreliable => "unreliable",
        Accuracy::Low => "low",
        Accuracy::Medium => "medium",
        Accuracy::High => "high",
    }
}

#[cfg(test)]
pub(crate) fn sample_reading() -> DerivedReading {
    use contracts::Timestamp;

    DerivedReading {
        timestamp: Timestamp::from_nanos(1_700_000_000_123_000_000),
        temperature: 21.46,
        humidity: 45.3,
        pressure: 101_325.0,
        raw_temperature: 22.1,
        raw_humidity: 44.0,
        gas_resistance: 12_345.0,
        iaq: 42.7,
        accuracy: Accuracy::Medium,
        static_iaq: None,
        co2_equivalent: None,
        breath_voc_equivalent: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipe_line_precision() {
        assert_eq!(
            pipe_line(&sample_reading()),
            "1700000000.123|21.5|1013.2|45.3%|12345|42.7"
        );
    }

    #[test]
    fn test_pipe_line_has_six_fields() {
        assert_eq!(pipe_line(&sample_reading()).split('|').count(), 6);
        assert_eq!(PIPE_HEADER.split('|').count(), 6);
    }

    #[test]
    fn test_console_line_fields() {
        let line = console_line(&sample_reading());
        assert!(line.starts_with('['));
        assert!(line.ends_with(
            "] T: 21.5°C, P: 1013.2 hPa, rH: 45.3%, G: 12345 Ω, IAQ: 42.7 (medium)"
        ));
    }
}
