//! # IAQ Monitor
//!
//! Entry point: configuration, logging, startup, then the scheduler loop.
//!
//! - Readings go to stdout; diagnostics go to stderr
//! - Exit codes: 1 bus, 2 sensor, 3 engine, 4 configuration, 5 failure run, 6 logging

use std::process::ExitCode;

use config_loader::{ConfigLoader, LoadedConfig};
use contracts::{BusError, MonitorConfig};
use iaq_monitor::{start, MonitorError, MonotonicClock};
use sensor_driver::StdDelay;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let LoadedConfig { config, source } = match ConfigLoader::from_env().load() {
        Ok(loaded) => loaded,
        Err(e) => {
            let e = MonitorError::Config(e);
            // logging is configured from this file, so report directly
            eprintln!("{e}");
            return ExitCode::from(e.exit_code());
        }
    };

    if let Err(e) = observability::init(&config.logging, &config.metrics) {
        let e = MonitorError::Logging(e);
        eprintln!("{e}");
        return ExitCode::from(e.exit_code());
    }

    info!(version = env!("CARGO_PKG_VERSION"), config = %source, "IAQ monitor starting");

    let err = run(&config).await;
    error!(error = %err, exit_code = err.exit_code(), "IAQ monitor stopped");
    ExitCode::from(err.exit_code())
}

/// Start every component and run until a fatal error
async fn run(config: &MonitorConfig) -> MonitorError {
    let sink = readings_sink();
    let clock = MonotonicClock::new();

    let mut monitor = match start(config, open_bus, StdDelay, sink, clock) {
        Ok(monitor) => monitor,
        Err(e) => return e,
    };

    announce(&mut monitor);
    monitor.run().await
}

#[cfg(feature = "linux")]
fn open_bus(device: &str) -> Result<bus_transport::LinuxBus, BusError> {
    bus_transport::open_linux_bus(device)
}

#[cfg(not(feature = "linux"))]
fn open_bus(device: &str) -> Result<bus_transport::MockBus, BusError> {
    Err(BusError::open(device, "built without a bus backend"))
}

#[cfg(not(feature = "debug-output"))]
type Sink = output::PipeSink<std::io::Stdout>;

#[cfg(feature = "debug-output")]
type Sink = output::ConsoleSink<std::io::Stdout>;

#[cfg(not(feature = "debug-output"))]
fn readings_sink() -> Sink {
    output::PipeSink::stdout()
}

#[cfg(feature = "debug-output")]
fn readings_sink() -> Sink {
    output::ConsoleSink::stdout()
}

/// Header row ahead of the first sample; `write` retries it if this fails
#[cfg(not(feature = "debug-output"))]
fn announce<B, D>(monitor: &mut iaq_monitor::Monitor<B, D, Sink>)
where
    B: contracts::BusTransport,
    D: embedded_hal::delay::DelayNs,
{
    if let Err(e) = monitor.sink_mut().write_header() {
        tracing::warn!(error = %e, "Failed to write header");
    }
}

#[cfg(feature = "debug-output")]
fn announce<B, D>(_monitor: &mut iaq_monitor::Monitor<B, D, Sink>) {}
