//! # Observability
//!
//! Tracing + Prometheus metrics for the monitor.
//!
//! - Tracing subscriber (JSON / pretty / compact) writing to stderr; stdout
//!   carries the readings stream
//! - `RUST_LOG` overrides the configured level
//! - Optional Prometheus exporter
//!
//! ```ignore
//! let config = config_loader::ConfigLoader::from_env().load()?.config;
//! observability::init(&config.logging, &config.metrics)?;
//! observability::metrics::record_tick(elapsed);
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use contracts::{LogFormat, LoggingConfig, MetricsConfig};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use crate::metrics::{
    record_reading, record_state_save, record_tick, record_tick_failure, TickFailure,
};

/// Install the tracing subscriber and, if a port is configured, the
/// Prometheus recorder
pub fn init(logging: &LoggingConfig, metrics: &MetricsConfig) -> Result<()> {
    init_logging(logging)?;

    if let Some(port) = metrics.listener_port() {
        init_metrics(port)?;
    }

    tracing::info!(
        log_format = ?logging.format,
        metrics_port = ?metrics.listener_port(),
        "Observability initialized"
    );
    Ok(())
}

/// Install only the tracing subscriber
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = env_filter(&config.level)?;

    let fmt_layer = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().with_writer(std::io::stderr).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_writer(std::io::stderr).boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")
}

/// Install only the Prometheus recorder, listening on `0.0.0.0:port`
pub fn init_metrics(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;

    tracing::info!(port, "Prometheus metrics endpoint initialized");
    Ok(())
}

fn env_filter(default_level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_level)
            .with_context(|| format!("invalid log level directive {default_level:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_accepts_directives() {
        assert!(env_filter("info").is_ok());
        assert!(env_filter("iaq_monitor=debug,sensor_driver=trace").is_ok());
    }

    #[test]
    fn test_metrics_disabled_by_default() {
        assert_eq!(MetricsConfig::default().listener_port(), None);
    }
}
