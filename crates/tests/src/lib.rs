//! # Integration Tests
//!
//! End-to-end tests over the whole monitor, no hardware required:
//! `MockBus` → `Bme680` → `SimulatedEngine` → sinks / state file.
//!
//! - Contract snapshots (config, data model)
//! - Startup sequence and exit codes
//! - Scheduler loop: cadence, snapshots, failure policy
//! - Readings stream format

#[cfg(test)]
mod contract_tests {
    use config_loader::ConfigFormat;
    use contracts::{
        Accuracy, DerivedReading, MonitorConfig, SampleRate, Timestamp, SENSOR_ADDR_SECONDARY,
    };

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let toml = config_loader::to_toml(&MonitorConfig::default()).unwrap();
        let config = config_loader::parse(&toml, ConfigFormat::Toml).unwrap();

        assert_eq!(config.bus.device, "/dev/i2c-1");
        assert_eq!(config.bus.address, SENSOR_ADDR_SECONDARY);
        assert_eq!(config.engine.sample_rate, SampleRate::Continuous);
        assert_eq!(config.state.save_interval, 3600);
    }

    #[test]
    fn test_reading_serializes_without_absent_metrics() {
        let reading = DerivedReading {
            timestamp: Timestamp::from_nanos(1),
            temperature: 21.0,
            humidity: 40.0,
            pressure: 100_000.0,
            raw_temperature: 22.0,
            raw_humidity: 39.0,
            gas_resistance: 50_000.0,
            iaq: 25.0,
            accuracy: Accuracy::Unreliable,
            static_iaq: None,
            co2_equivalent: Some(500.0),
            breath_voc_equivalent: None,
        };
        let json = serde_json::to_string(&reading).unwrap();

        assert!(json.contains("\"co2_equivalent\":500.0"));
        assert!(!json.contains("static_iaq"));
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::fs;
    use std::path::Path;
    use std::time::Duration;

    use bus_transport::{MockBus, MockProbe};
    use config_loader::ConfigLoader;
    use contracts::{
        BusError, EngineError, EngineParams, FusionEngine, MonitorConfig, RawSample, Timestamp,
    };
    use fusion_engine::SimulatedEngine;
    use iaq_monitor::{
        start, ManualClock, Monitor, MonitorError, MonotonicClock, Scheduler, SchedulerSettings,
        TickError,
    };
    use output::format::PIPE_HEADER;
    use output::{PipeSink, SharedBuffer};
    use sensor_driver::{Bme680, NoopDelay};
    use state_store::FileStateStore;
    use tempfile::TempDir;

    const START: Timestamp = Timestamp::from_micros(1_700_000_000_000_000);

    type TestMonitor = Monitor<MockBus, NoopDelay, PipeSink<SharedBuffer>>;

    fn config_in(dir: &TempDir, save_interval: u64) -> MonitorConfig {
        let mut config = MonitorConfig::default();
        config.state.path = dir.path().join("bsec_state.dat");
        config.state.save_interval = save_interval;
        config.scheduler.max_consecutive_failures = 3;
        config
    }

    /// Start on a fresh mock bus; returns the monitor, the bus probe and the stdout capture
    fn start_mock(config: &MonitorConfig) -> (TestMonitor, MockProbe, SharedBuffer) {
        let bus = MockBus::new();
        let probe = bus.probe();
        let stdout = SharedBuffer::new();
        let monitor = start(
            config,
            move |_| Ok(bus),
            NoopDelay::new(),
            PipeSink::new("stdout", stdout.clone()),
            MonotonicClock::starting_at(START),
        )
        .map_err(|e| e.to_string())
        .unwrap();
        (monitor, probe, stdout)
    }

    /// Sample counter inside a simulated engine state image
    fn saved_sample_count(path: &Path) -> u64 {
        let bytes = fs::read(path).unwrap();
        assert_eq!(&bytes[..4], b"SIM\x01");
        u64::from_le_bytes(bytes[4..12].try_into().unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_written_on_multiples_of_interval() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir, 3);
        let (mut monitor, _, _) = start_mock(&config);

        let mut saved_after = Vec::new();
        for tick in 1..=7u64 {
            monitor.tick().await.unwrap();
            if config.state.path.exists() {
                let count = saved_sample_count(&config.state.path);
                if saved_after.last() != Some(&count) {
                    saved_after.push(count);
                }
            }
            assert_eq!(config.state.path.exists(), tick >= 3);
        }

        assert_eq!(saved_after, vec![3, 6]);
        assert_eq!(monitor.stats().state_saves, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_restores_saved_calibration() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir, 2);

        let (mut first, _, _) = start_mock(&config);
        for _ in 0..4 {
            first.tick().await.unwrap();
        }
        drop(first);

        let (second, _, _) = start_mock(&config);
        assert_eq!(second.engine().samples(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cold_start_without_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir, 10);

        let mut store = FileStateStore::new(&config.state.path);
        assert!(contracts::StateStore::load(&mut store).unwrap().is_empty());

        let (mut monitor, _, _) = start_mock(&config);
        assert_eq!(monitor.engine().samples(), 0);
        assert_eq!(monitor.tick().await.unwrap().readings, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_corrupt_state_file_is_cold_start() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir, 10);
        fs::write(&config.state.path, b"truncated").unwrap();

        let (monitor, _, _) = start_mock(&config);

        assert_eq!(monitor.engine().samples(), 0);
        // left alone until the next snapshot replaces it
        assert_eq!(fs::read(&config.state.path).unwrap(), b"truncated");
    }

    #[tokio::test]
    async fn test_bus_open_failure_exits_1_without_side_effects() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir, 1);
        let stdout = SharedBuffer::new();

        let err = start(
            &config,
            |device| Err::<MockBus, _>(BusError::open(device, "No such file or directory")),
            NoopDelay::new(),
            PipeSink::new("stdout", stdout.clone()),
            MonotonicClock::starting_at(START),
        )
        .err()
        .unwrap();

        assert_eq!(err.exit_code(), 1);
        assert!(!config.state.path.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
        assert!(stdout.contents().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_has_one_header_then_one_line_per_reading() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir, 100);
        let (mut monitor, _, stdout) = start_mock(&config);

        for _ in 0..3 {
            monitor.tick().await.unwrap();
        }

        let lines = stdout.lines();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], PIPE_HEADER);
        assert_eq!(lines.iter().filter(|l| *l == PIPE_HEADER).count(), 1);
        // 26.27 °C, 1021.18 hPa, 38.493 %rH, 504014 Ω from the mock field data
        assert_eq!(lines[1], "1700000000.000|26.3|1021.2|38.5%|504014|25.0");
        assert!(lines[2].starts_with("1700000001.000|"));
        assert!(lines[3].starts_with("1700000002.000|"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_header_can_precede_first_sample() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir, 100);
        let (mut monitor, _, stdout) = start_mock(&config);

        monitor.sink_mut().write_header().unwrap();
        assert_eq!(stdout.lines(), vec![PIPE_HEADER.to_string()]);

        monitor.tick().await.unwrap();
        assert_eq!(stdout.lines().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_then_recovery() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir, 100);
        let (mut monitor, probe, stdout) = start_mock(&config);

        probe.fail_reads(1);
        assert!(monitor.step().await.unwrap().is_none());
        probe.fail_writes(1);
        assert!(monitor.step().await.unwrap().is_none());
        assert_eq!(monitor.consecutive_failures(), 2);

        assert!(monitor.step().await.unwrap().is_some());
        assert_eq!(monitor.consecutive_failures(), 0);
        assert_eq!(stdout.lines().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_run_exits_5() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir, 1);
        let (mut monitor, probe, _) = start_mock(&config);

        monitor.tick().await.unwrap();
        probe.withhold_new_data(true);
        let err = monitor.run().await;

        assert_eq!(err.exit_code(), 5);
        assert!(matches!(
            err,
            MonitorError::FailureRunExceeded {
                failures: 3,
                last: TickError::Capture(_)
            }
        ));
        // only the completed ingest was persisted
        assert_eq!(saved_sample_count(&config.state.path), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_frozen_capture_clock_is_never_ingested() {
        let clock = ManualClock::new(START);
        let mut bus = MockBus::new();
        contracts::BusTransport::set_target(&mut bus, 0x77).unwrap();
        let driver = Bme680::init(bus, NoopDelay::new(), clock.clone()).unwrap();
        let mut engine = SimulatedEngine::new();
        engine.init(&EngineParams::default()).unwrap();
        let sink = PipeSink::new("stdout", SharedBuffer::new());
        let mut scheduler = Scheduler::new(
            driver,
            engine,
            state_store::MemoryStateStore::new(),
            sink,
            clock.clone(),
            SchedulerSettings {
                save_interval: 10,
                max_consecutive_failures: 3,
            },
        );

        scheduler.tick().await.unwrap();
        assert!(matches!(
            scheduler.tick().await,
            Err(TickError::NonMonotonic { .. })
        ));
        assert_eq!(scheduler.engine().samples(), 1);
        assert_eq!(scheduler.sink().lines_written(), 1);

        clock.advance(Duration::from_secs(5));
        scheduler.tick().await.unwrap();
        assert_eq!(scheduler.sink().lines_written(), 2);
    }

    #[test]
    fn test_engine_rejects_repeated_timestamp() {
        let mut engine = SimulatedEngine::new();
        engine.init(&EngineParams::default()).unwrap();
        let sample = RawSample {
            timestamp: START,
            temperature: 24.0,
            pressure: 101_325.0,
            humidity: 40.0,
            gas_resistance: 120_000.0,
            gas_valid: true,
            heat_stable: true,
        };

        engine.ingest(&sample).unwrap();
        assert!(matches!(
            engine.ingest(&sample),
            Err(EngineError::NonMonotonicTimestamp { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_config_file_drives_startup() {
        let dir = tempfile::tempdir().unwrap();
        let state_path = dir.path().join("state/bsec_state.dat");
        let config_path = dir.path().join("iaq-monitor.toml");
        fs::write(
            &config_path,
            format!(
                "[bus]\ndevice = \"/dev/i2c-1\"\naddress = 0x77\n\n\
                 [engine]\nsample_rate = \"low_power\"\ntemperature_offset = 1.5\n\n\
                 [state]\npath = \"{}\"\nsave_interval = 1\n",
                state_path.display()
            ),
        )
        .unwrap();

        let config = ConfigLoader::new(&config_path).load().unwrap().config;
        let (mut monitor, _, stdout) = start_mock(&config);

        let first = monitor.tick().await.unwrap().timestamp;
        let second = monitor.tick().await.unwrap().timestamp;

        assert_eq!(second.saturating_duration_since(first), Duration::from_secs(3));
        assert!(state_path.exists());
        // 26.27 °C minus the configured offset
        assert!(stdout.lines()[1].contains("|24.8|"));
    }
}
