//! Timing scheduler - the control loop
//!
//! Per tick: ask the engine for the next deadline and sensor configuration,
//! sleep until then, capture, ingest, forward the readings, and every
//! `save_interval` completed ingests snapshot the engine state. A deadline
//! without a measurement request ends the tick after the sleep.

use std::time::Instant;

use contracts::{
    Clock, DerivedReading, FusionEngine, MonitorConfig, ReadingSink, SensorDriver, StateStore,
    Timestamp,
};
use tracing::{debug, error, info, instrument, warn};

use crate::error::{MonitorError, TickError};

/// Scheduler knobs taken from the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// Completed ingests between state snapshots
    pub save_interval: u64,

    /// Consecutive failed ticks tolerated before giving up
    pub max_consecutive_failures: u32,
}

impl From<&MonitorConfig> for SchedulerSettings {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            save_interval: config.state.save_interval,
            max_consecutive_failures: config.scheduler.max_consecutive_failures,
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self::from(&MonitorConfig::default())
    }
}

/// Result of a tick that got through ingest, or that the engine told to skip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    /// Capture time, or the deadline when nothing was measured
    pub timestamp: Timestamp,
    /// The sensor was read and the sample ingested
    pub measured: bool,
    pub readings: usize,
    /// A snapshot was attempted on this tick
    pub snapshot: bool,
}

/// Counters over the scheduler lifetime
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub ticks_completed: u64,
    pub ticks_failed: u64,
    pub readings_emitted: u64,
    pub state_saves: u64,
    pub state_save_failures: u64,
}

/// Drives one sensor through one engine into one sink
pub struct Scheduler<D, E, S, K, C> {
    driver: D,
    engine: E,
    store: S,
    sink: K,
    clock: C,
    settings: SchedulerSettings,
    last_capture: Option<Timestamp>,
    ingests_since_save: u64,
    consecutive_failures: u32,
    stats: SchedulerStats,
}

impl<D, E, S, K, C> Scheduler<D, E, S, K, C>
where
    D: SensorDriver,
    E: FusionEngine,
    S: StateStore,
    K: ReadingSink,
    C: Clock,
{
    /// `engine` must already be initialized (and restored, if state existed)
    pub fn new(
        driver: D,
        engine: E,
        store: S,
        sink: K,
        clock: C,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            driver,
            engine,
            store,
            sink,
            clock,
            settings,
            last_capture: None,
            ingests_since_save: 0,
            consecutive_failures: 0,
            stats: SchedulerStats::default(),
        }
    }

    /// Loop until the failure run is exceeded
    ///
    /// There is no other exit; normal operation ends with the process.
    pub async fn run(&mut self) -> MonitorError {
        info!(
            engine = %self.engine.version(),
            sink = self.sink.name(),
            save_interval = self.settings.save_interval,
            max_consecutive_failures = self.settings.max_consecutive_failures,
            "Scheduler started"
        );

        loop {
            if let Err(e) = self.step().await {
                error!(
                    failures = self.consecutive_failures,
                    error = %e,
                    "Giving up after consecutive tick failures"
                );
                if let Err(close) = self.sink.close().await {
                    warn!(error = %close, "Failed to close sink");
                }
                return MonitorError::FailureRunExceeded {
                    failures: self.consecutive_failures,
                    last: e,
                };
            }
        }
    }

    /// One tick plus failure-run bookkeeping
    ///
    /// Returns the tick error only once the run reaches the limit.
    pub async fn step(&mut self) -> Result<Option<TickOutcome>, TickError> {
        match self.tick().await {
            Ok(outcome) => {
                self.consecutive_failures = 0;
                Ok(Some(outcome))
            }
            Err(e) => {
                self.consecutive_failures += 1;
                self.stats.ticks_failed += 1;
                observability::record_tick_failure(e.stage(), self.consecutive_failures);

                if self.consecutive_failures >= self.settings.max_consecutive_failures {
                    return Err(e);
                }
                warn!(
                    consecutive = self.consecutive_failures,
                    error = %e,
                    "Tick skipped"
                );
                Ok(None)
            }
        }
    }

    /// Run a single tick
    #[instrument(name = "tick", skip(self), fields(tick = self.stats.ticks_completed + 1))]
    pub async fn tick(&mut self) -> Result<TickOutcome, TickError> {
        let request = self
            .engine
            .next_required_sample(self.clock.now())
            .map_err(TickError::Schedule)?;

        let wait = request.deadline.saturating_duration_since(self.clock.now());
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }

        if !request.trigger {
            // the engine only wanted its clock advanced
            self.stats.ticks_completed += 1;
            debug!(deadline = %request.deadline, "No measurement requested");
            return Ok(TickOutcome {
                timestamp: request.deadline,
                measured: false,
                readings: 0,
                snapshot: false,
            });
        }

        let started = Instant::now();
        let sample = self
            .driver
            .capture(&request.config)
            .map_err(TickError::Capture)?;

        if let Some(previous) = self.last_capture {
            if sample.timestamp <= previous {
                return Err(TickError::NonMonotonic {
                    previous,
                    current: sample.timestamp,
                });
            }
        }

        let readings = self.engine.ingest(&sample).map_err(TickError::Ingest)?;
        self.last_capture = Some(sample.timestamp);

        let output = self.forward(&readings).await;

        // the ingest completed even if a sink write did not
        self.ingests_since_save += 1;
        let snapshot = self.ingests_since_save >= self.settings.save_interval;
        if snapshot {
            self.snapshot();
            self.ingests_since_save = 0;
        }

        output?;

        self.stats.ticks_completed += 1;
        observability::record_tick(started.elapsed());
        debug!(readings = readings.len(), "Tick completed");

        Ok(TickOutcome {
            timestamp: sample.timestamp,
            measured: true,
            readings: readings.len(),
            snapshot,
        })
    }

    async fn forward(&mut self, readings: &[DerivedReading]) -> Result<(), TickError> {
        for reading in readings {
            self.sink.write(reading).await.map_err(TickError::Output)?;
            self.stats.readings_emitted += 1;
            observability::record_reading(reading);
        }
        Ok(())
    }

    /// Serialize and save; failures are logged and forfeit this snapshot
    fn snapshot(&mut self) {
        let result = self
            .engine
            .serialize_state()
            .map_err(|e| e.to_string())
            .and_then(|state| {
                self.store
                    .save(&state)
                    .map(|()| state.len())
                    .map_err(|e| e.to_string())
            });

        match result {
            Ok(bytes) => {
                self.stats.state_saves += 1;
                observability::record_state_save(true);
                info!(bytes, "Calibration state saved");
            }
            Err(e) => {
                self.stats.state_save_failures += 1;
                observability::record_state_save(false);
                warn!(error = %e, "Calibration state not saved");
            }
        }
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    pub fn settings(&self) -> SchedulerSettings {
        self.settings
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Completed ingests left before the next snapshot
    pub fn ingests_until_snapshot(&self) -> u64 {
        self.settings.save_interval.saturating_sub(self.ingests_since_save)
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, MonotonicClock};
    use bus_transport::{MockBus, MockProbe};
    use contracts::{
        BusTransport, ConfigProfile, ContractError, EngineError, EngineParams, EngineState,
        RawSample, SampleRate, SampleRequest, SENSOR_ADDR_SECONDARY,
    };
    use std::time::Duration;
    use fusion_engine::SimulatedEngine;
    use sensor_driver::{Bme680, NoopDelay};
    use state_store::MemoryStateStore;

    const START: Timestamp = Timestamp::from_micros(1_700_000_000_000_000);

    /// Collects readings in memory; optionally refuses writes
    #[derive(Default)]
    struct VecSink {
        readings: Vec<DerivedReading>,
        refuse: bool,
    }

    impl ReadingSink for VecSink {
        fn name(&self) -> &str {
            "vec"
        }

        async fn write(&mut self, reading: &DerivedReading) -> Result<(), ContractError> {
            if self.refuse {
                return Err(ContractError::sink_write("vec", "refused"));
            }
            self.readings.push(*reading);
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    /// Asks for a measurement on every other deadline only
    struct AlternateTrigger {
        inner: SimulatedEngine,
        requests: u32,
    }

    impl FusionEngine for AlternateTrigger {
        fn version(&self) -> String {
            self.inner.version()
        }

        fn init(&mut self, params: &EngineParams) -> Result<(), EngineError> {
            self.inner.init(params)
        }

        fn restore_state(&mut self, state: &EngineState) -> Result<(), EngineError> {
            self.inner.restore_state(state)
        }

        fn next_required_sample(&mut self, now: Timestamp) -> Result<SampleRequest, EngineError> {
            let mut request = self.inner.next_required_sample(now)?;
            self.requests += 1;
            request.trigger = self.requests % 2 == 1;
            Ok(request)
        }

        fn ingest(&mut self, sample: &RawSample) -> Result<Vec<DerivedReading>, EngineError> {
            self.inner.ingest(sample)
        }

        fn serialize_state(&mut self) -> Result<EngineState, EngineError> {
            self.inner.serialize_state()
        }
    }

    type Driver<C> = Bme680<MockBus, NoopDelay, C>;
    type TestScheduler<C> = Scheduler<Driver<C>, SimulatedEngine, MemoryStateStore, VecSink, C>;

    fn engine() -> SimulatedEngine {
        let mut engine = SimulatedEngine::new();
        engine
            .init(&EngineParams {
                profile: ConfigProfile::default(),
                sample_rate: SampleRate::Continuous,
                temperature_offset: 0.0,
            })
            .unwrap();
        engine
    }

    fn build<C: Clock + Clone>(
        clock: C,
        settings: SchedulerSettings,
    ) -> (TestScheduler<C>, MockProbe, MemoryStateStore) {
        let mut bus = MockBus::new();
        bus.set_target(SENSOR_ADDR_SECONDARY).unwrap();
        let probe = bus.probe();
        let driver = Bme680::init(bus, NoopDelay::new(), clock.clone()).unwrap();
        let store = MemoryStateStore::new();
        let scheduler = Scheduler::new(
            driver,
            engine(),
            store.clone(),
            VecSink::default(),
            clock,
            settings,
        );
        (scheduler, probe, store)
    }

    fn settings(save_interval: u64, max_consecutive_failures: u32) -> SchedulerSettings {
        SchedulerSettings {
            save_interval,
            max_consecutive_failures,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_forwards_readings() {
        let (mut scheduler, probe, _) = build(MonotonicClock::starting_at(START), settings(10, 3));

        let outcome = scheduler.tick().await.unwrap();

        assert_eq!(outcome.readings, 1);
        assert!(!outcome.snapshot);
        assert_eq!(probe.conversions(), 1);
        assert_eq!(scheduler.sink().readings.len(), 1);
        assert!((scheduler.sink().readings[0].temperature - 26.27).abs() < 1e-3);
        assert_eq!(scheduler.stats().readings_emitted, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_follow_engine_cadence() {
        let (mut scheduler, _, _) = build(MonotonicClock::starting_at(START), settings(100, 3));

        let first = scheduler.tick().await.unwrap().timestamp;
        let second = scheduler.tick().await.unwrap().timestamp;
        let third = scheduler.tick().await.unwrap().timestamp;

        assert_eq!(second.saturating_duration_since(first), Duration::from_secs(1));
        assert_eq!(third.saturating_duration_since(second), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_every_save_interval() {
        let (mut scheduler, _, store) = build(MonotonicClock::starting_at(START), settings(3, 3));

        let mut snapshot_ticks = Vec::new();
        for tick in 1..=10 {
            if scheduler.tick().await.unwrap().snapshot {
                snapshot_ticks.push(tick);
            }
        }

        assert_eq!(snapshot_ticks, vec![3, 6, 9]);
        assert_eq!(store.save_count(), 3);
        assert_eq!(scheduler.ingests_until_snapshot(), 2);
        // the last snapshot is the engine image after the ninth ingest
        let mut restored = engine();
        restored.restore_state(&store.saves()[2]).unwrap();
        assert_eq!(restored.samples(), 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_save_is_not_fatal() {
        let (mut scheduler, _, store) = build(MonotonicClock::starting_at(START), settings(1, 3));
        store.fail_saves(true);

        let outcome = scheduler.tick().await.unwrap();

        assert!(outcome.snapshot);
        assert_eq!(scheduler.stats().state_save_failures, 1);
        assert_eq!(scheduler.stats().state_saves, 0);
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_increasing_capture_time_is_rejected() {
        let clock = ManualClock::new(START);
        let (mut scheduler, _, _) = build(clock.clone(), settings(10, 5));

        scheduler.tick().await.unwrap();
        // clock frozen: the second capture carries the same timestamp
        let err = scheduler.tick().await.unwrap_err();

        assert!(matches!(err, TickError::NonMonotonic { .. }));
        assert_eq!(scheduler.engine().samples(), 1);

        clock.advance(Duration::from_secs(1));
        scheduler.tick().await.unwrap();
        assert_eq!(scheduler.engine().samples(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_read_failure_skips_tick() {
        let (mut scheduler, probe, _) = build(MonotonicClock::starting_at(START), settings(10, 3));

        probe.fail_reads(1);
        assert_eq!(scheduler.step().await.unwrap(), None);
        assert_eq!(scheduler.consecutive_failures(), 1);

        assert!(scheduler.step().await.unwrap().is_some());
        assert_eq!(scheduler.consecutive_failures(), 0);
        assert_eq!(scheduler.stats().ticks_failed, 1);
        assert_eq!(scheduler.stats().ticks_completed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_write_failure_skips_tick() {
        let (mut scheduler, probe, _) = build(MonotonicClock::starting_at(START), settings(10, 3));

        probe.fail_writes(1);
        assert_eq!(scheduler.step().await.unwrap(), None);
        assert!(scheduler.step().await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_gives_up_after_failure_run() {
        let (mut scheduler, probe, store) = build(MonotonicClock::starting_at(START), settings(1, 4));

        probe.fail_reads(u32::MAX);
        let err = scheduler.run().await;

        assert_eq!(err.exit_code(), 5);
        assert!(matches!(
            err,
            MonitorError::FailureRunExceeded {
                failures: 4,
                last: TickError::Capture(_)
            }
        ));
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_failure_still_counts_ingest() {
        let (mut scheduler, _, store) = build(MonotonicClock::starting_at(START), settings(1, 3));
        scheduler.sink.refuse = true;

        let err = scheduler.tick().await.unwrap_err();

        assert!(matches!(err, TickError::Output(_)));
        assert_eq!(scheduler.engine().samples(), 1);
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_untriggered_deadline_skips_capture() {
        let clock = MonotonicClock::starting_at(START);
        let mut bus = MockBus::new();
        bus.set_target(SENSOR_ADDR_SECONDARY).unwrap();
        let probe = bus.probe();
        let driver = Bme680::init(bus, NoopDelay::new(), clock).unwrap();
        let store = MemoryStateStore::new();
        let engine = AlternateTrigger {
            inner: engine(),
            requests: 0,
        };
        let mut scheduler = Scheduler::new(
            driver,
            engine,
            store.clone(),
            VecSink::default(),
            clock,
            settings(2, 3),
        );

        let mut outcomes = Vec::new();
        for _ in 0..6 {
            outcomes.push(scheduler.tick().await.unwrap());
        }

        let measured: Vec<bool> = outcomes.iter().map(|o| o.measured).collect();
        assert_eq!(measured, [true, false, true, false, true, false]);
        assert_eq!(probe.conversions(), 3);
        assert_eq!(scheduler.engine().inner.samples(), 3);
        assert_eq!(scheduler.sink().readings.len(), 3);
        assert_eq!(scheduler.stats().ticks_completed, 6);
        // snapshots count ingests, not deadlines
        assert_eq!(store.save_count(), 1);
        // the skipped deadline still held the cadence
        assert_eq!(
            outcomes[1].timestamp.saturating_duration_since(outcomes[0].timestamp),
            Duration::from_secs(1)
        );
    }
}
