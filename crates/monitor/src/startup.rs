//! Startup sequence
//!
//! Bus → target address → sensor → engine → prior state. Every step before
//! the state load is fatal with its own exit code; nothing is persisted
//! until the scheduler has completed an ingest.

use contracts::{
    BusError, BusTransport, EngineParams, FusionEngine, MonitorConfig, ReadingSink, StateStore,
};
use embedded_hal::delay::DelayNs;
use fusion_engine::{create_engine, load_config_profile, DefaultEngine};
use sensor_driver::Bme680;
use state_store::FileStateStore;
use tracing::{info, instrument, warn};

use crate::clock::MonotonicClock;
use crate::error::MonitorError;
use crate::scheduler::{Scheduler, SchedulerSettings};

/// Fully wired monitor, ready to run
pub type Monitor<T, D, K> = Scheduler<
    Bme680<T, D, MonotonicClock>,
    DefaultEngine,
    FileStateStore,
    K,
    MonotonicClock,
>;

/// Bring up every component in order and hand them to a scheduler
///
/// `open_bus` receives the configured device path.
///
/// # Errors
/// - `BusOpen` / `BusTarget`: the bus could not be opened or addressed
/// - `Sensor`: identity check, reset or calibration read failed
/// - `Engine`: the engine could not be created or initialized
#[instrument(name = "startup", skip_all, fields(device = %config.bus.device, address = config.bus.address))]
pub fn start<T, D, K, F>(
    config: &MonitorConfig,
    open_bus: F,
    delay: D,
    sink: K,
    clock: MonotonicClock,
) -> Result<Monitor<T, D, K>, MonitorError>
where
    T: BusTransport,
    D: DelayNs,
    K: ReadingSink,
    F: FnOnce(&str) -> Result<T, BusError>,
{
    let mut bus =
        open_bus(&config.bus.device).map_err(|e| MonitorError::bus_open(&config.bus.device, e))?;
    bus.set_target(config.bus.address)
        .map_err(|source| MonitorError::BusTarget {
            address: config.bus.address,
            source,
        })?;
    info!("Bus opened");

    let driver = Bme680::init(bus, delay, clock).map_err(MonitorError::Sensor)?;

    let mut engine = create_engine().map_err(MonitorError::Engine)?;
    let params = EngineParams {
        profile: load_config_profile(),
        sample_rate: config.engine.sample_rate,
        temperature_offset: config.engine.temperature_offset,
    };
    engine.init(&params).map_err(MonitorError::Engine)?;
    info!(
        version = %engine.version(),
        sample_rate = ?params.sample_rate,
        profile_bytes = params.profile.len(),
        "Fusion engine initialized"
    );

    let mut store = FileStateStore::new(&config.state.path);
    restore(&mut engine, &mut store);

    Ok(Scheduler::new(
        driver,
        engine,
        store,
        sink,
        clock,
        SchedulerSettings::from(config),
    ))
}

/// Load prior calibration; any failure degrades to a cold start
fn restore<E: FusionEngine, S: StateStore>(engine: &mut E, store: &mut S) {
    let state = match store.load() {
        Ok(state) => state,
        Err(e) => {
            warn!(error = %e, "Calibration state unreadable, cold start");
            return;
        }
    };

    if state.is_empty() {
        info!("No calibration state, cold start");
        return;
    }

    match engine.restore_state(&state) {
        Ok(()) => info!(bytes = state.len(), "Calibration state restored"),
        Err(e) => warn!(error = %e, "Calibration state rejected, cold start"),
    }
}
