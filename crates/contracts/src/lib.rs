//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the monitor: the data
//! model that crosses the bus/engine boundary and the capability traits at
//! each seam (transport, driver, engine, persistence, output).
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - All timestamps are nanoseconds since the Unix epoch (`Timestamp`), the
//!   fusion engine's native unit
//! - Capture timestamps strictly increase across scheduler ticks

mod blob;
mod bus;
mod config;
mod engine;
mod error;
mod reading;
mod sensor;
mod sink;
mod store;
mod time;

pub use blob::{ConfigProfile, EngineState};
pub use bus::{BusTransport, SENSOR_ADDR_PRIMARY, SENSOR_ADDR_SECONDARY};
pub use config::*;
pub use engine::{EngineParams, FusionEngine, SampleRate};
pub use error::*;
pub use reading::{Accuracy, DerivedReading};
pub use sensor::{Oversampling, RawSample, SampleRequest, SensorConfig, SensorDriver};
pub use sink::{LocalReadingSink, ReadingSink};
pub use store::StateStore;
pub use time::{Clock, Timestamp};
