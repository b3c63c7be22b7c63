//! # IAQ Monitor
//!
//! Startup sequence and timing scheduler of the air-quality monitor.
//!
//! ```text
//! Scheduler ──► Bme680 (BusTransport) ──► RawSample ──► FusionEngine
//!     ▲                                                      │
//!     │                                             DerivedReading*
//!     └── StateStore ◄── serialize_state every N ticks       ▼
//!                                                       ReadingSink
//! ```
//!
//! The process has a single flow of control; the only suspension point is
//! the wait for the engine's next deadline.

pub mod clock;
pub mod error;
pub mod scheduler;
pub mod startup;

pub use clock::{ManualClock, MonotonicClock};
pub use error::{MonitorError, TickError};
pub use scheduler::{Scheduler, SchedulerSettings, SchedulerStats, TickOutcome};
pub use startup::{start, Monitor};
