//! # State Store
//!
//! Persistence of the fusion engine's calibration blob.
//!
//! - [`FileStateStore`]: one file, replaced atomically on every save
//! - [`MemoryStateStore`]: in-process store that records every save

mod file;
mod memory;

pub use contracts::{EngineState, StateStore};
pub use file::FileStateStore;
pub use memory::MemoryStateStore;
