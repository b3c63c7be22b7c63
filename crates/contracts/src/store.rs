//! StateStore trait - calibration state persistence

use crate::{ContractError, EngineState};

/// Stable storage for the engine's calibration blob
pub trait StateStore {
    /// Previously saved state; empty when nothing was saved yet
    fn load(&mut self) -> Result<EngineState, ContractError>;

    /// Replace the stored state with `state`, byte for byte
    fn save(&mut self, state: &EngineState) -> Result<(), ContractError>;
}

impl<S: StateStore + ?Sized> StateStore for Box<S> {
    fn load(&mut self) -> Result<EngineState, ContractError> {
        (**self).load()
    }

    fn save(&mut self, state: &EngineState) -> Result<(), ContractError> {
        (**self).save(state)
    }
}
