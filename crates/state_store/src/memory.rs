//! MemoryStateStore - in-process store for tests and dry runs

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{ContractError, EngineState, StateStore};

#[derive(Debug, Default)]
struct Inner {
    current: EngineState,
    saves: Vec<EngineState>,
    fail_saves: bool,
}

/// Keeps the blob in memory and records every save
///
/// Clones share the same storage, so a test can keep one handle while the
/// scheduler owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a previously saved blob
    pub fn with_state(state: EngineState) -> Self {
        let store = Self::new();
        store.lock().current = state;
        store
    }

    /// Make subsequent saves fail
    pub fn fail_saves(&self, fail: bool) {
        self.lock().fail_saves = fail;
    }

    /// Every blob saved so far, oldest first
    pub fn saves(&self) -> Vec<EngineState> {
        self.lock().saves.clone()
    }

    pub fn save_count(&self) -> usize {
        self.lock().saves.len()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StateStore for MemoryStateStore {
    fn load(&mut self) -> Result<EngineState, ContractError> {
        Ok(self.lock().current.clone())
    }

    fn save(&mut self, state: &EngineState) -> Result<(), ContractError> {
        let mut inner = self.lock();
        if inner.fail_saves {
            return Err(ContractError::persistence("<memory>", "save disabled"));
        }
        inner.current = state.clone();
        inner.saves.push(state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_store_is_empty() {
        let mut store = MemoryStateStore::new();
        assert!(store.load().unwrap().is_empty());
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn test_clones_share_saves() {
        let observer = MemoryStateStore::new();
        let mut writer = observer.clone();
        writer.save(&EngineState::from(vec![1, 2, 3])).unwrap();
        assert_eq!(observer.save_count(), 1);
        assert_eq!(observer.saves()[0].as_bytes(), &[1, 2, 3]);
    }

    #[test]
    fn test_failing_saves_keep_previous_state() {
        let mut store = MemoryStateStore::with_state(EngineState::from(vec![5]));
        store.fail_saves(true);
        assert!(store.save(&EngineState::from(vec![6])).is_err());
        assert_eq!(store.load().unwrap().as_bytes(), &[5]);
    }
}
