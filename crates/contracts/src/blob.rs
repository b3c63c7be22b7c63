//! Opaque engine blobs
//!
//! Calibration state and configuration profile are engine-defined byte
//! images; the monitor never interprets them and preserves length exactly.

use bytes::Bytes;

/// Engine calibration memory, versioned by the engine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineState(Bytes);

impl EngineState {
    /// Largest image any engine produces; longer files are not calibration state
    pub const MAX_LEN: usize = 256;

    /// Empty state (cold start)
    pub fn empty() -> Self {
        Self(Bytes::new())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl From<Bytes> for EngineState {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

impl From<Vec<u8>> for EngineState {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }
}

/// Vendor operating-mode profile, supplied once at engine init
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigProfile(Bytes);

impl ConfigProfile {
    /// Wrap a compiled-in blob without copying
    pub const fn from_static(bytes: &'static [u8]) -> Self {
        Self(Bytes::from_static(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for ConfigProfile {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }
}
