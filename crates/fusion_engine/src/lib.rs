//! # Fusion Engine
//!
//! [`FusionEngine`] implementations behind one constructor:
//!
//! - `bsec` feature: the vendor BSEC library through FFI ([`BsecEngine`])
//! - default: [`SimulatedEngine`], a pass-through stand-in for bring-up and tests
//!
//! The embedded configuration profile comes from [`load_config_profile`].

#[cfg(feature = "bsec")]
mod bsec;
mod profile;
mod simulated;

#[cfg(feature = "bsec")]
pub use bsec::BsecEngine;
pub use contracts::{EngineError, EngineParams, FusionEngine};
pub use profile::load_config_profile;
pub use simulated::SimulatedEngine;

/// Engine selected at build time
#[cfg(feature = "bsec")]
pub type DefaultEngine = BsecEngine;

/// Engine selected at build time
#[cfg(not(feature = "bsec"))]
pub type DefaultEngine = SimulatedEngine;

/// Construct the build-selected engine (not yet initialized)
pub fn create_engine() -> Result<DefaultEngine, EngineError> {
    #[cfg(feature = "bsec")]
    {
        BsecEngine::new()
    }
    #[cfg(not(feature = "bsec"))]
    {
        Ok(SimulatedEngine::new())
    }
}
