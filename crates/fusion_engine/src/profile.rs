//! Compiled-in vendor configuration profile

use contracts::ConfigProfile;

static EMBEDDED_PROFILE: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/bsec_config.bin"));

/// The profile embedded at build time (empty when none was supplied)
///
/// Never fails: the blob is part of the binary.
pub fn load_config_profile() -> ConfigProfile {
    ConfigProfile::from_static(EMBEDDED_PROFILE)
}
