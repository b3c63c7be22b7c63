//! # Output
//!
//! Readings stream sinks.
//!
//! - [`PipeSink`]: `|`-delimited lines with a one-time header (default mode)
//! - [`ConsoleSink`]: human-readable lines, no header (diagnostic mode)
//!
//! Line layouts live in [`format`].

pub mod format;
mod shared;
pub mod sinks;

pub use shared::SharedBuffer;
pub use sinks::{ConsoleSink, PipeSink};
