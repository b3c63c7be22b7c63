//! Sink implementations
//!
//! Contains PipeSink and ConsoleSink.

mod console;
mod pipe;

pub use self::console::ConsoleSink;
pub use self::pipe::PipeSink;
