//! ReadingSink trait - Output Sink interface

use crate::{ContractError, DerivedReading};

/// Readings output trait
///
/// All sink implementations must implement this trait.
#[trait_variant::make(ReadingSink: Send)]
pub trait LocalReadingSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one derived reading
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, reading: &DerivedReading) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}
