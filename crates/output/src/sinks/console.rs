//! ConsoleSink - human-readable readings for interactive runs

use std::io::{self, Stdout, Write};

use contracts::{ContractError, DerivedReading, ReadingSink};
use tracing::instrument;

use crate::format::console_line;

/// One bracketed, timestamped line per reading; no header
pub struct ConsoleSink<W: Write + Send> {
    name: String,
    writer: W,
}

impl ConsoleSink<Stdout> {
    pub fn stdout() -> Self {
        Self::new("console", io::stdout())
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(name: impl Into<String>, writer: W) -> Self {
        Self {
            name: name.into(),
            writer,
        }
    }

    fn io_error(&self, e: io::Error) -> ContractError {
        ContractError::sink_write(&self.name, e.to_string())
    }
}

impl<W: Write + Send> ReadingSink for ConsoleSink<W> {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "console_sink_write", skip(self, reading), fields(sink = %self.name))]
    async fn write(&mut self, reading: &DerivedReading) -> Result<(), ContractError> {
        let line = console_line(reading);
        writeln!(self.writer, "{line}").map_err(|e| self.io_error(e))?;
        self.writer.flush().map_err(|e| self.io_error(e))
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        self.writer.flush().map_err(|e| self.io_error(e))
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        self.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{sample_reading, PIPE_HEADER};
    use crate::SharedBuffer;

    #[tokio::test]
    async fn test_console_lines_have_no_header() {
        let buffer = SharedBuffer::new();
        let mut sink = ConsoleSink::new("test_console", buffer.clone());

        sink.write(&sample_reading()).await.unwrap();
        sink.write(&sample_reading()).await.unwrap();

        let lines = buffer.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l != PIPE_HEADER));
        assert!(lines[0].contains("IAQ: 42.7"));
    }
}
