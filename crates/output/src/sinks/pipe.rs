//! PipeSink - `|`-delimited readings stream for a consuming process

use std::io::{self, Stdout, Write};

use contracts::{ContractError, DerivedReading, ReadingSink};
use tracing::{debug, instrument};

use crate::format::{pipe_line, PIPE_HEADER};

/// Writes one line per reading, preceded once by the column header
///
/// Every line is flushed as soon as it is written; the consumer reads the
/// stream line by line and must never see a partial record.
pub struct PipeSink<W: Write + Send> {
    name: String,
    writer: W,
    header_written: bool,
    lines: u64,
}

impl PipeSink<Stdout> {
    /// Sink on the process stdout
    pub fn stdout() -> Self {
        Self::new("stdout", io::stdout())
    }
}

impl<W: Write + Send> PipeSink<W> {
    pub fn new(name: impl Into<String>, writer: W) -> Self {
        Self {
            name: name.into(),
            writer,
            header_written: false,
            lines: 0,
        }
    }

    /// Emit the header now if it has not gone out yet
    ///
    /// Called at startup so the consumer sees the header before the first
    /// sample is due; `write` falls back to it otherwise.
    pub fn write_header(&mut self) -> Result<(), ContractError> {
        if self.header_written {
            return Ok(());
        }
        self.emit(PIPE_HEADER)?;
        self.header_written = true;
        Ok(())
    }

    /// Data lines written so far, header excluded
    pub fn lines_written(&self) -> u64 {
        self.lines
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn emit(&mut self, line: &str) -> Result<(), ContractError> {
        writeln!(self.writer, "{line}")
            .and_then(|()| self.writer.flush())
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))
    }
}

impl<W: Write + Send> ReadingSink for PipeSink<W> {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "pipe_sink_write",
        skip(self, reading),
        fields(sink = %self.name, timestamp = reading.timestamp.as_nanos())
    )]
    async fn write(&mut self, reading: &DerivedReading) -> Result<(), ContractError> {
        self.write_header()?;
        self.emit(&pipe_line(reading))?;
        self.lines += 1;
        Ok(())
    }

    #[instrument(name = "pipe_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        self.writer
            .flush()
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))
    }

    #[instrument(name = "pipe_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.flush().await?;
        debug!(sink = %self.name, lines = self.lines, "PipeSink closed");
        Ok(())
    }
}
