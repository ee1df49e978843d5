//! JSON Lines output
//!
//! Writes one JSON object per line. String values are escaped by serde_json,
//! so line breaks inside file contents never split a record.

use crate::output::traits::{Match, MatchSink, OutputError, OutputResult};
use std::io::Write;

/// Sink that writes each match as one line of JSON
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: u64,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Number of records written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> MatchSink for JsonLinesSink<W> {
    fn emit(&mut self, record: &Match) -> OutputResult<()> {
        let line = serde_json::to_vec(record).map_err(|e| OutputError::Format(e.to_string()))?;
        self.writer.write_all(&line)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::Write(format!("Failed to flush records: {}", e)))
    }
}
