//! Trace recording writer.
//!
//! [`TraceWriter`] streams records to any `Write` sink. The header is
//! written immediately on construction.

use std::io::Write;

use crate::codec::{encode_header, encode_record};
use crate::error::ReplayError;
use crate::types::{Record, RecordTrace, Transition};

/// Writes trace records to a byte stream.
///
/// Generic over `W: Write` so tests can use `Vec<u8>` and production
/// code can use `BufWriter<File>`.
///
/// # Examples
///
/// ```
/// use weft_core::ActorId;
/// use weft_replay::{RecordTrace, TraceReader, TraceWriter, Transition};
///
/// let mut buf = Vec::new();
/// let mut writer = TraceWriter::new(&mut buf, 42).unwrap();
/// writer.write_draw(5).unwrap();
/// writer
///     .write_transition(Transition { actor: ActorId(1), value: 0 })
///     .unwrap();
/// assert_eq!(writer.records_written(), 2);
/// drop(writer);
///
/// let trace = TraceReader::open(buf.as_slice()).unwrap().read_trace().unwrap();
/// assert_eq!(trace.seed, 42);
/// assert_eq!(trace.draws, vec![5]);
/// assert_eq!(trace.transitions.len(), 1);
/// ```
pub struct TraceWriter<W: Write> {
    writer: W,
    records_written: u64,
}

impl<W: Write> TraceWriter<W> {
    /// Create a new writer, immediately writing the header.
    pub fn new(mut writer: W, seed: u64) -> Result<Self, ReplayError> {
        encode_header(&mut writer, seed)?;
        Ok(Self {
            writer,
            records_written: 0,
        })
    }

    /// Append one record.
    pub fn write_record(&mut self, record: &Record) -> Result<(), ReplayError> {
        encode_record(&mut self.writer, record)?;
        self.records_written += 1;
        Ok(())
    }

    /// Append a random draw.
    pub fn write_draw(&mut self, value: i32) -> Result<(), ReplayError> {
        self.write_record(&Record::Draw(value))
    }

    /// Append a verifier transition.
    pub fn write_transition(&mut self, transition: Transition) -> Result<(), ReplayError> {
        self.write_record(&Record::Transition(transition))
    }

    /// Append every draw, then every transition, of `trace`.
    ///
    /// The header seed is not rewritten; callers pass the trace's seed
    /// to [`new`](Self::new).
    pub fn write_trace(&mut self, trace: &RecordTrace) -> Result<(), ReplayError> {
        for &draw in &trace.draws {
            self.write_draw(draw)?;
        }
        for &transition in &trace.transitions {
            self.write_transition(transition)?;
        }
        Ok(())
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> Result<(), ReplayError> {
        self.writer.flush()?;
        Ok(())
    }

    /// Number of records written so far.
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Consume the writer and return the underlying `Write` sink.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
