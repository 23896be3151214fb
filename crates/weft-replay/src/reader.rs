//! Trace playback reader.
//!
//! [`TraceReader`] reads records from any `Read` source. The header is
//! validated on construction.

use std::io::Read;

use crate::codec::{decode_header, decode_record};
use crate::error::ReplayError;
use crate::types::{Record, RecordTrace};

/// Reads trace records from a byte stream.
pub struct TraceReader<R: Read> {
    reader: R,
    seed: u64,
    records_read: u64,
}

impl<R: Read> TraceReader<R> {
    /// Open a trace stream, reading and validating the header.
    pub fn open(mut reader: R) -> Result<Self, ReplayError> {
        let seed = decode_header(&mut reader)?;
        Ok(Self {
            reader,
            seed,
            records_read: 0,
        })
    }

    /// Seed recorded in the header.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Read the next record, or `None` if the stream is exhausted.
    pub fn next_record(&mut self) -> Result<Option<Record>, ReplayError> {
        let record = decode_record(&mut self.reader)?;
        if record.is_some() {
            self.records_read += 1;
        }
        Ok(record)
    }

    /// Number of records read so far.
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Read every remaining record into a [`RecordTrace`].
    pub fn read_trace(mut self) -> Result<RecordTrace, ReplayError> {
        let mut trace = RecordTrace::new(self.seed);
        while let Some(record) = self.next_record()? {
            trace.push(record);
        }
        Ok(trace)
    }

    /// Convert into a record iterator.
    pub fn records(self) -> RecordIter<R> {
        RecordIter {
            reader: self.reader,
            done: false,
        }
    }
}

/// Iterator adapter over trace records.
pub struct RecordIter<R: Read> {
    reader: R,
    done: bool,
}

impl<R: Read> Iterator for RecordIter<R> {
    type Item = Result<Record, ReplayError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match decode_record(&mut self.reader) {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
