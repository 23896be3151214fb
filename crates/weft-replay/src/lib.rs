//! Random oracle, execution recording and replay for Weft simulations.
//!
//! A simulated program's only sources of nondeterminism are scheduling
//! choices and explicit random draws. This crate makes both
//! reproducible:
//!
//! - [`RandomOracle`] serves draws from a seeded engine, from a recorded
//!   sequence, or refuses when an external verifier owns the choice
//! - [`RecordTrace`] captures the draws and verifier transitions of a run
//! - [`TraceWriter`] / [`TraceReader`] persist traces in a compact binary
//!   format; [`parse_path`] / [`RecordTrace::to_path_string`] handle the
//!   textual `pid/value;pid/value` form
//! - [`history_hash`] fingerprints a scheduling history for determinism
//!   checks
//!
//! # Format
//!
//! ```text
//! [MAGIC "WEFT"] [VERSION u8] [seed u64]
//! [Record 1] [Record 2] ... [Record N]
//! ```
//!
//! Each record is a tag byte followed by a draw (`i32`) or a transition
//! (`u32` actor, `i32` value). All integers are little-endian.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod error;
pub mod hash;
pub mod oracle;
pub mod path;
pub mod reader;
pub mod types;
pub mod writer;

pub use error::ReplayError;
pub use hash::history_hash;
pub use oracle::{RandomMode, RandomOracle};
pub use path::parse_path;
pub use reader::{RecordIter, TraceReader};
pub use types::{Record, RecordTrace, Transition};
pub use writer::TraceWriter;

/// Magic bytes at the start of every trace file.
pub const MAGIC: [u8; 4] = *b"WEFT";

/// Current binary format version.
pub const FORMAT_VERSION: u8 = 1;
