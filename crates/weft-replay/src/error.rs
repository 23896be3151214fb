//! Error types for the replay system.

use std::fmt;
use std::io;

/// Errors that can occur during recording, playback or random draws.
#[derive(Debug)]
pub enum ReplayError {
    /// An I/O error occurred during read or write.
    Io(io::Error),
    /// The stream does not start with the expected `b"WEFT"` magic bytes.
    InvalidMagic,
    /// The format version is not supported by this build.
    UnsupportedVersion {
        /// The version found in the stream.
        found: u8,
    },
    /// A record could not be decoded (truncated or corrupt data).
    MalformedRecord {
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// A textual path could not be parsed.
    InvalidPath {
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// A free-mode draw was requested with `min > max`.
    InvalidRange {
        /// Requested lower bound.
        min: i32,
        /// Requested upper bound.
        max: i32,
    },
    /// Replay asked for more draws than were recorded.
    ReplayExhausted {
        /// Index of the missing draw.
        position: usize,
    },
    /// A draw was requested while an external verifier controls the
    /// process; the verifier must supply the value.
    VerifierControlled,
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::InvalidMagic => write!(f, "invalid magic bytes (expected b\"WEFT\")"),
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported format version {found}")
            }
            Self::MalformedRecord { detail } => write!(f, "malformed record: {detail}"),
            Self::InvalidPath { detail } => write!(f, "invalid record path: {detail}"),
            Self::InvalidRange { min, max } => {
                write!(f, "empty random range [{min}, {max}]")
            }
            Self::ReplayExhausted { position } => {
                write!(f, "replay exhausted: no recorded draw at position {position}")
            }
            Self::VerifierControlled => {
                write!(f, "random draw requested while a verifier controls the process")
            }
        }
    }
}

impl std::error::Error for ReplayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ReplayError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
