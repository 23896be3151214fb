//! Registry error types.

use std::error::Error;
use std::fmt;

use weft_core::ActivityId;

/// Errors that can occur during registry operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// The id refers to a slot that was released (or never existed).
    ///
    /// This is also what an over-release produces: once the last owner
    /// let go, the id is stale.
    StaleHandle {
        /// The offending id.
        id: ActivityId,
    },
    /// The live-entry cap was reached.
    CapacityExceeded {
        /// The configured cap.
        max_live: u32,
    },
    /// An entry already has `u32::MAX` owners.
    RefcountOverflow {
        /// The saturated entry.
        id: ActivityId,
    },
    /// The registry configuration is invalid.
    InvalidConfig {
        /// Which invariant was violated.
        reason: String,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaleHandle { id } => write!(f, "stale handle: {id}"),
            Self::CapacityExceeded { max_live } => {
                write!(f, "registry capacity exceeded: {max_live} live entries")
            }
            Self::RefcountOverflow { id } => write!(f, "refcount overflow on {id}"),
            Self::InvalidConfig { reason } => write!(f, "invalid registry config: {reason}"),
        }
    }
}

impl Error for ArenaError {}
