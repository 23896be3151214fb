//! Activity failure results.
//!
//! A failed activity is a normal, expected outcome in a simulation. It is
//! delivered as a typed result to every waiter, never raised as a
//! process-level fault. Kernel contract violations live in
//! `weft_kernel::KernelError`.

use std::error::Error;
use std::fmt;

/// Why an activity ended in the `Failed` state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActivityFailure {
    /// The activity was cancelled, by an actor or through the kernel API.
    Cancelled,
    /// A timeout raced the activity and completed first.
    Timeout,
    /// The peer of a communication was killed before the transfer ended.
    PeerGone,
}

impl fmt::Display for ActivityFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "activity cancelled"),
            Self::Timeout => write!(f, "activity timed out"),
            Self::PeerGone => write!(f, "communication peer terminated"),
        }
    }
}

impl Error for ActivityFailure {}
