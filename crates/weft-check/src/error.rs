//! Exploration and replay errors.
//!
//! A deadlock or a failed property is not an error: it is the result
//! the explorer exists to find, reported as an
//! [`Outcome`](crate::Outcome). Errors here mean the exploration itself
//! could not proceed.

use std::error::Error;
use std::fmt;

use weft_kernel::{ConfigError, KernelError};
use weft_replay::{ReplayError, Transition};

/// Errors from the explorer and the trace replayer.
#[derive(Debug)]
pub enum CheckError {
    /// The kernel factory rejected its configuration.
    Config(ConfigError),
    /// The kernel halted on a fatal error.
    Kernel(KernelError),
    /// A textual path could not be parsed.
    Replay(ReplayError),
    /// A kernel handed to the explorer or replayer is not under
    /// verifier control.
    NotVerifier,
    /// An exploration budget is zero.
    ZeroBudget {
        /// The offending field.
        field: &'static str,
    },
    /// Re-execution did not reach the state a recorded path expects.
    Divergence {
        /// Index of the failing step in the path.
        step: usize,
        /// The transition that could not be fired there.
        transition: Transition,
    },
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "kernel configuration: {e}"),
            Self::Kernel(e) => write!(f, "kernel: {e}"),
            Self::Replay(e) => write!(f, "path: {e}"),
            Self::NotVerifier => write!(f, "kernel is not under verifier control"),
            Self::ZeroBudget { field } => write!(f, "{field} must be at least 1"),
            Self::Divergence { step, transition } => {
                write!(f, "execution diverged at step {step}: {transition} is not enabled")
            }
        }
    }
}

impl Error for CheckError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Kernel(e) => Some(e),
            Self::Replay(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for CheckError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<KernelError> for CheckError {
    fn from(e: KernelError) -> Self {
        Self::Kernel(e)
    }
}

impl From<ReplayError> for CheckError {
    fn from(e: ReplayError) -> Self {
        Self::Replay(e)
    }
}
