//! Kernel error types.
//!
//! Two families: lookups that miss (an unknown actor, mailbox or
//! synchronisation object, or a stale activity handle) and protocol
//! violations. Both are fatal: the kernel halts on the first one and
//! every later entry point answers [`KernelError::Halted`]. Activity
//! failures are not errors here; they reach the waiting actor as
//! `Err(ActivityFailure)` inside its simcall result.

use std::error::Error;
use std::fmt;

use weft_arena::ArenaError;
use weft_core::{ActivityId, ActorId, CallKind, MutexId};
use weft_replay::ReplayError;

/// A contract violation by an actor or by the driver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProtocolViolation {
    /// An actor issued a request while one was still outstanding.
    RequestAlreadyPending {
        /// The offending actor.
        actor: ActorId,
    },
    /// A random draw reached the kernel's oracle under verifier control.
    RandomUnderVerifier {
        /// The drawing actor.
        actor: ActorId,
    },
    /// An actor released (or waited with) a mutex it does not own.
    NotMutexOwner {
        /// The offending actor.
        actor: ActorId,
        /// The mutex.
        mutex: MutexId,
    },
    /// An actor used a communication handle it does not hold.
    HandleNotHeld {
        /// The offending actor.
        actor: ActorId,
        /// The handle.
        activity: ActivityId,
    },
    /// An activity was released by more owners than it had.
    OverRelease {
        /// The activity.
        activity: ActivityId,
    },
    /// The driver fired a request that is not enabled, or with a value
    /// outside its transition values.
    DisabledTransition {
        /// Issuer of the request.
        actor: ActorId,
        /// Its call kind.
        kind: CallKind,
        /// The value fired.
        value: i32,
    },
    /// The driver fired an actor that has no pending visible request.
    NoPendingRequest {
        /// The actor.
        actor: ActorId,
    },
    /// An actor issued a request after terminating.
    ActorTerminated {
        /// The actor.
        actor: ActorId,
    },
    /// A random draw was issued with `min > max`.
    InvalidRandomRange {
        /// The drawing actor.
        actor: ActorId,
        /// Lower bound.
        min: i32,
        /// Upper bound.
        max: i32,
    },
    /// A random draw under verifier control offers more values than
    /// `max_random_branching` allows.
    RandomSpanTooWide {
        /// The drawing actor.
        actor: ActorId,
        /// Number of values in `[min, max]`.
        span: u64,
        /// The configured bound.
        limit: u32,
    },
}

impl fmt::Display for ProtocolViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestAlreadyPending { actor } => {
                write!(f, "actor {actor} issued a second outstanding request")
            }
            Self::RandomUnderVerifier { actor } => {
                write!(f, "actor {actor} drew a random value under verifier control")
            }
            Self::NotMutexOwner { actor, mutex } => {
                write!(f, "actor {actor} does not own mutex {mutex}")
            }
            Self::HandleNotHeld { actor, activity } => {
                write!(f, "actor {actor} holds no handle to {activity}")
            }
            Self::OverRelease { activity } => write!(f, "{activity} released too many times"),
            Self::DisabledTransition { actor, kind, value } => {
                write!(f, "fired disabled transition {actor}/{value} ({kind})")
            }
            Self::NoPendingRequest { actor } => {
                write!(f, "actor {actor} has no pending visible request")
            }
            Self::ActorTerminated { actor } => write!(f, "actor {actor} already terminated"),
            Self::InvalidRandomRange { actor, min, max } => {
                write!(f, "actor {actor} drew from empty range [{min}, {max}]")
            }
            Self::RandomSpanTooWide { actor, span, limit } => {
                write!(f, "actor {actor} drew from {span} values, more than the {limit} allowed")
            }
        }
    }
}

/// Errors returned by kernel entry points.
#[derive(Debug)]
pub enum KernelError {
    /// A protocol violation halted the kernel.
    Protocol(ProtocolViolation),
    /// An activity handle did not resolve.
    Arena(ArenaError),
    /// The random oracle failed (e.g. a replay log ran out).
    Replay(ReplayError),
    /// No actor with this pid exists.
    UnknownActor(ActorId),
    /// No object of this kind with this id exists.
    UnknownObject {
        /// Object kind: "mailbox", "mutex", "semaphore", "condition" or
        /// "barrier".
        kind: &'static str,
        /// Raw id.
        id: u32,
    },
    /// The entry point is not available under the configured control mode.
    WrongMode {
        /// The entry point.
        operation: &'static str,
    },
    /// `max_rounds` was reached while waiting for requests.
    RoundLimit {
        /// Rounds run.
        limit: u64,
    },
    /// An earlier fatal error halted the kernel.
    Halted,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protocol(v) => write!(f, "protocol violation: {v}"),
            Self::Arena(e) => write!(f, "arena: {e}"),
            Self::Replay(e) => write!(f, "random oracle: {e}"),
            Self::UnknownActor(pid) => write!(f, "unknown actor {pid}"),
            Self::UnknownObject { kind, id } => write!(f, "unknown {kind} {id}"),
            Self::WrongMode { operation } => {
                write!(f, "{operation} is not available in this control mode")
            }
            Self::RoundLimit { limit } => write!(f, "round limit of {limit} reached"),
            Self::Halted => write!(f, "kernel halted after a fatal error"),
        }
    }
}

impl Error for KernelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Arena(e) => Some(e),
            Self::Replay(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ArenaError> for KernelError {
    fn from(e: ArenaError) -> Self {
        Self::Arena(e)
    }
}

impl From<ReplayError> for KernelError {
    fn from(e: ReplayError) -> Self {
        Self::Replay(e)
    }
}

impl From<ProtocolViolation> for KernelError {
    fn from(v: ProtocolViolation) -> Self {
        Self::Protocol(v)
    }
}

impl KernelError {
    /// The protocol violation, if this is one.
    pub fn violation(&self) -> Option<&ProtocolViolation> {
        match self {
            Self::Protocol(v) => Some(v),
            _ => None,
        }
    }
}
