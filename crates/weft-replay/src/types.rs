//! Data types for recorded executions.

use std::fmt;

use weft_core::ActorId;

/// One verifier decision: fire `actor`'s pending request with `value`.
///
/// The meaning of `value` depends on the request: the outcome of a wait
/// (`0` success, `-1` timeout), the chosen candidate of a wait-any, or
/// the drawn integer of a random call.
///
/// # Examples
///
/// ```
/// use weft_core::ActorId;
/// use weft_replay::Transition;
///
/// let t = Transition { actor: ActorId(2), value: -1 };
/// assert_eq!(t.to_string(), "2/-1");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Transition {
    /// Actor whose request is fired.
    pub actor: ActorId,
    /// Outcome selector.
    pub value: i32,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.actor, self.value)
    }
}

/// A single entry of the binary stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Record {
    /// A random draw served to the simulated program.
    Draw(i32),
    /// A verifier transition.
    Transition(Transition),
}

/// Everything needed to reproduce one execution bit for bit.
///
/// # Examples
///
/// ```
/// use weft_core::ActorId;
/// use weft_replay::{RecordTrace, Transition};
///
/// let mut trace = RecordTrace::new(42);
/// trace.draws.push(7);
/// trace.transitions.push(Transition { actor: ActorId(1), value: 0 });
/// assert_eq!(trace.to_path_string(), "1/0");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordTrace {
    /// Seed of the free-mode random engine.
    pub seed: u64,
    /// Random draws, in program order.
    pub draws: Vec<i32>,
    /// Verifier transitions, in firing order.
    pub transitions: Vec<Transition>,
}

impl RecordTrace {
    /// An empty trace for a run seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            draws: Vec::new(),
            transitions: Vec::new(),
        }
    }

    /// Append a record.
    pub fn push(&mut self, record: Record) {
        match record {
            Record::Draw(v) => self.draws.push(v),
            Record::Transition(t) => self.transitions.push(t),
        }
    }
}
