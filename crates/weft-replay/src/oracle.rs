//! Source of integers for simulated nondeterministic draws.
//!
//! The same call site behaves identically whether the program runs
//! standalone or replays a recorded execution:
//!
//! - **Free**: uniform draw over `[min, max]` from a ChaCha8 engine seeded
//!   once when the oracle is built.
//! - **Replay**: the value recorded at this program point, whatever the
//!   bounds. This is what reproduces a reported counterexample bit for bit.
//! - **Verifier**: an external verifier owns the choice and supplies the
//!   value itself; asking the oracle is a protocol violation.
//!
//! Every value served in free or replay mode is appended to
//! [`recorded()`](RandomOracle::recorded), so a free run can be replayed
//! later from that log.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::ReplayError;

/// Which source an oracle draws from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RandomMode {
    /// Seeded pseudo-random engine.
    Free,
    /// Previously recorded draws.
    Replay,
    /// Values come from an external verifier.
    Verifier,
}

enum Source {
    Free(ChaCha8Rng),
    Replay { draws: Vec<i32>, cursor: usize },
    Verifier,
}

/// Deterministic-or-recorded integer source.
///
/// # Examples
///
/// ```
/// use weft_replay::RandomOracle;
///
/// let mut free = RandomOracle::free(7);
/// let a = free.next_random(0, 100).unwrap();
/// let b = free.next_random(0, 100).unwrap();
///
/// // Replaying the log reproduces the draws, even with other bounds.
/// let mut replay = RandomOracle::replay(free.recorded().to_vec());
/// assert_eq!(replay.next_random(-5, -1).unwrap(), a);
/// assert_eq!(replay.next_random(1000, 2000).unwrap(), b);
/// ```
pub struct RandomOracle {
    source: Source,
    recorded: Vec<i32>,
}

impl RandomOracle {
    /// Free mode, seeded once.
    pub fn free(seed: u64) -> Self {
        Self {
            source: Source::Free(ChaCha8Rng::seed_from_u64(seed)),
            recorded: Vec::new(),
        }
    }

    /// Replay mode over previously recorded draws.
    pub fn replay(draws: Vec<i32>) -> Self {
        Self {
            source: Source::Replay { draws, cursor: 0 },
            recorded: Vec::new(),
        }
    }

    /// Verifier mode: every draw is refused.
    pub fn verifier() -> Self {
        Self {
            source: Source::Verifier,
            recorded: Vec::new(),
        }
    }

    /// Current mode.
    pub fn mode(&self) -> RandomMode {
        match self.source {
            Source::Free(_) => RandomMode::Free,
            Source::Replay { .. } => RandomMode::Replay,
            Source::Verifier => RandomMode::Verifier,
        }
    }

    /// Next integer for a draw bounded by `[min, max]`.
    ///
    /// # Errors
    ///
    /// - [`ReplayError::InvalidRange`] in free mode when `min > max`
    /// - [`ReplayError::ReplayExhausted`] when replay runs past the log
    /// - [`ReplayError::VerifierControlled`] in verifier mode
    pub fn next_random(&mut self, min: i32, max: i32) -> Result<i32, ReplayError> {
        let value = match &mut self.source {
            Source::Free(rng) => {
                if min > max {
                    return Err(ReplayError::InvalidRange { min, max });
                }
                rng.random_range(min..=max)
            }
            Source::Replay { draws, cursor } => {
                let value = *draws
                    .get(*cursor)
                    .ok_or(ReplayError::ReplayExhausted { position: *cursor })?;
                *cursor += 1;
                value
            }
            Source::Verifier => return Err(ReplayError::VerifierControlled),
        };
        tracing::trace!(min, max, value, "random draw");
        self.recorded.push(value);
        Ok(value)
    }

    /// Draws served so far, in order.
    pub fn recorded(&self) -> &[i32] {
        &self.recorded
    }

    /// Recorded draws not yet consumed (replay mode), zero otherwise.
    pub fn remaining(&self) -> usize {
        match &self.source {
            Source::Replay { draws, cursor } => draws.len() - cursor,
            _ => 0,
        }
    }
}
