//! Textual record paths.
//!
//! A path is the compact, human-pasteable form of a trace's transitions:
//! `pid/value` pairs separated by `;`, e.g. `"1/0;2/0;1/-1"`. It is what
//! a counterexample report prints and what a user feeds back to replay
//! it.

use weft_core::ActorId;

use crate::error::ReplayError;
use crate::types::{RecordTrace, Transition};

impl RecordTrace {
    /// Format the transitions as a `pid/value;pid/value` path.
    pub fn to_path_string(&self) -> String {
        self.transitions
            .iter()
            .map(Transition::to_string)
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// Parse a `pid/value;pid/value` path. The empty string is the empty path.
pub fn parse_path(path: &str) -> Result<Vec<Transition>, ReplayError> {
    let path = path.trim();
    if path.is_empty() {
        return Ok(Vec::new());
    }
    path.split(';')
        .enumerate()
        .map(|(position, item)| {
            let invalid = |what: &str| ReplayError::InvalidPath {
                detail: format!("item {position} ({item:?}): {what}"),
            };
            let (pid, value) = item.trim().split_once('/').ok_or_else(|| invalid("missing '/'"))?;
            let pid: u32 = pid.parse().map_err(|_| invalid("bad actor id"))?;
            let value: i32 = value.parse().map_err(|_| invalid("bad value"))?;
            Ok(Transition {
                actor: ActorId(pid),
                value,
            })
        })
        .collect()
}
