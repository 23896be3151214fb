//! Re-running a recorded execution.

use tracing::debug;
use weft_kernel::Kernel;
use weft_replay::{parse_path, RecordTrace, Transition};

use crate::error::CheckError;

/// Fire `trace`'s transitions, in order, on a freshly built kernel.
///
/// The kernel must be under verifier control and built the same way as
/// the one that recorded the trace. Invisible requests are serviced
/// before the first and after every fired transition.
///
/// # Errors
///
/// [`CheckError::Divergence`] when a recorded transition is not among
/// the values its actor may be fired with at that point.
pub fn replay_trace(kernel: &mut Kernel, trace: &RecordTrace) -> Result<(), CheckError> {
    replay_transitions(kernel, &trace.transitions)
}

/// Like [`replay_trace`], from the textual `pid/value;pid/value` form.
pub fn replay_path(kernel: &mut Kernel, path: &str) -> Result<(), CheckError> {
    let transitions = parse_path(path)?;
    replay_transitions(kernel, &transitions)
}

fn replay_transitions(kernel: &mut Kernel, transitions: &[Transition]) -> Result<(), CheckError> {
    if !kernel.config().control.is_verifier() {
        return Err(CheckError::NotVerifier);
    }
    kernel.wait_for_requests()?;
    for (step, &transition) in transitions.iter().enumerate() {
        if !kernel
            .transition_values(transition.actor)
            .contains(&transition.value)
        {
            return Err(CheckError::Divergence { step, transition });
        }
        debug!(step, %transition, "replay");
        kernel.fire(transition.actor, transition.value)?;
    }
    Ok(())
}
