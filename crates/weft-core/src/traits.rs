//! Abstractions the kernel consumes: backing computations, the resource
//! model that creates them, and the code of simulated actors.

use crate::id::ActorId;
use crate::simcall::{Call, SimcallResult};

/// A resource-model computation backing an activity.
///
/// The kernel never interprets the performance semantics behind an
/// action. It only asks when the action completes, and may cancel,
/// suspend or resume it. Time is passed in explicitly; actions hold no
/// reference to a global clock.
pub trait Action {
    /// Simulated time at which the action completes, or `None` if it
    /// cannot currently complete (suspended or cancelled).
    fn completion_time(&self) -> Option<f64>;

    /// Work left at `now`, in the action's own unit.
    fn remaining(&self, now: f64) -> f64;

    /// Abort the action. It never completes afterwards.
    fn cancel(&mut self);

    /// Pause progress at `now`.
    fn suspend(&mut self, now: f64);

    /// Continue progress from `now`.
    fn resume(&mut self, now: f64);

    /// Whether the action has completed by `now`.
    fn is_complete(&self, now: f64) -> bool {
        self.completion_time().is_some_and(|t| t <= now)
    }
}

/// Factory for backing computations.
///
/// Stands in for the network/host performance model, which is outside
/// the kernel.
pub trait ResourceModel {
    /// Computation for transferring `size` bytes, starting at `now`.
    fn communicate(&mut self, now: f64, size: u64) -> Box<dyn Action>;

    /// Computation for `flops` operations, starting at `now`.
    fn execute(&mut self, now: f64, flops: f64) -> Box<dyn Action>;

    /// A timer that completes `duration` seconds after `now`.
    fn sleep(&mut self, now: f64, duration: f64) -> Box<dyn Action>;
}

/// What an actor does with its time-slice.
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    /// Issue one blocking call and stop running until it is answered.
    Call(Call),
    /// Terminate.
    Exit,
}

/// Context handed to an actor each time it is scheduled.
#[derive(Clone, Debug, PartialEq)]
pub struct Wakeup {
    /// The actor being resumed.
    pub pid: ActorId,
    /// Current simulated time.
    pub now: f64,
    /// Answer to the previous call; `None` on the first time-slice.
    pub result: Option<SimcallResult>,
}

/// The code of a simulated actor, written as an explicit state machine.
///
/// Each call to [`resume`](ActorCode::resume) is one time-slice: the
/// actor consumes the answer to its previous call and returns its next
/// call (or exits). There is no stack switching; the kernel resumes the
/// actor only once its previous call has been answered.
pub trait ActorCode {
    /// Run one time-slice.
    fn resume(&mut self, wakeup: Wakeup) -> Step;
}

impl<F> ActorCode for F
where
    F: FnMut(Wakeup) -> Step,
{
    fn resume(&mut self, wakeup: Wakeup) -> Step {
        self(wakeup)
    }
}
