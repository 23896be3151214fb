//! Per-actor kernel records.

use smallvec::SmallVec;
use weft_core::{Action, ActivityId, ActorCode, CallKind, Candidates, Request, SimcallResult};

/// Scheduling state of an actor.
#[derive(Clone, Debug, PartialEq)]
pub enum ActorState {
    /// Will run in the next round.
    Runnable,
    /// Issued a request that has not been serviced yet.
    Pending,
    /// Its request was serviced and attached to activities; resumes only
    /// when one of them finishes (or its timeout fires).
    Blocked(BlockedOn),
    /// Exited or killed.
    Terminated,
}

/// What a blocked actor waits for.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockedOn {
    /// The call it is blocked in.
    pub kind: CallKind,
    /// Activities it is registered on, in candidate order.
    pub activities: Candidates,
}

pub(crate) struct ActorRecord {
    pub(crate) name: String,
    pub(crate) code: Option<Box<dyn ActorCode>>,
    pub(crate) state: ActorState,
    pub(crate) request: Option<Request>,
    pub(crate) result: Option<SimcallResult>,
    pub(crate) handles: SmallVec<[ActivityId; 4]>,
    pub(crate) timer: Option<Box<dyn Action>>,
}

impl ActorRecord {
    pub(crate) fn new(name: String, code: Option<Box<dyn ActorCode>>) -> Self {
        Self {
            name,
            code,
            state: ActorState::Runnable,
            request: None,
            result: None,
            handles: SmallVec::new(),
            timer: None,
        }
    }

    pub(crate) fn is_terminated(&self) -> bool {
        self.state == ActorState::Terminated
    }

    pub(crate) fn holds(&self, id: ActivityId) -> bool {
        self.handles.contains(&id)
    }

    /// Drop one handle to `id`; false if the actor held none.
    pub(crate) fn drop_handle(&mut self, id: ActivityId) -> bool {
        match self.handles.iter().position(|h| *h == id) {
            Some(pos) => {
                self.handles.remove(pos);
                true
            }
            None => false,
        }
    }

    pub(crate) fn cancel_timer(&mut self) {
        if let Some(mut timer) = self.timer.take() {
            timer.cancel();
        }
    }
}
