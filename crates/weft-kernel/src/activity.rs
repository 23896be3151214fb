//! Activities: pending asynchronous operations and their lifecycle.
//!
//! An [`Activity`] is a tagged variant over the operation kinds the
//! kernel tracks. Kind-specific completion bookkeeping ([`Activity::post`])
//! is a `match` over the tag; delivering results to waiters lives in the
//! kernel because it touches actor records.
//!
//! ```text
//!   Waiting ──match──▶ Ready ──backing completes──▶ Done
//!      │                 │
//!      └──── cancel / timeout / peer gone ─────────▶ Failed(reason)
//! ```

use std::fmt;

use smallvec::SmallVec;
use weft_core::{
    Action, ActivityFailure, ActorId, BarrierId, CallKind, ConditionId, MailboxId, MutexId, SemaphoreId,
};

/// Lifecycle state of an activity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivityState {
    /// Posted but not yet able to progress (e.g. unmatched communication).
    Waiting,
    /// Able to progress; its backing computation, if any, is running.
    Ready,
    /// Completed successfully.
    Done,
    /// Ended without success.
    Failed(ActivityFailure),
}

impl ActivityState {
    /// Whether the activity reached `Done` or `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

/// Matching progress of a communication.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Readiness {
    /// Waiting in its mailbox for a peer.
    Pending,
    /// Both sides committed (or the data reached the receiver side).
    Ready,
    /// Transfer finished.
    Done,
}

/// Which side posted a communication into its mailbox.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommSide {
    /// Posted by a send.
    Send,
    /// Posted by a receive.
    Recv,
}

/// Communication-specific state.
#[derive(Clone, Debug, PartialEq)]
pub struct Communication {
    /// Rendezvous point.
    pub mailbox: MailboxId,
    /// Side that created the communication.
    pub origin: CommSide,
    /// Sending actor, once bound. Cleared if a detached sender exits.
    pub source_actor: Option<ActorId>,
    /// Receiving actor, once bound.
    pub destination_actor: Option<ActorId>,
    /// Fire-and-forget send: the sender holds no handle.
    pub is_detached: bool,
    /// The sender bounds its wait with a timeout.
    pub source_timeout: bool,
    /// The receiver bounds its wait with a timeout.
    pub destination_timeout: bool,
    /// Matching progress.
    pub readiness: Readiness,
    /// Transfer size in bytes.
    pub size: u64,
    /// Word delivered to the receiver.
    pub payload: u64,
    pub(crate) in_mailbox: bool,
}

impl Communication {
    pub(crate) fn posted(mailbox: MailboxId, origin: CommSide, actor: ActorId) -> Self {
        let (source_actor, destination_actor) = match origin {
            CommSide::Send => (Some(actor), None),
            CommSide::Recv => (None, Some(actor)),
        };
        Self {
            mailbox,
            origin,
            source_actor,
            destination_actor,
            is_detached: false,
            source_timeout: false,
            destination_timeout: false,
            readiness: Readiness::Pending,
            size: 0,
            payload: 0,
            in_mailbox: true,
        }
    }

    /// Whether both peers are bound.
    pub fn is_matched(&self) -> bool {
        self.source_actor.is_some() && self.destination_actor.is_some()
    }

    /// Whether either side bounds its wait with a timeout.
    pub fn has_timeout(&self) -> bool {
        self.source_timeout || self.destination_timeout
    }

    /// Whether `actor` is one of the two peers.
    pub fn involves(&self, actor: ActorId) -> bool {
        self.source_actor == Some(actor) || self.destination_actor == Some(actor)
    }
}

/// Flavour of an `Other` activity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OtherKind {
    /// Local computation.
    Execution,
    /// Simulated sleep.
    Sleep,
}

/// Kind-specific part of an activity.
#[derive(Clone, Debug, PartialEq)]
pub enum ActivityKind {
    /// Point-to-point transfer through a mailbox.
    Communication(Communication),
    /// An actor queued for a mutex.
    MutexAcquire {
        /// Mutex being acquired.
        mutex: MutexId,
    },
    /// An actor queued for a semaphore unit.
    SemaphoreAcquire {
        /// Semaphore being acquired.
        sem: SemaphoreId,
    },
    /// An actor waiting on a condition, then re-acquiring its mutex.
    ConditionWait {
        /// Condition waited on.
        cond: ConditionId,
        /// Mutex to re-acquire.
        mutex: MutexId,
        /// Lock depth to restore once re-acquired.
        depth: u32,
        /// Set once signalled (or timed out): now queued on `mutex`.
        signalled: bool,
        /// Failure to report once the mutex is back (timeout).
        outcome: Option<ActivityFailure>,
    },
    /// An actor parked at a barrier until its group is complete.
    BarrierWait {
        /// Barrier entered.
        barrier: BarrierId,
    },
    /// Computation or sleep.
    Other(OtherKind),
}

/// A request blocked on an activity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Waiter {
    /// Blocked actor.
    pub actor: ActorId,
    /// The call it is blocked in.
    pub call: CallKind,
    /// Position of this activity in the call's candidate list.
    pub index: usize,
}

/// One pending asynchronous operation.
pub struct Activity {
    pub(crate) state: ActivityState,
    pub(crate) kind: ActivityKind,
    pub(crate) waiters: SmallVec<[Waiter; 2]>,
    pub(crate) backing: Option<Box<dyn Action>>,
    pub(crate) suspended: bool,
    /// Whether the kernel still holds its bookkeeping reference.
    pub(crate) kernel_ref: bool,
    name: String,
    tracing_category: String,
}

impl Activity {
    pub(crate) fn new(kind: ActivityKind) -> Self {
        Self {
            state: ActivityState::Waiting,
            kind,
            waiters: SmallVec::new(),
            backing: None,
            suspended: false,
            kernel_ref: true,
            name: String::new(),
            tracing_category: String::new(),
        }
    }

    /// Lifecycle state.
    pub fn state(&self) -> ActivityState {
        self.state
    }

    /// Kind-specific state.
    pub fn kind(&self) -> &ActivityKind {
        &self.kind
    }

    /// Communication state, if this is a communication.
    pub fn comm(&self) -> Option<&Communication> {
        match &self.kind {
            ActivityKind::Communication(c) => Some(c),
            _ => None,
        }
    }

    pub(crate) fn comm_mut(&mut self) -> Option<&mut Communication> {
        match &mut self.kind {
            ActivityKind::Communication(c) => Some(c),
            _ => None,
        }
    }

    /// Requests blocked on this activity, in attachment order.
    pub fn waiters(&self) -> &[Waiter] {
        &self.waiters
    }

    /// Whether the backing computation is paused.
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Whether a backing computation is attached.
    pub fn has_backing(&self) -> bool {
        self.backing.is_some()
    }

    /// Work left in the backing computation at `now`; zero without one.
    pub fn remaining(&self, now: f64) -> f64 {
        self.backing.as_ref().map_or(0.0, |a| a.remaining(now))
    }

    /// Human-readable name, empty by default.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the name.
    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = name.into();
        self
    }

    /// Tracing category, empty by default.
    pub fn tracing_category(&self) -> &str {
        &self.tracing_category
    }

    /// Set the tracing category.
    pub fn set_tracing_category(&mut self, category: impl Into<String>) -> &mut Self {
        self.tracing_category = category.into();
        self
    }

    pub(crate) fn register_waiter(&mut self, waiter: Waiter) {
        self.waiters.push(waiter);
    }

    pub(crate) fn remove_waiter(&mut self, actor: ActorId) -> bool {
        let before = self.waiters.len();
        self.waiters.retain(|w| w.actor != actor);
        self.waiters.len() != before
    }

    pub(crate) fn take_waiters(&mut self) -> SmallVec<[Waiter; 2]> {
        std::mem::take(&mut self.waiters)
    }

    /// Drop the backing computation.
    pub(crate) fn clean_action(&mut self) {
        self.backing = None;
    }

    /// Abort the backing computation and drop it.
    pub(crate) fn cancel_action(&mut self) {
        if let Some(action) = self.backing.as_mut() {
            action.cancel();
        }
        self.backing = None;
    }

    /// Completion bookkeeping once the backing computation finished.
    ///
    /// No-op on a terminal activity, so running it again (finalization
    /// after completion) never changes the outcome.
    pub(crate) fn post(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        if let ActivityKind::Communication(comm) = &mut self.kind {
            comm.readiness = Readiness::Done;
        }
        self.state = ActivityState::Done;
        self.clean_action();
    }

    /// Force the failed state, unless already terminal.
    pub(crate) fn fail(&mut self, reason: ActivityFailure) {
        if self.state.is_terminal() {
            return;
        }
        self.state = ActivityState::Failed(reason);
        self.cancel_action();
    }
}

impl fmt::Debug for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Activity")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("kind", &self.kind)
            .field("waiters", &self.waiters)
            .field("suspended", &self.suspended)
            .field("has_backing", &self.backing.is_some())
            .finish()
    }
}
