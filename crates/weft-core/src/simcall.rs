//! Simcalls: the blocking requests actors issue to the kernel.
//!
//! An actor talks to the kernel exclusively through a [`Request`]: the
//! issuing actor plus a [`Call`] describing the primitive and its
//! parameters. Each actor holds at most one outstanding request; it is
//! consumed exactly once, either serviced on the spot (invisible calls)
//! or fired by the verifier (visible calls).

use std::fmt;

use smallvec::SmallVec;

use crate::error::ActivityFailure;
use crate::id::{ActivityId, ActorId, BarrierId, ConditionId, MailboxId, MutexId, SemaphoreId};

/// Candidate communications of a wait-any / test-any call.
///
/// Inline capacity of 4 covers the common fan-in patterns without a
/// heap allocation.
pub type Candidates = SmallVec<[ActivityId; 4]>;

/// Discriminator of a [`Call`], without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CallKind {
    /// Asynchronous send on a mailbox.
    CommIsend,
    /// Asynchronous receive on a mailbox.
    CommIrecv,
    /// Wait for one communication.
    CommWait,
    /// Wait for the first of several communications.
    CommWaitAny,
    /// Non-blocking completion check of one communication.
    CommTest,
    /// Non-blocking completion check of several communications.
    CommTestAny,
    /// Nondeterministic integer draw.
    McRandom,
    /// Blocking mutex acquisition.
    MutexLock,
    /// Non-blocking mutex acquisition.
    MutexTrylock,
    /// Mutex release.
    MutexUnlock,
    /// Semaphore acquisition.
    SemAcquire,
    /// Semaphore release.
    SemRelease,
    /// Condition variable wait.
    CondWait,
    /// Wake one condition waiter.
    CondSignal,
    /// Wake every condition waiter.
    CondBroadcast,
    /// Local computation.
    Execute,
    /// Simulated sleep.
    Sleep,
    /// Cancel an activity.
    ActivityCancel,
    /// Suspend an activity.
    ActivitySuspend,
    /// Resume a suspended activity.
    ActivityResume,
    /// Arrive at a barrier.
    BarrierEnter,
}

impl CallKind {
    /// Every call kind, in wire-code order.
    pub const ALL: [CallKind; 21] = [
        Self::CommIsend,
        Self::CommIrecv,
        Self::CommWait,
        Self::CommWaitAny,
        Self::CommTest,
        Self::CommTestAny,
        Self::McRandom,
        Self::MutexLock,
        Self::MutexTrylock,
        Self::MutexUnlock,
        Self::SemAcquire,
        Self::SemRelease,
        Self::CondWait,
        Self::CondSignal,
        Self::CondBroadcast,
        Self::Execute,
        Self::Sleep,
        Self::ActivityCancel,
        Self::ActivitySuspend,
        Self::ActivityResume,
        Self::BarrierEnter,
    ];

    /// Stable one-byte code, used when hashing or encoding histories.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Inverse of [`code`](Self::code).
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// Short lowercase name, as printed in traces.
    pub fn name(self) -> &'static str {
        match self {
            Self::CommIsend => "comm_isend",
            Self::CommIrecv => "comm_irecv",
            Self::CommWait => "comm_wait",
            Self::CommWaitAny => "comm_waitany",
            Self::CommTest => "comm_test",
            Self::CommTestAny => "comm_testany",
            Self::McRandom => "mc_random",
            Self::MutexLock => "mutex_lock",
            Self::MutexTrylock => "mutex_trylock",
            Self::MutexUnlock => "mutex_unlock",
            Self::SemAcquire => "sem_acquire",
            Self::SemRelease => "sem_release",
            Self::CondWait => "cond_wait",
            Self::CondSignal => "cond_signal",
            Self::CondBroadcast => "cond_broadcast",
            Self::Execute => "execute",
            Self::Sleep => "sleep",
            Self::ActivityCancel => "activity_cancel",
            Self::ActivitySuspend => "activity_suspend",
            Self::ActivityResume => "activity_resume",
            Self::BarrierEnter => "barrier_enter",
        }
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A blocking primitive together with its parameters.
///
/// Timeouts are expressed in simulated seconds; `None` waits forever.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    /// Post a send on `mailbox`. Answers with the communication handle,
    /// or `Unit` when `detached` (fire-and-forget, no handle).
    CommIsend {
        /// Rendezvous point.
        mailbox: MailboxId,
        /// Transfer size in bytes, handed to the resource model.
        size: u64,
        /// Opaque word delivered to the receiver.
        payload: u64,
        /// Whether the sender gives up its handle.
        detached: bool,
    },
    /// Post a receive on `mailbox`. Answers with the communication handle.
    CommIrecv {
        /// Rendezvous point.
        mailbox: MailboxId,
    },
    /// Block until `comm` finishes.
    CommWait {
        /// Handle returned by a previous send or receive.
        comm: ActivityId,
        /// Optional bound on the wait.
        timeout: Option<f64>,
    },
    /// Block until any of `comms` finishes; answers with its index.
    CommWaitAny {
        /// Candidate communications, in caller order.
        comms: Candidates,
        /// Optional bound on the wait.
        timeout: Option<f64>,
    },
    /// Check whether `comm` finished, without blocking.
    CommTest {
        /// Communication to check.
        comm: ActivityId,
    },
    /// Check whether any of `comms` finished, without blocking.
    CommTestAny {
        /// Candidate communications, in caller order.
        comms: Candidates,
    },
    /// Draw an integer in `[min, max]`.
    McRandom {
        /// Inclusive lower bound.
        min: i32,
        /// Inclusive upper bound.
        max: i32,
    },
    /// Acquire `mutex`, blocking while another actor owns it.
    MutexLock {
        /// Target mutex.
        mutex: MutexId,
    },
    /// Try to acquire `mutex`; answers `Bool`.
    MutexTrylock {
        /// Target mutex.
        mutex: MutexId,
    },
    /// Release `mutex`. Only the owner may do so.
    MutexUnlock {
        /// Target mutex.
        mutex: MutexId,
    },
    /// Take one unit of `sem`, blocking while none is available.
    SemAcquire {
        /// Target semaphore.
        sem: SemaphoreId,
        /// Optional bound on the wait.
        timeout: Option<f64>,
    },
    /// Give back one unit of `sem`.
    SemRelease {
        /// Target semaphore.
        sem: SemaphoreId,
    },
    /// Atomically release `mutex` and wait on `cond`; re-acquires `mutex`
    /// before returning.
    CondWait {
        /// Condition to wait on.
        cond: ConditionId,
        /// Mutex held by the caller.
        mutex: MutexId,
        /// Optional bound on the wait.
        timeout: Option<f64>,
    },
    /// Wake the oldest waiter of `cond`.
    CondSignal {
        /// Target condition.
        cond: ConditionId,
    },
    /// Wake every waiter of `cond`.
    CondBroadcast {
        /// Target condition.
        cond: ConditionId,
    },
    /// Compute `flops` floating-point operations.
    Execute {
        /// Amount of work.
        flops: f64,
    },
    /// Let `duration` simulated seconds pass.
    Sleep {
        /// Sleep length.
        duration: f64,
    },
    /// Cancel `activity`, failing every waiter.
    ActivityCancel {
        /// Target activity.
        activity: ActivityId,
    },
    /// Suspend `activity`'s backing computation.
    ActivitySuspend {
        /// Target activity.
        activity: ActivityId,
    },
    /// Resume `activity`'s backing computation.
    ActivityResume {
        /// Target activity.
        activity: ActivityId,
    },
    /// Block until `barrier` has seen as many arrivals as it expects.
    /// The arrival that completes the group is answered `Bool(true)`,
    /// the ones it releases `Bool(false)`.
    BarrierEnter {
        /// Target barrier.
        barrier: BarrierId,
    },
}

impl Call {
    /// The discriminator of this call.
    pub fn kind(&self) -> CallKind {
        match self {
            Self::CommIsend { .. } => CallKind::CommIsend,
            Self::CommIrecv { .. } => CallKind::CommIrecv,
            Self::CommWait { .. } => CallKind::CommWait,
            Self::CommWaitAny { .. } => CallKind::CommWaitAny,
            Self::CommTest { .. } => CallKind::CommTest,
            Self::CommTestAny { .. } => CallKind::CommTestAny,
            Self::McRandom { .. } => CallKind::McRandom,
            Self::MutexLock { .. } => CallKind::MutexLock,
            Self::MutexTrylock { .. } => CallKind::MutexTrylock,
            Self::MutexUnlock { .. } => CallKind::MutexUnlock,
            Self::SemAcquire { .. } => CallKind::SemAcquire,
            Self::SemRelease { .. } => CallKind::SemRelease,
            Self::CondWait { .. } => CallKind::CondWait,
            Self::CondSignal { .. } => CallKind::CondSignal,
            Self::CondBroadcast { .. } => CallKind::CondBroadcast,
            Self::Execute { .. } => CallKind::Execute,
            Self::Sleep { .. } => CallKind::Sleep,
            Self::ActivityCancel { .. } => CallKind::ActivityCancel,
            Self::ActivitySuspend { .. } => CallKind::ActivitySuspend,
            Self::ActivityResume { .. } => CallKind::ActivityResume,
            Self::BarrierEnter { .. } => CallKind::BarrierEnter,
        }
    }

    /// The timeout bounding this call, if it is a bounded wait.
    pub fn timeout(&self) -> Option<f64> {
        match self {
            Self::CommWait { timeout, .. }
            | Self::CommWaitAny { timeout, .. }
            | Self::SemAcquire { timeout, .. }
            | Self::CondWait { timeout, .. } => *timeout,
            _ => None,
        }
    }
}

/// A call together with the actor that issued it.
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    /// Issuing actor.
    pub issuer: ActorId,
    /// The call itself.
    pub call: Call,
}

impl Request {
    /// Build a request.
    pub fn new(issuer: ActorId, call: Call) -> Self {
        Self { issuer, call }
    }

    /// Shorthand for `self.call.kind()`.
    pub fn kind(&self) -> CallKind {
        self.call.kind()
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[actor {}] {}", self.issuer, self.kind())
    }
}

/// Successful answer to a simcall.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimcallValue {
    /// Nothing to report.
    Unit,
    /// Handle to a newly posted communication.
    Comm(ActivityId),
    /// Word delivered by a completed receive.
    Payload(u64),
    /// Outcome of a test or trylock; whether a barrier arrival was the
    /// last of its group.
    Bool(bool),
    /// Index of the finished candidate of a wait-any / test-any,
    /// `None` when a test-any found nothing finished.
    Index(Option<usize>),
    /// Result of a random draw.
    Int(i32),
}

/// What an actor receives when its request is answered.
pub type SimcallResult = Result<SimcallValue, ActivityFailure>;
