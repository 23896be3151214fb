//! Mutexes, semaphores, condition variables and barriers.
//!
//! Each blocked acquisition is a synchronisation activity queued FIFO
//! on its object. Hand-off is direct: releasing a mutex (or semaphore
//! unit) gives it to the oldest queued activity and finishes that
//! activity, which answers its waiter. A condition waiter moves from
//! the condition's queue to its mutex's queue when signalled, and only
//! returns once it owns the mutex again. A barrier parks arrivals until
//! the one completing the group releases all of them at once.

use std::collections::VecDeque;

use tracing::debug;

use weft_core::{
    ActivityFailure, ActivityId, ActorId, BarrierId, CallKind, ConditionId, MutexId, SemaphoreId,
    SimcallValue,
};

use crate::activity::{Activity, ActivityKind, Waiter};
use crate::error::{KernelError, ProtocolViolation};
use crate::kernel::Kernel;

// ── Objects ────────────────────────────────────────────────────────

/// A reentrant mutex.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Mutex {
    pub(crate) owner: Option<ActorId>,
    pub(crate) depth: u32,
    pub(crate) queue: VecDeque<ActivityId>,
}

impl Mutex {
    /// Current owner; `None` when free.
    pub fn owner(&self) -> Option<ActorId> {
        self.owner
    }

    /// How many times the owner locked it.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Number of queued acquisitions.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }
}

/// A counting semaphore.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Semaphore {
    pub(crate) value: u32,
    pub(crate) queue: VecDeque<ActivityId>,
}

impl Semaphore {
    pub(crate) fn new(value: u32) -> Self {
        Self {
            value,
            queue: VecDeque::new(),
        }
    }

    /// Units available.
    pub fn value(&self) -> u32 {
        self.value
    }

    /// Number of queued acquisitions.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }
}

/// A condition variable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Condition {
    pub(crate) queue: VecDeque<ActivityId>,
}

impl Condition {
    /// Number of waiters not yet signalled.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }
}

/// A reusable barrier for a fixed number of actors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Barrier {
    pub(crate) expected: u32,
    pub(crate) queue: VecDeque<ActivityId>,
}

impl Barrier {
    pub(crate) fn new(expected: u32) -> Self {
        Self {
            expected,
            queue: VecDeque::new(),
        }
    }

    /// Arrivals that complete one group.
    pub fn expected(&self) -> u32 {
        self.expected
    }

    /// Number of parked arrivals.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }
}

fn unknown(kind: &'static str, id: u32) -> KernelError {
    KernelError::UnknownObject { kind, id }
}

// ── Handlers ───────────────────────────────────────────────────────

impl Kernel {
    fn mutex_mut(&mut self, id: MutexId) -> Result<&mut Mutex, KernelError> {
        self.mutexes.get_mut(id.0 as usize).ok_or(unknown("mutex", id.0))
    }

    fn semaphore_mut(&mut self, id: SemaphoreId) -> Result<&mut Semaphore, KernelError> {
        self.semaphores
            .get_mut(id.0 as usize)
            .ok_or(unknown("semaphore", id.0))
    }

    fn condition_mut(&mut self, id: ConditionId) -> Result<&mut Condition, KernelError> {
        self.conditions
            .get_mut(id.0 as usize)
            .ok_or(unknown("condition", id.0))
    }

    fn barrier_mut(&mut self, id: BarrierId) -> Result<&mut Barrier, KernelError> {
        self.barriers
            .get_mut(id.0 as usize)
            .ok_or(unknown("barrier", id.0))
    }

    /// Create a synchronisation activity with `pid` as its only waiter.
    fn park(&mut self, pid: ActorId, kind: ActivityKind, call: CallKind) -> Result<ActivityId, KernelError> {
        let mut activity = Activity::new(kind);
        activity.register_waiter(Waiter {
            actor: pid,
            call,
            index: 0,
        });
        let id = self.registry.insert(activity)?;
        self.block(pid, call, &[id]);
        Ok(id)
    }

    pub(crate) fn handle_lock(&mut self, pid: ActorId, mutex: MutexId) -> Result<(), KernelError> {
        let m = self.mutex_mut(mutex)?;
        match m.owner {
            None => {
                m.owner = Some(pid);
                m.depth = 1;
            }
            Some(owner) if owner == pid => m.depth += 1,
            Some(_) => {
                let id = self.park(pid, ActivityKind::MutexAcquire { mutex }, CallKind::MutexLock)?;
                self.mutex_mut(mutex)?.queue.push_back(id);
                return Ok(());
            }
        }
        self.answer(pid, Ok(SimcallValue::Unit));
        Ok(())
    }

    pub(crate) fn handle_trylock(&mut self, pid: ActorId, mutex: MutexId) -> Result<(), KernelError> {
        let m = self.mutex_mut(mutex)?;
        let acquired = match m.owner {
            None => {
                m.owner = Some(pid);
                m.depth = 1;
                true
            }
            Some(owner) if owner == pid => {
                m.depth += 1;
                true
            }
            Some(_) => false,
        };
        self.answer(pid, Ok(SimcallValue::Bool(acquired)));
        Ok(())
    }

    pub(crate) fn handle_unlock(&mut self, pid: ActorId, mutex: MutexId) -> Result<(), KernelError> {
        let m = self.mutex_mut(mutex)?;
        if m.owner != Some(pid) {
            return Err(ProtocolViolation::NotMutexOwner { actor: pid, mutex }.into());
        }
        m.depth -= 1;
        if m.depth == 0 {
            self.hand_off(mutex)?;
        }
        self.answer(pid, Ok(SimcallValue::Unit));
        Ok(())
    }

    /// Give a fully released mutex to its oldest live queued acquisition,
    /// or leave it free.
    pub(crate) fn hand_off(&mut self, mutex: MutexId) -> Result<(), KernelError> {
        loop {
            let m = self.mutex_mut(mutex)?;
            let Some(id) = m.queue.pop_front() else {
                m.owner = None;
                m.depth = 0;
                return Ok(());
            };
            let Ok(activity) = self.registry.get_mut(id) else {
                continue;
            };
            if activity.state().is_terminal() {
                continue;
            }
            let Some(actor) = activity.waiters().first().map(|w| w.actor) else {
                continue;
            };
            let (depth, failure) = match activity.kind() {
                ActivityKind::ConditionWait { depth, outcome, .. } => (*depth, *outcome),
                _ => (1, None),
            };
            match failure {
                Some(reason) => activity.fail(reason),
                None => activity.post(),
            }
            let m = self.mutex_mut(mutex)?;
            m.owner = Some(actor);
            m.depth = depth;
            return self.finish(id);
        }
    }

    pub(crate) fn handle_sem_acquire(
        &mut self,
        pid: ActorId,
        sem: SemaphoreId,
        timeout: Option<f64>,
    ) -> Result<(), KernelError> {
        let s = self.semaphore_mut(sem)?;
        if s.value > 0 {
            s.value -= 1;
            self.answer(pid, Ok(SimcallValue::Unit));
            return Ok(());
        }
        let id = self.park(pid, ActivityKind::SemaphoreAcquire { sem }, CallKind::SemAcquire)?;
        self.semaphore_mut(sem)?.queue.push_back(id);
        self.arm_timer(pid, timeout);
        Ok(())
    }

    pub(crate) fn handle_sem_release(&mut self, pid: ActorId, sem: SemaphoreId) -> Result<(), KernelError> {
        loop {
            let s = self.semaphore_mut(sem)?;
            let Some(id) = s.queue.pop_front() else {
                s.value += 1;
                break;
            };
            let Ok(activity) = self.registry.get_mut(id) else {
                continue;
            };
            if activity.state().is_terminal() {
                continue;
            }
            activity.post();
            self.finish(id)?;
            break;
        }
        self.answer(pid, Ok(SimcallValue::Unit));
        Ok(())
    }

    /// Park `pid` at `barrier`, or release the whole group when `pid`
    /// is its last arrival. A barrier expecting 0 or 1 never parks.
    pub(crate) fn handle_barrier_enter(&mut self, pid: ActorId, barrier: BarrierId) -> Result<(), KernelError> {
        let b = self.barrier_mut(barrier)?;
        let arrived = b.queue.len() as u64 + 1;
        if arrived < u64::from(b.expected) {
            let id = self.park(pid, ActivityKind::BarrierWait { barrier }, CallKind::BarrierEnter)?;
            self.barrier_mut(barrier)?.queue.push_back(id);
            return Ok(());
        }
        let released: Vec<ActivityId> = b.queue.drain(..).collect();
        debug!(%barrier, released = released.len(), "barrier opened");
        for id in released {
            let Ok(activity) = self.registry.get_mut(id) else {
                continue;
            };
            if activity.state().is_terminal() {
                continue;
            }
            activity.post();
            self.finish(id)?;
        }
        self.answer(pid, Ok(SimcallValue::Bool(true)));
        Ok(())
    }

    pub(crate) fn handle_cond_wait(
        &mut self,
        pid: ActorId,
        cond: ConditionId,
        mutex: MutexId,
        timeout: Option<f64>,
    ) -> Result<(), KernelError> {
        self.condition_mut(cond)?;
        let m = self.mutex_mut(mutex)?;
        if m.owner != Some(pid) {
            return Err(ProtocolViolation::NotMutexOwner { actor: pid, mutex }.into());
        }
        let depth = m.depth;
        let kind = ActivityKind::ConditionWait {
            cond,
            mutex,
            depth,
            signalled: false,
            outcome: None,
        };
        let id = self.park(pid, kind, CallKind::CondWait)?;
        self.condition_mut(cond)?.queue.push_back(id);
        self.hand_off(mutex)?;
        self.arm_timer(pid, timeout);
        Ok(())
    }

    pub(crate) fn handle_cond_signal(
        &mut self,
        pid: ActorId,
        cond: ConditionId,
        broadcast: bool,
    ) -> Result<(), KernelError> {
        loop {
            let Some(id) = self.condition_mut(cond)?.queue.pop_front() else {
                break;
            };
            let live = self
                .registry
                .get(id)
                .is_ok_and(|a| !a.state().is_terminal());
            if !live {
                continue;
            }
            self.requeue_on_mutex(id, None)?;
            if !broadcast {
                break;
            }
        }
        self.answer(pid, Ok(SimcallValue::Unit));
        Ok(())
    }

    /// Move a condition waiter to its mutex queue. `failure` is what the
    /// waiter receives once the mutex is back (a timeout), `None` for a
    /// plain signal.
    pub(crate) fn requeue_on_mutex(
        &mut self,
        id: ActivityId,
        failure: Option<ActivityFailure>,
    ) -> Result<(), KernelError> {
        let activity = self.registry.get_mut(id)?;
        let waiter = activity.waiters().first().map(|w| w.actor);
        let ActivityKind::ConditionWait {
            mutex,
            signalled,
            outcome,
            ..
        } = &mut activity.kind
        else {
            return Ok(());
        };
        *signalled = true;
        *outcome = failure;
        let mutex = *mutex;
        if let Some(actor) = waiter.and_then(|pid| self.actors.get_mut(&pid)) {
            actor.cancel_timer();
        }
        let m = self.mutex_mut(mutex)?;
        m.queue.push_back(id);
        if m.owner.is_none() {
            self.hand_off(mutex)?;
        }
        Ok(())
    }

    /// Remove a synchronisation or communication activity from whatever
    /// queue references it.
    pub(crate) fn withdraw(&mut self, id: ActivityId) {
        let Ok(activity) = self.registry.get_mut(id) else {
            return;
        };
        match &mut activity.kind {
            ActivityKind::Communication(comm) => {
                if comm.in_mailbox {
                    comm.in_mailbox = false;
                    if let Some(mbox) = self.mailboxes.get_mut(comm.mailbox.0 as usize) {
                        mbox.queue.retain(|q| *q != id);
                    }
                }
            }
            ActivityKind::MutexAcquire { mutex } => {
                if let Some(m) = self.mutexes.get_mut(mutex.0 as usize) {
                    m.queue.retain(|q| *q != id);
                }
            }
            ActivityKind::SemaphoreAcquire { sem } => {
                if let Some(s) = self.semaphores.get_mut(sem.0 as usize) {
                    s.queue.retain(|q| *q != id);
                }
            }
            ActivityKind::ConditionWait { cond, mutex, .. } => {
                if let Some(c) = self.conditions.get_mut(cond.0 as usize) {
                    c.queue.retain(|q| *q != id);
                }
                if let Some(m) = self.mutexes.get_mut(mutex.0 as usize) {
                    m.queue.retain(|q| *q != id);
                }
            }
            ActivityKind::BarrierWait { barrier } => {
                if let Some(b) = self.barriers.get_mut(barrier.0 as usize) {
                    b.queue.retain(|q| *q != id);
                }
            }
            ActivityKind::Other(_) => {}
        }
    }

    /// Release every mutex `pid` owns, handing each to its next waiter.
    pub(crate) fn release_mutexes_of(&mut self, pid: ActorId) -> Result<(), KernelError> {
        let owned: Vec<MutexId> = self
            .mutexes
            .iter()
            .enumerate()
            .filter(|(_, m)| m.owner == Some(pid))
            .map(|(i, _)| MutexId(i as u32))
            .collect();
        for mutex in owned {
            self.hand_off(mutex)?;
        }
        Ok(())
    }

    /// A blocked semaphore or condition wait ran out of time.
    pub(crate) fn expire_sync(&mut self, id: ActivityId) -> Result<(), KernelError> {
        let Ok(activity) = self.registry.get(id) else {
            return Ok(());
        };
        if activity.state().is_terminal() {
            return Ok(());
        }
        match activity.kind() {
            ActivityKind::SemaphoreAcquire { .. } => self.fail_activity(id, ActivityFailure::Timeout),
            ActivityKind::ConditionWait { cond, signalled, .. } => {
                if *signalled {
                    return Ok(());
                }
                let cond = *cond;
                self.condition_mut(cond)?.queue.retain(|q| *q != id);
                self.requeue_on_mutex(id, Some(ActivityFailure::Timeout))
            }
            _ => Ok(()),
        }
    }
}
