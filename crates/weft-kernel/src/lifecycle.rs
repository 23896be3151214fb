//! Activity lifecycle: finishing, cancellation, suspension, ownership
//! release and actor termination.
//!
//! Ownership: the kernel holds one reference from creation until the
//! activity first finishes. Each actor holding a communication handle
//! holds one more; a successful wait or test consumes it. When the last
//! reference goes, the activity is finalized once and its slot freed.

use tracing::debug;
use weft_arena::{ArenaError, Release};
use weft_core::{ActivityFailure, ActivityId, ActorId, CallKind, SimcallResult, SimcallValue};

use crate::activity::{Activity, ActivityKind, ActivityState, OtherKind, Waiter};
use crate::actor::ActorState;
use crate::config::ControlMode;
use crate::error::{KernelError, ProtocolViolation};
use crate::kernel::Kernel;

/// What a finished activity delivers.
#[derive(Clone, Copy, Debug)]
struct Outcome {
    state: ActivityState,
    destination: Option<ActorId>,
    payload: u64,
}

impl Outcome {
    fn of(activity: &Activity) -> Self {
        let (destination, payload) = activity
            .comm()
            .map_or((None, 0), |c| (c.destination_actor, c.payload));
        Self {
            state: activity.state(),
            destination,
            payload,
        }
    }

    fn result_for(&self, waiter: &Waiter) -> SimcallResult {
        match (waiter.call, self.state) {
            (CallKind::CommWaitAny | CallKind::CommTestAny, _) => {
                Ok(SimcallValue::Index(Some(waiter.index)))
            }
            (_, ActivityState::Failed(reason)) => Err(reason),
            (CallKind::CommWait, _) if self.destination == Some(waiter.actor) => {
                Ok(SimcallValue::Payload(self.payload))
            }
            (CallKind::CommTest, _) => Ok(SimcallValue::Bool(true)),
            // Released by another arrival.
            (CallKind::BarrierEnter, _) => Ok(SimcallValue::Bool(false)),
            _ => Ok(SimcallValue::Unit),
        }
    }
}

impl Kernel {
    // ── Finish ─────────────────────────────────────────────────────

    /// Deliver a terminal activity's outcome to every waiter, in FIFO
    /// order, and drop the kernel's reference the first time.
    ///
    /// Does nothing while the activity is not terminal. Running it again
    /// later only serves waiters registered since.
    pub(crate) fn finish(&mut self, id: ActivityId) -> Result<(), KernelError> {
        let (waiters, outcome, first) = {
            let activity = self.registry.get_mut(id)?;
            if !activity.state().is_terminal() {
                return Ok(());
            }
            (activity.take_waiters(), Outcome::of(activity), activity.kernel_ref)
        };
        if first {
            debug!(activity = %id, state = ?outcome.state, waiters = waiters.len(), "activity finished");
        }
        for waiter in &waiters {
            self.deliver(id, waiter, &outcome)?;
        }
        if first {
            if let Ok(activity) = self.registry.get_mut(id) {
                activity.kernel_ref = false;
                for observer in &mut self.observers {
                    observer.on_finished(id, activity);
                }
            }
            self.release_ref(id)?;
        }
        Ok(())
    }

    fn deliver(&mut self, id: ActivityId, waiter: &Waiter, outcome: &Outcome) -> Result<(), KernelError> {
        let result = outcome.result_for(waiter);
        self.answer(waiter.actor, result);
        if matches!(waiter.call, CallKind::CommWait | CallKind::CommTest) {
            self.release_handle(waiter.actor, id)?;
        }
        Ok(())
    }

    // ── Failure & cancellation ─────────────────────────────────────

    /// Force `Failed(reason)`, withdraw from queues, and finish.
    pub(crate) fn fail_activity(&mut self, id: ActivityId, reason: ActivityFailure) -> Result<(), KernelError> {
        if self.registry.get(id)?.state().is_terminal() {
            return Ok(());
        }
        self.withdraw(id);
        self.registry.get_mut(id)?.fail(reason);
        self.finish(id)
    }

    pub(crate) fn cancel_inner(&mut self, id: ActivityId) -> Result<(), KernelError> {
        debug!(activity = %id, "cancel");
        self.fail_activity(id, ActivityFailure::Cancelled)
    }

    pub(crate) fn suspend_inner(&mut self, id: ActivityId) -> Result<(), KernelError> {
        let now = self.clock;
        let activity = self.registry.get_mut(id)?;
        if activity.suspended || activity.state().is_terminal() {
            return Ok(());
        }
        activity.suspended = true;
        if let Some(action) = activity.backing.as_mut() {
            action.suspend(now);
        }
        debug!(activity = %id, category = activity.tracing_category(), "suspended");
        for observer in &mut self.observers {
            observer.on_suspended(id, activity);
        }
        Ok(())
    }

    pub(crate) fn resume_inner(&mut self, id: ActivityId) -> Result<(), KernelError> {
        let now = self.clock;
        let activity = self.registry.get_mut(id)?;
        if !activity.suspended || activity.state().is_terminal() {
            return Ok(());
        }
        activity.suspended = false;
        if let Some(action) = activity.backing.as_mut() {
            action.resume(now);
        }
        debug!(activity = %id, category = activity.tracing_category(), "resumed");
        for observer in &mut self.observers {
            observer.on_resumed(id, activity);
        }
        Ok(())
    }

    /// Cancel an activity: every waiter receives `Err(Cancelled)`.
    pub fn cancel_activity(&mut self, id: ActivityId) -> Result<(), KernelError> {
        self.ensure_live()?;
        let result = self.cancel_inner(id);
        self.guard(result)
    }

    /// Pause an activity's backing computation. Waiters stay attached.
    pub fn suspend_activity(&mut self, id: ActivityId) -> Result<(), KernelError> {
        self.ensure_live()?;
        let result = self.suspend_inner(id);
        self.guard(result)
    }

    /// Resume a suspended activity.
    pub fn resume_activity(&mut self, id: ActivityId) -> Result<(), KernelError> {
        self.ensure_live()?;
        let result = self.resume_inner(id);
        self.guard(result)
    }

    /// Mutable access to a live activity, to set its name or tracing
    /// category.
    pub fn activity_mut(&mut self, id: ActivityId) -> Option<&mut Activity> {
        self.registry.get_mut(id).ok()
    }

    // ── Ownership ──────────────────────────────────────────────────

    /// Register an external owner of a live activity.
    pub fn acquire_activity(&mut self, id: ActivityId) -> Result<u32, KernelError> {
        self.ensure_live()?;
        let result = self.registry.acquire(id).map_err(KernelError::from);
        self.guard(result)
    }

    /// Drop an external owner. The last release finalizes the activity.
    ///
    /// # Errors
    ///
    /// [`ProtocolViolation::OverRelease`] when the activity is already
    /// gone; fatal.
    pub fn release_activity(&mut self, id: ActivityId) -> Result<(), KernelError> {
        self.ensure_live()?;
        let result = self.release_ref(id);
        self.guard(result)
    }

    pub(crate) fn release_ref(&mut self, id: ActivityId) -> Result<(), KernelError> {
        match self.registry.release(id) {
            Ok(Release::Retained { .. }) => Ok(()),
            Ok(Release::Last(activity)) => self.finalize(id, activity),
            Err(ArenaError::StaleHandle { .. }) => {
                Err(ProtocolViolation::OverRelease { activity: id }.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn release_handle(&mut self, pid: ActorId, id: ActivityId) -> Result<(), KernelError> {
        let Some(record) = self.actors.get_mut(&pid) else {
            return Err(KernelError::UnknownActor(pid));
        };
        if record.is_terminated() {
            return Ok(());
        }
        if !record.drop_handle(id) {
            return Err(ProtocolViolation::HandleNotHeld {
                actor: pid,
                activity: id,
            }
            .into());
        }
        self.release_ref(id)
    }

    /// Run once when the last owner lets go.
    ///
    /// The slot is already gone, so a still-live activity is completed
    /// (or cancelled) in place and its remaining waiters answered
    /// directly.
    fn finalize(&mut self, id: ActivityId, mut activity: Activity) -> Result<(), KernelError> {
        if !activity.state().is_terminal() {
            self.withdraw_kind(id, activity.kind());
            let completed = activity
                .backing
                .as_ref()
                .is_some_and(|b| b.is_complete(self.clock));
            if completed {
                activity.post();
            } else {
                activity.fail(ActivityFailure::Cancelled);
            }
        }
        let outcome = Outcome::of(&activity);
        for waiter in activity.take_waiters() {
            self.answer(waiter.actor, outcome.result_for(&waiter));
        }
        debug!(activity = %id, name = activity.name(), "activity destroyed");
        for observer in &mut self.observers {
            observer.on_destroyed(id);
        }
        Ok(())
    }

    /// Queue cleanup for an activity no longer in the registry.
    fn withdraw_kind(&mut self, id: ActivityId, kind: &ActivityKind) {
        let retain = |q: &ActivityId| *q != id;
        match kind {
            ActivityKind::Communication(comm) => {
                if let Some(mbox) = self.mailboxes.get_mut(comm.mailbox.0 as usize) {
                    mbox.queue.retain(retain);
                }
            }
            ActivityKind::MutexAcquire { mutex } | ActivityKind::ConditionWait { mutex, .. } => {
                if let Some(m) = self.mutexes.get_mut(mutex.0 as usize) {
                    m.queue.retain(retain);
                }
                if let ActivityKind::ConditionWait { cond, .. } = kind {
                    if let Some(c) = self.conditions.get_mut(cond.0 as usize) {
                        c.queue.retain(retain);
                    }
                }
            }
            ActivityKind::SemaphoreAcquire { sem } => {
                if let Some(s) = self.semaphores.get_mut(sem.0 as usize) {
                    s.queue.retain(retain);
                }
            }
            ActivityKind::BarrierWait { barrier } => {
                if let Some(b) = self.barriers.get_mut(barrier.0 as usize) {
                    b.queue.retain(retain);
                }
            }
            ActivityKind::Other(_) => {}
        }
    }

    // ── Computations & timeouts ────────────────────────────────────

    /// Execute / Sleep. Answered at once under verifier or replay
    /// control.
    pub(crate) fn handle_other(&mut self, pid: ActorId, call: CallKind, amount: f64) -> Result<(), KernelError> {
        if self.config.control != ControlMode::Standalone {
            self.answer(pid, Ok(SimcallValue::Unit));
            return Ok(());
        }
        let now = self.clock;
        let (flavour, backing) = if call == CallKind::Execute {
            (OtherKind::Execution, self.model.execute(now, amount))
        } else {
            (OtherKind::Sleep, self.model.sleep(now, amount))
        };
        let mut activity = Activity::new(ActivityKind::Other(flavour));
        activity.state = ActivityState::Ready;
        activity.backing = Some(backing);
        activity.register_waiter(Waiter {
            actor: pid,
            call,
            index: 0,
        });
        let id = self.registry.insert(activity)?;
        self.block(pid, call, &[id]);
        Ok(())
    }

    /// A blocked actor's timeout completed before its activity.
    pub(crate) fn expire_timer(&mut self, pid: ActorId) -> Result<(), KernelError> {
        let Some(record) = self.actors.get_mut(&pid) else {
            return Ok(());
        };
        record.timer = None;
        let ActorState::Blocked(on) = record.state.clone() else {
            return Ok(());
        };
        debug!(actor = %pid, call = %on.kind, "timeout");
        match on.kind {
            CallKind::CommWait => match on.activities.first() {
                Some(&id) => self.fail_activity(id, ActivityFailure::Timeout),
                None => Ok(()),
            },
            CallKind::CommWaitAny => {
                self.answer(pid, Err(ActivityFailure::Timeout));
                Ok(())
            }
            CallKind::SemAcquire | CallKind::CondWait => match on.activities.first() {
                Some(&id) => self.expire_sync(id),
                None => Ok(()),
            },
            _ => Ok(()),
        }
    }

    // ── Termination ────────────────────────────────────────────────

    /// Terminate an actor.
    ///
    /// It leaves every waiter list; synchronisation activities it was
    /// queued in are cancelled; communications it takes part in fail
    /// with `PeerGone` for the other side, except its detached sends,
    /// which only lose their source; its handles are released and the
    /// mutexes it owns handed on.
    pub fn kill(&mut self, pid: ActorId) -> Result<(), KernelError> {
        self.ensure_live()?;
        let result = self.terminate(pid);
        self.guard(result)
    }

    pub(crate) fn terminate(&mut self, pid: ActorId) -> Result<(), KernelError> {
        let record = self.actor_mut(pid)?;
        if record.is_terminated() {
            return Ok(());
        }
        let previous = std::mem::replace(&mut record.state, ActorState::Terminated);
        record.request = None;
        record.result = None;
        record.code = None;
        record.cancel_timer();
        let handles = std::mem::take(&mut record.handles);
        self.to_run.shift_remove(&pid);
        debug!(actor = %pid, "terminated");

        if let ActorState::Blocked(on) = previous {
            for id in on.activities {
                let Ok(activity) = self.registry.get_mut(id) else {
                    continue;
                };
                activity.remove_waiter(pid);
                if !matches!(activity.kind(), ActivityKind::Communication(_)) {
                    self.fail_activity(id, ActivityFailure::Cancelled)?;
                }
            }
        }

        let involved: Vec<ActivityId> = self
            .registry
            .iter()
            .filter(|(_, a)| !a.state().is_terminal())
            .filter(|(_, a)| a.comm().is_some_and(|c| c.involves(pid)))
            .map(|(id, _)| id)
            .collect();
        for id in involved {
            let activity = self.registry.get_mut(id)?;
            let detached_source = activity
                .comm()
                .is_some_and(|c| c.is_detached && c.source_actor == Some(pid));
            if detached_source {
                if let Some(comm) = activity.comm_mut() {
                    comm.source_actor = None;
                }
            } else {
                self.fail_activity(id, ActivityFailure::PeerGone)?;
            }
        }

        for id in handles {
            self.release_ref(id)?;
        }
        self.release_mutexes_of(pid)
    }
}
