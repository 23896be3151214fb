//! The kernel: actor table, activity registry and scheduling rounds.
//!
//! One [`Kernel`] value holds the whole state of one simulated run:
//! actors, activities, synchronisation objects, the clock and the
//! random oracle. Nothing is process-global, so independent kernels can
//! coexist (the explorer builds a fresh one per execution).
//!
//! # Rounds
//!
//! ```text
//! ready set (sorted) ──run each actor one slice──▶ one request per actor
//!        ▲                                               │
//!        │                              service invisible requests
//!        │                              (standalone: all requests)
//!        └────────── answers mark issuers runnable ◀─────┘
//! ```
//!
//! In verifier mode rounds repeat until nobody is ready, leaving only
//! visible requests pending; the driver then picks one with
//! [`fire`](Kernel::fire). In standalone mode [`run`](Kernel::run)
//! services everything and advances the clock to the next completion.

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, error, info, trace, warn};
use weft_arena::Registry;
use weft_core::{
    is_visible, ActivityId, ActorCode, ActorId, BarrierId, Call, CallKind, ConditionId, MailboxId, MutexId,
    Request, ResourceModel, RoundId, SemaphoreId, SimcallResult, SimcallValue, Step, Wakeup,
};
use weft_replay::{RandomOracle, RecordTrace, Transition};

use crate::activity::Activity;
use crate::actor::{ActorRecord, ActorState, BlockedOn};
use crate::comm::Mailbox;
use crate::config::{ConfigError, ControlMode, KernelConfig};
use crate::error::{KernelError, ProtocolViolation};
use crate::model::ConstantModel;
use crate::observer::KernelObserver;
use crate::sync::{Barrier, Condition, Mutex, Semaphore};

/// How a standalone [`run`](Kernel::run) ended.
#[derive(Clone, Debug, PartialEq)]
pub enum RunOutcome {
    /// Every actor exited.
    Completed {
        /// Simulated time at the end.
        clock: f64,
    },
    /// Some actors are blocked and nothing left can complete.
    Deadlock {
        /// Simulated time at detection.
        clock: f64,
        /// Actors still alive, in id order.
        blocked: Vec<ActorId>,
    },
    /// `max_rounds` was reached.
    RoundLimit {
        /// Simulated time when the budget ran out.
        clock: f64,
    },
}

/// A pending visible request, as listed for the verifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingRequest {
    /// Issuer.
    pub actor: ActorId,
    /// Call kind.
    pub kind: CallKind,
    /// Whether it may be fired now.
    pub enabled: bool,
}

/// State of one simulated run.
pub struct Kernel {
    pub(crate) config: KernelConfig,
    pub(crate) clock: f64,
    round: RoundId,
    pub(crate) registry: Registry<Activity>,
    pub(crate) actors: IndexMap<ActorId, ActorRecord>,
    next_pid: u32,
    pub(crate) to_run: IndexSet<ActorId>,
    pub(crate) mailboxes: Vec<Mailbox>,
    pub(crate) mutexes: Vec<Mutex>,
    pub(crate) semaphores: Vec<Semaphore>,
    pub(crate) conditions: Vec<Condition>,
    pub(crate) barriers: Vec<Barrier>,
    pub(crate) model: Box<dyn ResourceModel>,
    random: RandomOracle,
    history: Vec<(ActorId, CallKind)>,
    transitions: Vec<Transition>,
    pub(crate) observers: Vec<Box<dyn KernelObserver>>,
    halted: bool,
    sync_notice_logged: bool,
}

impl Kernel {
    /// Build a kernel with the default [`ConstantModel`].
    pub fn new(config: KernelConfig) -> Result<Self, ConfigError> {
        Self::with_model(config, Box::new(ConstantModel::default()))
    }

    /// Build a kernel over a given resource model.
    pub fn with_model(
        config: KernelConfig,
        model: Box<dyn ResourceModel>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let registry = Registry::new(&config.registry)?;
        let random = match &config.control {
            ControlMode::Standalone => RandomOracle::free(config.seed),
            ControlMode::Verifier => RandomOracle::verifier(),
            ControlMode::Replay(draws) => RandomOracle::replay(draws.clone()),
        };
        Ok(Self {
            config,
            clock: 0.0,
            round: RoundId::default(),
            registry,
            actors: IndexMap::new(),
            next_pid: 1,
            to_run: IndexSet::new(),
            mailboxes: Vec::new(),
            mutexes: Vec::new(),
            semaphores: Vec::new(),
            conditions: Vec::new(),
            barriers: Vec::new(),
            model,
            random,
            history: Vec::new(),
            transitions: Vec::new(),
            observers: Vec::new(),
            halted: false,
            sync_notice_logged: false,
        })
    }

    // ── Setup ──────────────────────────────────────────────────────

    /// Add an actor running `code`. Pids are sequential from 1.
    pub fn spawn(&mut self, name: impl Into<String>, code: impl ActorCode + 'static) -> ActorId {
        self.add_actor(name.into(), Some(Box::new(code)))
    }

    /// Add an actor driven from outside through [`issue`](Self::issue)
    /// and [`take_result`](Self::take_result).
    pub fn spawn_external(&mut self, name: impl Into<String>) -> ActorId {
        self.add_actor(name.into(), None)
    }

    fn add_actor(&mut self, name: String, code: Option<Box<dyn ActorCode>>) -> ActorId {
        let pid = ActorId(self.next_pid);
        self.next_pid += 1;
        self.actors.insert(pid, ActorRecord::new(name, code));
        self.to_run.insert(pid);
        trace!(actor = %pid, "spawned");
        pid
    }

    /// Create a mailbox.
    pub fn create_mailbox(&mut self) -> MailboxId {
        self.mailboxes.push(Mailbox::default());
        MailboxId(self.mailboxes.len() as u32 - 1)
    }

    /// Create a free reentrant mutex.
    pub fn create_mutex(&mut self) -> MutexId {
        self.mutexes.push(Mutex::default());
        MutexId(self.mutexes.len() as u32 - 1)
    }

    /// Create a semaphore holding `initial` units.
    pub fn create_semaphore(&mut self, initial: u32) -> SemaphoreId {
        self.semaphores.push(Semaphore::new(initial));
        SemaphoreId(self.semaphores.len() as u32 - 1)
    }

    /// Create a condition variable.
    pub fn create_condition(&mut self) -> ConditionId {
        self.conditions.push(Condition::default());
        ConditionId(self.conditions.len() as u32 - 1)
    }

    /// Create a barrier released once `expected` actors entered it.
    pub fn create_barrier(&mut self, expected: u32) -> BarrierId {
        self.barriers.push(Barrier::new(expected));
        BarrierId(self.barriers.len() as u32 - 1)
    }

    /// Register a lifecycle observer.
    pub fn add_observer(&mut self, observer: Box<dyn KernelObserver>) {
        self.observers.push(observer);
    }

    // ── Queries ────────────────────────────────────────────────────

    /// The configuration this kernel was built with.
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Current simulated time.
    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// Number of rounds run so far.
    pub fn round(&self) -> RoundId {
        self.round
    }

    /// Whether a fatal error halted the kernel.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// A live activity.
    pub fn activity(&self, id: ActivityId) -> Option<&Activity> {
        self.registry.get(id).ok()
    }

    /// Owner count of a live activity.
    pub fn refcount(&self, id: ActivityId) -> Option<u32> {
        self.registry.refcount(id).ok()
    }

    /// Number of live activities.
    pub fn live_activities(&self) -> usize {
        self.registry.len()
    }

    /// Scheduling state of an actor.
    pub fn actor_state(&self, pid: ActorId) -> Option<&ActorState> {
        self.actors.get(&pid).map(|r| &r.state)
    }

    /// Name given at spawn.
    pub fn actor_name(&self, pid: ActorId) -> Option<&str> {
        self.actors.get(&pid).map(|r| r.name.as_str())
    }

    /// Outstanding, not yet serviced request of an actor.
    pub fn request(&self, pid: ActorId) -> Option<&Request> {
        self.actors.get(&pid).and_then(|r| r.request.as_ref())
    }

    /// Communication handles an actor currently holds.
    pub fn handles(&self, pid: ActorId) -> &[ActivityId] {
        self.actors.get(&pid).map_or(&[], |r| r.handles.as_slice())
    }

    /// All pids, in id order.
    pub fn actor_ids(&self) -> impl Iterator<Item = ActorId> + '_ {
        self.actors.keys().copied()
    }

    /// Actors that have not terminated, in id order.
    pub fn live_actors(&self) -> Vec<ActorId> {
        self.actors
            .iter()
            .filter(|(_, r)| !r.is_terminated())
            .map(|(pid, _)| *pid)
            .collect()
    }

    /// Whether every actor terminated.
    pub fn is_finished(&self) -> bool {
        self.actors.values().all(ActorRecord::is_terminated)
    }

    /// A mutex.
    pub fn mutex(&self, id: MutexId) -> Option<&Mutex> {
        self.mutexes.get(id.0 as usize)
    }

    /// A semaphore.
    pub fn semaphore(&self, id: SemaphoreId) -> Option<&Semaphore> {
        self.semaphores.get(id.0 as usize)
    }

    /// A condition variable.
    pub fn condition(&self, id: ConditionId) -> Option<&Condition> {
        self.conditions.get(id.0 as usize)
    }

    /// A barrier.
    pub fn barrier(&self, id: BarrierId) -> Option<&Barrier> {
        self.barriers.get(id.0 as usize)
    }

    /// Communications queued in a mailbox, oldest first.
    pub fn mailbox_queue(&self, id: MailboxId) -> Option<Vec<ActivityId>> {
        self.mailboxes
            .get(id.0 as usize)
            .map(|m| m.queue.iter().copied().collect())
    }

    /// Every `(actor, call kind)` issued so far, in issue order.
    pub fn history(&self) -> &[(ActorId, CallKind)] {
        &self.history
    }

    /// Transitions fired by the verifier so far.
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Replayable record of this run: the seed, every random draw the
    /// kernel served, and every fired transition.
    pub fn record_trace(&self) -> RecordTrace {
        RecordTrace {
            seed: self.config.seed,
            draws: self.random.recorded().to_vec(),
            transitions: self.transitions.clone(),
        }
    }

    /// Answer of an externally driven actor's last request.
    pub fn take_result(&mut self, pid: ActorId) -> Option<SimcallResult> {
        self.actors.get_mut(&pid).and_then(|r| r.result.take())
    }

    // ── Fatal errors ───────────────────────────────────────────────

    pub(crate) fn ensure_live(&self) -> Result<(), KernelError> {
        if self.halted {
            Err(KernelError::Halted)
        } else {
            Ok(())
        }
    }

    /// Halt on any error escaping an entry point.
    pub(crate) fn guard<T>(&mut self, result: Result<T, KernelError>) -> Result<T, KernelError> {
        if let Err(e) = &result {
            if !matches!(e, KernelError::Halted) {
                error!(error = %e, "kernel halted");
                self.halted = true;
            }
        }
        result
    }

    pub(crate) fn actor_mut(&mut self, pid: ActorId) -> Result<&mut ActorRecord, KernelError> {
        self.actors.get_mut(&pid).ok_or(KernelError::UnknownActor(pid))
    }

    // ── Requests ───────────────────────────────────────────────────

    /// Deliver one request on behalf of `pid`.
    ///
    /// # Errors
    ///
    /// [`ProtocolViolation::RequestAlreadyPending`] if the actor already
    /// has an outstanding or blocked request,
    /// [`ProtocolViolation::InvalidRandomRange`] for a draw with
    /// `min > max`, and [`ProtocolViolation::RandomSpanTooWide`] for a
    /// verifier-controlled draw wider than `max_random_branching`. All
    /// fatal.
    pub fn issue(&mut self, pid: ActorId, call: Call) -> Result<(), KernelError> {
        self.ensure_live()?;
        let result = self.issue_inner(pid, call);
        if result.is_ok() {
            // Picked up by the next round, which services it.
            self.to_run.insert(pid);
        }
        self.guard(result)
    }

    fn issue_inner(&mut self, pid: ActorId, call: Call) -> Result<(), KernelError> {
        let verifier = self.config.control.is_verifier();
        let branching = self.config.max_random_branching;
        let record = self.actor_mut(pid)?;
        match record.state {
            ActorState::Runnable => {}
            ActorState::Terminated => {
                return Err(ProtocolViolation::ActorTerminated { actor: pid }.into())
            }
            ActorState::Pending | ActorState::Blocked(_) => {
                return Err(ProtocolViolation::RequestAlreadyPending { actor: pid }.into())
            }
        }
        if let Call::McRandom { min, max } = call {
            check_random_range(pid, min, max, verifier.then_some(branching))?;
        }
        let kind = call.kind();
        record.request = Some(Request::new(pid, call));
        record.state = ActorState::Pending;
        record.result = None;
        self.history.push((pid, kind));
        trace!(actor = %pid, %kind, "issued");
        if verifier
            && matches!(kind, CallKind::SemAcquire | CallKind::CondWait)
            && !self.sync_notice_logged
        {
            self.sync_notice_logged = true;
            info!(
                always_enabled = self.config.experimental_sync_enabled,
                "semaphore and condition enabledness under verifier control is approximate"
            );
        }
        Ok(())
    }

    /// Answer `pid`'s request and mark it runnable.
    pub(crate) fn answer(&mut self, pid: ActorId, result: SimcallResult) {
        let Some(record) = self.actors.get_mut(&pid) else {
            return;
        };
        if record.is_terminated() {
            return;
        }
        let previous = std::mem::replace(&mut record.state, ActorState::Runnable);
        record.request = None;
        record.result = Some(result);
        record.cancel_timer();
        if let ActorState::Blocked(on) = previous {
            for id in on.activities {
                if let Ok(activity) = self.registry.get_mut(id) {
                    activity.remove_waiter(pid);
                }
            }
        }
        self.to_run.insert(pid);
    }

    /// Park `pid` on `activities` after its request was serviced.
    pub(crate) fn block(&mut self, pid: ActorId, kind: CallKind, activities: &[ActivityId]) {
        if let Some(record) = self.actors.get_mut(&pid) {
            record.request = None;
            record.state = ActorState::Blocked(BlockedOn {
                kind,
                activities: activities.iter().copied().collect(),
            });
        }
    }

    /// Start a timeout timer for a blocked actor (standalone only).
    pub(crate) fn arm_timer(&mut self, pid: ActorId, timeout: Option<f64>) {
        let Some(duration) = timeout else {
            return;
        };
        if self.config.control.is_verifier() {
            return;
        }
        let timer = self.model.sleep(self.clock, duration);
        if let Some(record) = self.actors.get_mut(&pid) {
            record.timer = Some(timer);
        }
    }

    // ── Rounds ─────────────────────────────────────────────────────

    fn run_actor(&mut self, pid: ActorId) -> Result<(), KernelError> {
        let now = self.clock;
        let (code, result) = {
            let record = self.actor_mut(pid)?;
            if record.state != ActorState::Runnable {
                return Ok(());
            }
            (record.code.take(), record.result.take())
        };
        let Some(mut code) = code else {
            // Externally driven: hand the answer back for take_result.
            if let Some(record) = self.actors.get_mut(&pid) {
                record.result = result;
            }
            return Ok(());
        };
        trace!(actor = %pid, now, "resume");
        let step = code.resume(Wakeup { pid, now, result });
        if let Some(record) = self.actors.get_mut(&pid) {
            record.code = Some(code);
        }
        match step {
            Step::Call(call) => self.issue_inner(pid, call),
            Step::Exit => self.terminate(pid),
        }
    }

    fn round_budget_spent(&self) -> bool {
        self.config
            .max_rounds
            .is_some_and(|max| self.round.0 >= max)
    }

    /// One round: run every ready actor in id order, then service the
    /// requests of those that ran (every request when `service_all`,
    /// otherwise only invisible ones).
    fn run_round(&mut self, service_all: bool) -> Result<(), KernelError> {
        self.round = RoundId(self.round.0 + 1);
        let mut ready: Vec<ActorId> = self.to_run.drain(..).collect();
        ready.sort_unstable();
        trace!(round = %self.round, actors = ready.len(), "round");
        for &pid in &ready {
            self.run_actor(pid)?;
        }
        for &pid in &ready {
            let service = self.actors.get(&pid).is_some_and(|r| {
                r.state == ActorState::Pending
                    && r.request
                        .as_ref()
                        .is_some_and(|req| service_all || !is_visible(req))
            });
            if service {
                self.handle(pid, 0)?;
            }
        }
        Ok(())
    }

    /// Run rounds until no actor is ready, servicing invisible requests.
    /// Only visible requests remain pending afterwards.
    pub fn wait_for_requests(&mut self) -> Result<(), KernelError> {
        self.ensure_live()?;
        let result = self.wait_for_requests_inner();
        self.guard(result)
    }

    fn wait_for_requests_inner(&mut self) -> Result<(), KernelError> {
        while !self.to_run.is_empty() {
            if self.round_budget_spent() {
                return Err(KernelError::RoundLimit {
                    limit: self.round.0,
                });
            }
            self.run_round(false)?;
        }
        Ok(())
    }

    /// Run to completion without a verifier.
    ///
    /// Every request is serviced as issued; when nobody is ready the
    /// clock jumps to the next computation completion or timeout.
    pub fn run(&mut self) -> Result<RunOutcome, KernelError> {
        self.ensure_live()?;
        if self.config.control.is_verifier() {
            let err = KernelError::WrongMode { operation: "run" };
            return self.guard(Err(err));
        }
        let result = self.run_inner();
        self.guard(result)
    }

    fn run_inner(&mut self) -> Result<RunOutcome, KernelError> {
        loop {
            while !self.to_run.is_empty() {
                if self.round_budget_spent() {
                    return Ok(RunOutcome::RoundLimit { clock: self.clock });
                }
                self.run_round(true)?;
            }
            if self.is_finished() {
                debug!(clock = self.clock, "all actors exited");
                return Ok(RunOutcome::Completed { clock: self.clock });
            }
            let Some(next) = self.next_event_time() else {
                let blocked = self.live_actors();
                warn!(clock = self.clock, blocked = blocked.len(), "deadlock");
                return Ok(RunOutcome::Deadlock {
                    clock: self.clock,
                    blocked,
                });
            };
            self.clock = next.max(self.clock);
            self.process_completions()?;
        }
    }

    fn next_event_time(&self) -> Option<f64> {
        let activities = self
            .registry
            .iter()
            .filter(|(_, a)| !a.state.is_terminal() && !a.suspended)
            .filter_map(|(_, a)| a.backing.as_ref().and_then(|b| b.completion_time()));
        let timers = self
            .actors
            .values()
            .filter_map(|r| r.timer.as_ref().and_then(|t| t.completion_time()));
        activities.chain(timers).min_by(f64::total_cmp)
    }

    /// Finish every computation complete at the current clock, then
    /// expire due timeouts.
    fn process_completions(&mut self) -> Result<(), KernelError> {
        let now = self.clock;
        let done: Vec<ActivityId> = self
            .registry
            .iter()
            .filter(|(_, a)| {
                !a.state.is_terminal()
                    && !a.suspended
                    && a.backing.as_ref().is_some_and(|b| b.is_complete(now))
            })
            .map(|(id, _)| id)
            .collect();
        for id in done {
            self.registry.get_mut(id)?.post();
            self.finish(id)?;
        }
        let expired: Vec<ActorId> = self
            .actors
            .iter()
            .filter(|(_, r)| r.timer.as_ref().is_some_and(|t| t.is_complete(now)))
            .map(|(pid, _)| *pid)
            .collect();
        for pid in expired {
            self.expire_timer(pid)?;
        }
        Ok(())
    }

    // ── Verifier interface ─────────────────────────────────────────

    /// Pending visible requests, in actor order.
    pub fn pending(&self) -> Vec<PendingRequest> {
        self.actors
            .iter()
            .filter(|(_, r)| r.state == ActorState::Pending)
            .filter_map(|(pid, r)| r.request.as_ref().map(|req| (*pid, req)))
            .filter(|(_, req)| is_visible(req))
            .map(|(pid, req)| PendingRequest {
                actor: pid,
                kind: req.kind(),
                enabled: crate::enabled::is_enabled(self, req),
            })
            .collect()
    }

    /// Service `pid`'s pending visible request with `value`, then run
    /// rounds until only visible requests remain.
    ///
    /// `value` must be one of [`transition_values`](Self::transition_values).
    ///
    /// # Errors
    ///
    /// [`ProtocolViolation::DisabledTransition`] when the request is not
    /// enabled or the value is not offered; fatal.
    pub fn fire(&mut self, pid: ActorId, value: i32) -> Result<(), KernelError> {
        self.ensure_live()?;
        let result = self.fire_inner(pid, value);
        self.guard(result)
    }

    fn fire_inner(&mut self, pid: ActorId, value: i32) -> Result<(), KernelError> {
        if !self.config.control.is_verifier() {
            return Err(KernelError::WrongMode { operation: "fire" });
        }
        let record = self.actors.get(&pid).ok_or(KernelError::UnknownActor(pid))?;
        let kind = match (&record.state, &record.request) {
            (ActorState::Pending, Some(req)) if is_visible(req) => req.kind(),
            _ => return Err(ProtocolViolation::NoPendingRequest { actor: pid }.into()),
        };
        if !self.transition_values(pid).contains(&value) {
            return Err(ProtocolViolation::DisabledTransition {
                actor: pid,
                kind,
                value,
            }
            .into());
        }
        debug!(actor = %pid, %kind, value, "fire");
        self.transitions.push(Transition { actor: pid, value });
        self.handle(pid, value)?;
        self.wait_for_requests_inner()
    }

    // ── Servicing ──────────────────────────────────────────────────

    /// Service `pid`'s pending request. `value` is the verifier's choice
    /// (outcome of a wait, candidate index, random draw); 0 otherwise.
    pub(crate) fn handle(&mut self, pid: ActorId, value: i32) -> Result<(), KernelError> {
        let Some(request) = self.actor_mut(pid)?.request.clone() else {
            return Ok(());
        };
        match request.call {
            Call::CommIsend {
                mailbox,
                size,
                payload,
                detached,
            } => self.handle_isend(pid, mailbox, size, payload, detached),
            Call::CommIrecv { mailbox } => self.handle_irecv(pid, mailbox),
            Call::CommWait { comm, timeout } => self.handle_wait(pid, comm, timeout, value),
            Call::CommWaitAny { comms, timeout } => {
                self.handle_waitany(pid, &comms, timeout, value)
            }
            Call::CommTest { comm } => self.handle_test(pid, comm),
            Call::CommTestAny { comms } => self.handle_testany(pid, &comms, value),
            Call::McRandom { min, max } => self.handle_random(pid, min, max, value),
            Call::MutexLock { mutex } => self.handle_lock(pid, mutex),
            Call::MutexTrylock { mutex } => self.handle_trylock(pid, mutex),
            Call::MutexUnlock { mutex } => self.handle_unlock(pid, mutex),
            Call::SemAcquire { sem, timeout } => self.handle_sem_acquire(pid, sem, timeout),
            Call::SemRelease { sem } => self.handle_sem_release(pid, sem),
            Call::CondWait {
                cond,
                mutex,
                timeout,
            } => self.handle_cond_wait(pid, cond, mutex, timeout),
            Call::CondSignal { cond } => self.handle_cond_signal(pid, cond, false),
            Call::CondBroadcast { cond } => self.handle_cond_signal(pid, cond, true),
            Call::BarrierEnter { barrier } => self.handle_barrier_enter(pid, barrier),
            Call::Execute { flops } => self.handle_other(pid, CallKind::Execute, flops),
            Call::Sleep { duration } => self.handle_other(pid, CallKind::Sleep, duration),
            Call::ActivityCancel { activity } => {
                self.cancel_inner(activity)?;
                self.answer(pid, Ok(SimcallValue::Unit));
                Ok(())
            }
            Call::ActivitySuspend { activity } => {
                self.suspend_inner(activity)?;
                self.answer(pid, Ok(SimcallValue::Unit));
                Ok(())
            }
            Call::ActivityResume { activity } => {
                self.resume_inner(activity)?;
                self.answer(pid, Ok(SimcallValue::Unit));
                Ok(())
            }
        }
    }

    fn handle_random(
        &mut self,
        pid: ActorId,
        min: i32,
        max: i32,
        value: i32,
    ) -> Result<(), KernelError> {
        let drawn = if self.config.control.is_verifier() {
            if !(min..=max).contains(&value) {
                return Err(ProtocolViolation::DisabledTransition {
                    actor: pid,
                    kind: CallKind::McRandom,
                    value,
                }
                .into());
            }
            value
        } else {
            match self.random.next_random(min, max) {
                Ok(v) => v,
                Err(weft_replay::ReplayError::VerifierControlled) => {
                    return Err(ProtocolViolation::RandomUnderVerifier { actor: pid }.into())
                }
                Err(e) => return Err(e.into()),
            }
        };
        self.answer(pid, Ok(SimcallValue::Int(drawn)));
        Ok(())
    }
}

/// Every draw needs `min <= max`. Under verifier control each value in
/// the range is a transition, so its width is bounded by `limit`.
fn check_random_range(pid: ActorId, min: i32, max: i32, limit: Option<u32>) -> Result<(), ProtocolViolation> {
    if min > max {
        return Err(ProtocolViolation::InvalidRandomRange { actor: pid, min, max });
    }
    let span = (i64::from(max) - i64::from(min) + 1) as u64;
    match limit {
        Some(limit) if span > u64::from(limit) => Err(ProtocolViolation::RandomSpanTooWide {
            actor: pid,
            span,
            limit,
        }),
        _ => Ok(()),
    }
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("clock", &self.clock)
            .field("round", &self.round)
            .field("actors", &self.actors.len())
            .field("live_activities", &self.registry.len())
            .field("halted", &self.halted)
            .finish()
    }
}
