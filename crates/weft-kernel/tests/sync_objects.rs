//! Integration test: mutexes, semaphores, condition variables and
//! barriers.
//!
//! Standalone runs check hand-off order and timing; verifier runs with
//! externally driven actors check reentrancy and the fatal protocol
//! violations.

use weft_core::{ActivityFailure, ActorId, Call, CallKind, SimcallResult, SimcallValue};
use weft_kernel::{
    Kernel, KernelConfig, KernelError, ProtocolViolation, RunOutcome,
};
use weft_test_utils::{Event, EventLog, Op, ScriptedActor};

fn spawn(kernel: &mut Kernel, name: &str, ops: Vec<Op>, log: &EventLog) -> ActorId {
    kernel.spawn(name, ScriptedActor::new(ops, log.clone()))
}

fn answered(log: &EventLog, actor: ActorId, kind: CallKind) -> Event {
    log.events()
        .into_iter()
        .find(|e| e.actor == actor && e.kind == kind)
        .unwrap()
}

fn sleep(duration: f64) -> Op {
    Op::Call(Call::Sleep { duration })
}

// ── Mutex ────────────────────────────────────────────────────────────

#[test]
fn unlock_hands_the_mutex_to_the_oldest_waiter() {
    let mut kernel = Kernel::new(KernelConfig::default()).unwrap();
    let mutex = kernel.create_mutex();
    let log = EventLog::new();
    spawn(
        &mut kernel,
        "holder",
        vec![
            Op::Call(Call::MutexLock { mutex }),
            sleep(1.0),
            Op::Call(Call::MutexUnlock { mutex }),
        ],
        &log,
    );
    let b = spawn(
        &mut kernel,
        "waiter",
        vec![
            Op::Call(Call::MutexLock { mutex }),
            Op::Call(Call::MutexUnlock { mutex }),
        ],
        &log,
    );

    assert_eq!(kernel.run().unwrap(), RunOutcome::Completed { clock: 1.0 });
    let locked = answered(&log, b, CallKind::MutexLock);
    assert_eq!(locked.result, Ok(SimcallValue::Unit));
    assert_eq!(locked.now, 1.0);
    let m = kernel.mutex(mutex).unwrap();
    assert_eq!(m.owner(), None);
    assert_eq!(m.queue_len(), 0);
    assert_eq!(kernel.live_activities(), 0);
}

#[test]
fn trylock_never_blocks() {
    let mut kernel = Kernel::new(KernelConfig::default()).unwrap();
    let mutex = kernel.create_mutex();
    let log = EventLog::new();
    spawn(
        &mut kernel,
        "holder",
        vec![
            Op::Call(Call::MutexLock { mutex }),
            sleep(1.0),
            Op::Call(Call::MutexUnlock { mutex }),
        ],
        &log,
    );
    let b = spawn(
        &mut kernel,
        "prober",
        vec![Op::Call(Call::MutexTrylock { mutex })],
        &log,
    );
    assert_eq!(kernel.run().unwrap(), RunOutcome::Completed { clock: 1.0 });
    assert_eq!(log.last(b, CallKind::MutexTrylock), Some(Ok(SimcallValue::Bool(false))));
}

#[test]
fn owner_relocks_reentrantly() {
    let mut kernel = Kernel::new(KernelConfig::verifier()).unwrap();
    let mutex = kernel.create_mutex();
    let a = kernel.spawn_external("a");
    let b = kernel.spawn_external("b");

    kernel.issue(a, Call::MutexLock { mutex }).unwrap();
    kernel.fire(a, 0).unwrap();
    assert_eq!(kernel.take_result(a), Some(Ok(SimcallValue::Unit)));

    kernel.issue(a, Call::MutexLock { mutex }).unwrap();
    assert!(kernel.actor_is_enabled(a));
    kernel.fire(a, 0).unwrap();
    assert_eq!(kernel.mutex(mutex).unwrap().depth(), 2);

    kernel.issue(b, Call::MutexLock { mutex }).unwrap();
    assert!(!kernel.actor_is_enabled(b));

    kernel.issue(a, Call::MutexUnlock { mutex }).unwrap();
    kernel.fire(a, 0).unwrap();
    assert_eq!(kernel.mutex(mutex).unwrap().owner(), Some(a));
    assert!(!kernel.actor_is_enabled(b));

    kernel.issue(a, Call::MutexUnlock { mutex }).unwrap();
    kernel.fire(a, 0).unwrap();
    assert_eq!(kernel.mutex(mutex).unwrap().owner(), None);
    assert!(kernel.actor_is_enabled(b));
}

#[test]
fn unlock_by_non_owner_halts_the_kernel() {
    let mut kernel = Kernel::new(KernelConfig::verifier()).unwrap();
    let mutex = kernel.create_mutex();
    let a = kernel.spawn_external("a");
    let b = kernel.spawn_external("b");

    kernel.issue(a, Call::MutexLock { mutex }).unwrap();
    kernel.fire(a, 0).unwrap();
    kernel.issue(b, Call::MutexUnlock { mutex }).unwrap();

    let err = kernel.fire(b, 0).unwrap_err();
    assert_eq!(
        err.violation(),
        Some(&ProtocolViolation::NotMutexOwner { actor: b, mutex })
    );
    assert!(kernel.is_halted());
    assert!(matches!(
        kernel.issue(a, Call::MutexUnlock { mutex }),
        Err(KernelError::Halted)
    ));
}

#[test]
fn firing_a_disabled_lock_halts_the_kernel() {
    let mut kernel = Kernel::new(KernelConfig::verifier()).unwrap();
    let mutex = kernel.create_mutex();
    let a = kernel.spawn_external("a");
    let b = kernel.spawn_external("b");

    kernel.issue(a, Call::MutexLock { mutex }).unwrap();
    kernel.fire(a, 0).unwrap();
    kernel.issue(b, Call::MutexLock { mutex }).unwrap();

    let err = kernel.fire(b, 0).unwrap_err();
    assert!(matches!(
        err.violation(),
        Some(ProtocolViolation::DisabledTransition {
            kind: CallKind::MutexLock,
            ..
        })
    ));
    assert!(matches!(kernel.fire(a, 0), Err(KernelError::Halted)));
}

#[test]
fn exiting_owner_releases_its_mutex() {
    let mut kernel = Kernel::new(KernelConfig::default()).unwrap();
    let mutex = kernel.create_mutex();
    let log = EventLog::new();
    spawn(
        &mut kernel,
        "quitter",
        vec![Op::Call(Call::MutexLock { mutex }), sleep(1.0)],
        &log,
    );
    let b = spawn(
        &mut kernel,
        "waiter",
        vec![Op::Call(Call::MutexLock { mutex })],
        &log,
    );
    assert_eq!(kernel.run().unwrap(), RunOutcome::Completed { clock: 1.0 });
    assert_eq!(log.last(b, CallKind::MutexLock), Some(Ok(SimcallValue::Unit)));
}

// ── Semaphore ────────────────────────────────────────────────────────

#[test]
fn semaphore_release_wakes_the_oldest_acquirer() {
    let mut kernel = Kernel::new(KernelConfig::default()).unwrap();
    let sem = kernel.create_semaphore(1);
    let log = EventLog::new();
    spawn(
        &mut kernel,
        "first",
        vec![
            Op::Call(Call::SemAcquire { sem, timeout: None }),
            sleep(1.0),
            Op::Call(Call::SemRelease { sem }),
        ],
        &log,
    );
    let b = spawn(
        &mut kernel,
        "second",
        vec![
            Op::Call(Call::SemAcquire { sem, timeout: None }),
            Op::Call(Call::SemRelease { sem }),
        ],
        &log,
    );

    assert_eq!(kernel.run().unwrap(), RunOutcome::Completed { clock: 1.0 });
    assert_eq!(answered(&log, b, CallKind::SemAcquire).now, 1.0);
    assert_eq!(kernel.semaphore(sem).unwrap().value(), 1);
}

#[test]
fn semaphore_acquire_times_out() {
    let mut kernel = Kernel::new(KernelConfig::default()).unwrap();
    let sem = kernel.create_semaphore(0);
    let log = EventLog::new();
    let a = spawn(
        &mut kernel,
        "a",
        vec![Op::Call(Call::SemAcquire {
            sem,
            timeout: Some(2.0),
        })],
        &log,
    );
    assert_eq!(kernel.run().unwrap(), RunOutcome::Completed { clock: 2.0 });
    assert_eq!(log.last(a, CallKind::SemAcquire), Some(Err(ActivityFailure::Timeout)));
    let s = kernel.semaphore(sem).unwrap();
    assert_eq!(s.value(), 0);
    assert_eq!(s.queue_len(), 0);
}

#[test]
fn sync_enabledness_follows_the_experimental_policy() {
    for policy in [true, false] {
        let config = KernelConfig {
            experimental_sync_enabled: policy,
            ..KernelConfig::verifier()
        };
        let mut kernel = Kernel::new(config).unwrap();
        let sem = kernel.create_semaphore(0);
        let a = kernel.spawn_external("a");
        kernel
            .issue(a, Call::SemAcquire { sem, timeout: None })
            .unwrap();
        // Semaphore calls are invisible: a round services them.
        kernel.wait_for_requests().unwrap();
        assert!(kernel.pending().is_empty());
        assert_eq!(
            weft_kernel::is_enabled(
                &kernel,
                &weft_core::Request::new(a, Call::SemAcquire { sem, timeout: None })
            ),
            policy
        );
    }
}

// ── Condition ────────────────────────────────────────────────────────

fn cond_waiter(mutex: weft_core::MutexId, cond: weft_core::ConditionId, timeout: Option<f64>) -> Vec<Op> {
    vec![
        Op::Call(Call::MutexLock { mutex }),
        Op::Call(Call::CondWait {
            cond,
            mutex,
            timeout,
        }),
        Op::Call(Call::MutexUnlock { mutex }),
    ]
}

#[test]
fn signal_wakes_waiter_once_mutex_is_back() {
    let mut kernel = Kernel::new(KernelConfig::default()).unwrap();
    let mutex = kernel.create_mutex();
    let cond = kernel.create_condition();
    let log = EventLog::new();
    let a = spawn(&mut kernel, "waiter", cond_waiter(mutex, cond, None), &log);
    spawn(
        &mut kernel,
        "signaller",
        vec![
            sleep(1.0),
            Op::Call(Call::MutexLock { mutex }),
            Op::Call(Call::CondSignal { cond }),
            Op::Call(Call::MutexUnlock { mutex }),
        ],
        &log,
    );

    assert_eq!(kernel.run().unwrap(), RunOutcome::Completed { clock: 1.0 });
    let woke = answered(&log, a, CallKind::CondWait);
    assert_eq!(woke.result, Ok(SimcallValue::Unit));
    assert_eq!(woke.now, 1.0);
    assert_eq!(kernel.mutex(mutex).unwrap().owner(), None);
    assert_eq!(kernel.condition(cond).unwrap().queue_len(), 0);
}

#[test]
fn broadcast_wakes_every_waiter() {
    let mut kernel = Kernel::new(KernelConfig::default()).unwrap();
    let mutex = kernel.create_mutex();
    let cond = kernel.create_condition();
    let log = EventLog::new();
    let a = spawn(&mut kernel, "a", cond_waiter(mutex, cond, None), &log);
    let c = spawn(&mut kernel, "c", cond_waiter(mutex, cond, None), &log);
    spawn(
        &mut kernel,
        "broadcaster",
        vec![
            sleep(1.0),
            Op::Call(Call::MutexLock { mutex }),
            Op::Call(Call::CondBroadcast { cond }),
            Op::Call(Call::MutexUnlock { mutex }),
        ],
        &log,
    );

    assert_eq!(kernel.run().unwrap(), RunOutcome::Completed { clock: 1.0 });
    assert_eq!(log.last(a, CallKind::CondWait), Some(Ok(SimcallValue::Unit)));
    assert_eq!(log.last(c, CallKind::CondWait), Some(Ok(SimcallValue::Unit)));
    assert_eq!(log.last(c, CallKind::MutexUnlock), Some(Ok(SimcallValue::Unit)));
    assert_eq!(kernel.live_activities(), 0);
}

#[test]
fn timed_out_condition_wait_returns_holding_the_mutex() {
    let mut kernel = Kernel::new(KernelConfig::default()).unwrap();
    let mutex = kernel.create_mutex();
    let cond = kernel.create_condition();
    let log = EventLog::new();
    let a = spawn(&mut kernel, "a", cond_waiter(mutex, cond, Some(0.5)), &log);

    assert_eq!(kernel.run().unwrap(), RunOutcome::Completed { clock: 0.5 });
    assert_eq!(log.last(a, CallKind::CondWait), Some(Err(ActivityFailure::Timeout)));
    // The unlock after the timeout succeeded, so the mutex was held.
    assert_eq!(log.last(a, CallKind::MutexUnlock), Some(Ok(SimcallValue::Unit)));
    assert!(!kernel.is_halted());
}

#[test]
fn condition_wait_without_the_mutex_is_a_violation() {
    let mut kernel = Kernel::new(KernelConfig::default()).unwrap();
    let mutex = kernel.create_mutex();
    let cond = kernel.create_condition();
    kernel.spawn("careless", move |_: weft_core::Wakeup| {
        weft_core::Step::Call(Call::CondWait {
            cond,
            mutex,
            timeout: None,
        })
    });
    let err = kernel.run().unwrap_err();
    assert!(matches!(
        err.violation(),
        Some(ProtocolViolation::NotMutexOwner { .. })
    ));
}

// ── Barrier ──────────────────────────────────────────────────────────

fn enter(barrier: weft_core::BarrierId) -> Op {
    Op::Call(Call::BarrierEnter { barrier })
}

#[test]
fn barrier_releases_the_group_on_the_last_arrival() {
    let mut kernel = Kernel::new(KernelConfig::default()).unwrap();
    let barrier = kernel.create_barrier(3);
    let log = EventLog::new();
    let actors: Vec<ActorId> = [1.0, 2.0, 3.0]
        .into_iter()
        .map(|delay| spawn(&mut kernel, "member", vec![sleep(delay), enter(barrier)], &log))
        .collect();

    assert_eq!(kernel.run().unwrap(), RunOutcome::Completed { clock: 3.0 });
    for &pid in &actors {
        assert_eq!(answered(&log, pid, CallKind::BarrierEnter).now, 3.0);
    }
    assert_eq!(log.last(actors[0], CallKind::BarrierEnter), Some(Ok(SimcallValue::Bool(false))));
    assert_eq!(log.last(actors[1], CallKind::BarrierEnter), Some(Ok(SimcallValue::Bool(false))));
    assert_eq!(log.last(actors[2], CallKind::BarrierEnter), Some(Ok(SimcallValue::Bool(true))));
    let b = kernel.barrier(barrier).unwrap();
    assert_eq!(b.expected(), 3);
    assert_eq!(b.queue_len(), 0);
    assert_eq!(kernel.live_activities(), 0);
}

#[test]
fn barrier_is_reusable_across_generations() {
    let mut kernel = Kernel::new(KernelConfig::default()).unwrap();
    let barrier = kernel.create_barrier(2);
    let log = EventLog::new();
    let a = spawn(&mut kernel, "a", vec![enter(barrier), sleep(1.0), enter(barrier)], &log);
    let b = spawn(&mut kernel, "b", vec![sleep(2.0), enter(barrier), enter(barrier)], &log);

    assert_eq!(kernel.run().unwrap(), RunOutcome::Completed { clock: 3.0 });
    let entries = |pid: ActorId| -> Vec<(SimcallResult, f64)> {
        log.events()
            .into_iter()
            .filter(|e| e.actor == pid && e.kind == CallKind::BarrierEnter)
            .map(|e| (e.result, e.now))
            .collect()
    };
    // First generation opens when b arrives at 2, the second when a
    // comes back at 3.
    assert_eq!(
        entries(a),
        vec![(Ok(SimcallValue::Bool(false)), 2.0), (Ok(SimcallValue::Bool(true)), 3.0)]
    );
    assert_eq!(
        entries(b),
        vec![(Ok(SimcallValue::Bool(true)), 2.0), (Ok(SimcallValue::Bool(false)), 3.0)]
    );
}

#[test]
fn short_barrier_group_deadlocks() {
    let mut kernel = Kernel::new(KernelConfig::default()).unwrap();
    let barrier = kernel.create_barrier(3);
    let log = EventLog::new();
    let a = spawn(&mut kernel, "a", vec![enter(barrier)], &log);
    let b = spawn(&mut kernel, "b", vec![enter(barrier)], &log);

    assert_eq!(
        kernel.run().unwrap(),
        RunOutcome::Deadlock {
            clock: 0.0,
            blocked: vec![a, b],
        }
    );
    assert_eq!(kernel.barrier(barrier).unwrap().queue_len(), 2);
}

#[test]
fn single_member_barrier_never_parks() {
    let mut kernel = Kernel::new(KernelConfig::default()).unwrap();
    let barrier = kernel.create_barrier(1);
    let log = EventLog::new();
    let a = spawn(&mut kernel, "alone", vec![enter(barrier), enter(barrier)], &log);
    assert_eq!(kernel.run().unwrap(), RunOutcome::Completed { clock: 0.0 });
    assert_eq!(log.last(a, CallKind::BarrierEnter), Some(Ok(SimcallValue::Bool(true))));
}

#[test]
fn barrier_entry_is_serviced_without_the_verifier() {
    let mut kernel = Kernel::new(KernelConfig::verifier()).unwrap();
    let barrier = kernel.create_barrier(2);
    let log = EventLog::new();
    spawn(&mut kernel, "a", vec![enter(barrier)], &log);
    spawn(&mut kernel, "b", vec![enter(barrier)], &log);

    kernel.wait_for_requests().unwrap();
    assert!(kernel.pending().is_empty());
    assert!(kernel.enabled_transitions().is_empty());
    assert!(kernel.is_finished());
}

#[test]
fn unknown_barrier_halts_the_kernel() {
    let mut kernel = Kernel::new(KernelConfig::default()).unwrap();
    let a = kernel.spawn_external("a");
    kernel
        .issue(
            a,
            Call::BarrierEnter {
                barrier: weft_core::BarrierId(7),
            },
        )
        .unwrap();
    let err = kernel.run().unwrap_err();
    assert!(matches!(
        err,
        KernelError::UnknownObject {
            kind: "barrier",
            id: 7
        }
    ));
    assert!(kernel.is_halted());
}
