//! Integration test: the verifier interface.
//!
//! Covers which requests are listed as pending, the values each may be
//! fired with, ownership of activities across fires, determinism of
//! the scheduling history, and (with proptest) that the enabledness
//! oracle is pure and every offered transition fires cleanly.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use weft_core::{
    ActivityId, ActorId, Call, CallKind, MailboxId, SimcallValue,
};
use weft_kernel::{
    Activity, Kernel, KernelConfig, KernelError, KernelObserver, ProtocolViolation,
};
use weft_replay::{history_hash, Transition};
use weft_test_utils::{EventLog, Op, ScriptedActor};

fn spawn(kernel: &mut Kernel, name: &str, ops: Vec<Op>, log: &EventLog) -> ActorId {
    kernel.spawn(name, ScriptedActor::new(ops, log.clone()))
}

fn comm_of(result: Option<weft_core::SimcallResult>) -> ActivityId {
    match result {
        Some(Ok(SimcallValue::Comm(id))) => id,
        other => panic!("expected a communication handle, got {other:?}"),
    }
}

#[derive(Clone, Default)]
struct DestroyCounter {
    destroyed: Rc<RefCell<Vec<ActivityId>>>,
}

impl KernelObserver for DestroyCounter {
    fn on_destroyed(&mut self, id: ActivityId) {
        self.destroyed.borrow_mut().push(id);
    }

    fn on_finished(&mut self, _id: ActivityId, activity: &Activity) {
        assert!(activity.state().is_terminal());
    }
}

// ── Pending requests ─────────────────────────────────────────────────

#[test]
fn invisible_requests_never_reach_the_verifier() {
    let mut kernel = Kernel::new(KernelConfig::verifier()).unwrap();
    let mailbox = kernel.create_mailbox();
    let log = EventLog::new();
    let a = spawn(
        &mut kernel,
        "a",
        vec![
            Op::Call(Call::Sleep { duration: 3.0 }),
            Op::Call(Call::Execute { flops: 1.0e12 }),
            Op::Send { mailbox, payload: 1 },
        ],
        &log,
    );
    kernel.wait_for_requests().unwrap();

    let pending = kernel.pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].actor, a);
    assert_eq!(pending[0].kind, CallKind::CommIsend);
    // Computations complete instantly under verifier control.
    assert_eq!(kernel.clock(), 0.0);
    assert_eq!(log.results_of(a).len(), 2);
}

#[test]
fn run_is_refused_under_verifier_control() {
    let mut kernel = Kernel::new(KernelConfig::verifier()).unwrap();
    assert!(matches!(
        kernel.run(),
        Err(KernelError::WrongMode { operation: "run" })
    ));
    assert!(kernel.is_halted());
}

#[test]
fn fire_is_refused_in_standalone_mode() {
    let mut kernel = Kernel::new(KernelConfig::default()).unwrap();
    let a = kernel.spawn_external("a");
    kernel.issue(a, Call::McRandom { min: 0, max: 1 }).unwrap();
    assert!(matches!(
        kernel.fire(a, 0),
        Err(KernelError::WrongMode { operation: "fire" })
    ));
}

#[test]
fn second_request_while_pending_is_a_violation() {
    let mut kernel = Kernel::new(KernelConfig::verifier()).unwrap();
    let mutex = kernel.create_mutex();
    let a = kernel.spawn_external("a");
    kernel.issue(a, Call::MutexLock { mutex }).unwrap();
    let err = kernel.issue(a, Call::MutexUnlock { mutex }).unwrap_err();
    assert_eq!(
        err.violation(),
        Some(&ProtocolViolation::RequestAlreadyPending { actor: a })
    );
    assert!(kernel.is_halted());
}

#[test]
fn firing_an_actor_without_a_request_is_a_violation() {
    let mut kernel = Kernel::new(KernelConfig::verifier()).unwrap();
    let a = kernel.spawn_external("a");
    let err = kernel.fire(a, 0).unwrap_err();
    assert_eq!(
        err.violation(),
        Some(&ProtocolViolation::NoPendingRequest { actor: a })
    );
}

// ── Transition values ────────────────────────────────────────────────

#[test]
fn random_draw_offers_every_value_in_range() {
    let mut kernel = Kernel::new(KernelConfig::verifier()).unwrap();
    let a = kernel.spawn_external("a");
    kernel.issue(a, Call::McRandom { min: 1, max: 3 }).unwrap();
    assert_eq!(kernel.transition_values(a), vec![1, 2, 3]);

    kernel.fire(a, 2).unwrap();
    assert_eq!(kernel.take_result(a), Some(Ok(SimcallValue::Int(2))));
    let trace = kernel.record_trace();
    assert_eq!(
        trace.transitions,
        vec![Transition {
            actor: a,
            value: 2
        }]
    );
    assert_eq!(trace.to_path_string(), format!("{a}/2"));
}

#[test]
fn value_outside_the_offered_set_is_rejected() {
    let mut kernel = Kernel::new(KernelConfig::verifier()).unwrap();
    let a = kernel.spawn_external("a");
    kernel.issue(a, Call::McRandom { min: 1, max: 3 }).unwrap();
    let err = kernel.fire(a, 7).unwrap_err();
    assert!(matches!(
        err.violation(),
        Some(ProtocolViolation::DisabledTransition { value: 7, .. })
    ));
}

#[test]
fn inverted_random_range_is_rejected_in_every_mode() {
    for config in [KernelConfig::verifier(), KernelConfig::default()] {
        let mut kernel = Kernel::new(config).unwrap();
        let a = kernel.spawn_external("a");
        let err = kernel.issue(a, Call::McRandom { min: 3, max: 1 }).unwrap_err();
        assert_eq!(
            err.violation(),
            Some(&ProtocolViolation::InvalidRandomRange {
                actor: a,
                min: 3,
                max: 1
            })
        );
        assert!(kernel.is_halted());
        assert!(kernel.pending().is_empty());
    }
}

#[test]
fn random_span_is_bounded_under_the_verifier() {
    let config = KernelConfig {
        max_random_branching: 8,
        ..KernelConfig::verifier()
    };
    let mut kernel = Kernel::new(config.clone()).unwrap();
    let a = kernel.spawn_external("a");
    kernel.issue(a, Call::McRandom { min: -4, max: 3 }).unwrap();
    assert_eq!(kernel.transition_values(a).len(), 8);

    let mut kernel = Kernel::new(config).unwrap();
    let a = kernel.spawn_external("a");
    let err = kernel.issue(a, Call::McRandom { min: 0, max: 8 }).unwrap_err();
    assert_eq!(
        err.violation(),
        Some(&ProtocolViolation::RandomSpanTooWide {
            actor: a,
            span: 9,
            limit: 8
        })
    );

    let mut kernel = Kernel::new(KernelConfig::verifier()).unwrap();
    let a = kernel.spawn_external("a");
    let err = kernel
        .issue(a, Call::McRandom { min: i32::MIN, max: i32::MAX })
        .unwrap_err();
    assert!(matches!(
        err.violation(),
        Some(ProtocolViolation::RandomSpanTooWide { span: 4_294_967_296, .. })
    ));
}

#[test]
fn free_draws_are_not_bounded_by_branching() {
    let mut kernel = Kernel::new(KernelConfig::default()).unwrap();
    let drawn = Rc::new(RefCell::new(None));
    let sink = drawn.clone();
    kernel.spawn("wide", move |w: weft_core::Wakeup| match w.result {
        None => weft_core::Step::Call(Call::McRandom {
            min: i32::MIN,
            max: i32::MAX,
        }),
        Some(result) => {
            *sink.borrow_mut() = Some(result);
            weft_core::Step::Exit
        }
    });
    assert!(kernel.run().is_ok());
    assert!(matches!(*drawn.borrow(), Some(Ok(SimcallValue::Int(_)))));
}

#[test]
fn wait_any_and_test_any_offer_ready_indices() {
    let mut kernel = Kernel::new(KernelConfig::verifier()).unwrap();
    let m0 = kernel.create_mailbox();
    let m1 = kernel.create_mailbox();
    let rx = kernel.spawn_external("rx");
    let tx = kernel.spawn_external("tx");

    kernel.issue(rx, Call::CommIrecv { mailbox: m0 }).unwrap();
    kernel.fire(rx, 0).unwrap();
    let first = comm_of(kernel.take_result(rx));
    kernel.issue(rx, Call::CommIrecv { mailbox: m1 }).unwrap();
    kernel.fire(rx, 0).unwrap();
    let second = comm_of(kernel.take_result(rx));

    let comms: weft_core::Candidates = [first, second].into_iter().collect();
    kernel
        .issue(rx, Call::CommTestAny { comms: comms.clone() })
        .unwrap();
    assert_eq!(kernel.transition_values(rx), vec![-1]);
    kernel.fire(rx, -1).unwrap();
    assert_eq!(kernel.take_result(rx), Some(Ok(SimcallValue::Index(None))));

    kernel
        .issue(
            tx,
            Call::CommIsend {
                mailbox: m1,
                size: 0,
                payload: 11,
                detached: true,
            },
        )
        .unwrap();
    kernel.fire(tx, 0).unwrap();

    kernel
        .issue(
            rx,
            Call::CommWaitAny {
                comms,
                timeout: None,
            },
        )
        .unwrap();
    assert_eq!(kernel.ready_candidates(rx), vec![1]);
    assert_eq!(kernel.transition_values(rx), vec![1]);
    kernel.fire(rx, 1).unwrap();
    assert_eq!(kernel.take_result(rx), Some(Ok(SimcallValue::Index(Some(1)))));
    assert!(kernel.activity(second).unwrap().state().is_terminal());
}

#[test]
fn detached_send_from_a_departed_sender_stays_receivable() {
    let mut kernel = Kernel::new(KernelConfig::verifier()).unwrap();
    let mailbox = kernel.create_mailbox();
    let log = EventLog::new();
    let a = spawn(
        &mut kernel,
        "sender",
        vec![Op::SendDetached { mailbox, payload: 5 }],
        &log,
    );
    let b = spawn(
        &mut kernel,
        "receiver",
        vec![Op::Recv { mailbox }, Op::Wait { timeout: None }],
        &log,
    );
    kernel.wait_for_requests().unwrap();

    kernel.fire(a, 0).unwrap();
    assert!(kernel.live_actors().iter().all(|pid| *pid != a));
    kernel.fire(b, 0).unwrap();

    let comm = kernel.handles(b)[0];
    let state = kernel.activity(comm).unwrap().comm().unwrap();
    assert_eq!(state.source_actor, None);
    assert!(kernel.actor_is_enabled(b));

    kernel.fire(b, 0).unwrap();
    assert_eq!(log.last(b, CallKind::CommWait), Some(Ok(SimcallValue::Payload(5))));
    assert!(kernel.is_finished());
}

// ── Ownership ────────────────────────────────────────────────────────

#[test]
fn activity_is_finalized_once_by_its_last_owner() {
    let mut kernel = Kernel::new(KernelConfig::verifier()).unwrap();
    let counter = DestroyCounter::default();
    kernel.add_observer(Box::new(counter.clone()));
    let mailbox = kernel.create_mailbox();
    let tx = kernel.spawn_external("tx");
    let rx = kernel.spawn_external("rx");

    kernel
        .issue(
            tx,
            Call::CommIsend {
                mailbox,
                size: 0,
                payload: 3,
                detached: false,
            },
        )
        .unwrap();
    kernel.fire(tx, 0).unwrap();
    let comm = comm_of(kernel.take_result(tx));
    assert_eq!(kernel.refcount(comm), Some(2));

    kernel.issue(rx, Call::CommIrecv { mailbox }).unwrap();
    kernel.fire(rx, 0).unwrap();
    assert_eq!(comm_of(kernel.take_result(rx)), comm);
    assert_eq!(kernel.refcount(comm), Some(3));
    assert_eq!(kernel.acquire_activity(comm).unwrap(), 4);

    kernel
        .issue(tx, Call::CommWait { comm, timeout: None })
        .unwrap();
    kernel.fire(tx, 0).unwrap();
    assert_eq!(kernel.take_result(tx), Some(Ok(SimcallValue::Unit)));
    // The sender's handle and the kernel's reference are gone.
    assert_eq!(kernel.refcount(comm), Some(2));

    kernel
        .issue(rx, Call::CommWait { comm, timeout: None })
        .unwrap();
    kernel.fire(rx, 0).unwrap();
    assert_eq!(kernel.take_result(rx), Some(Ok(SimcallValue::Payload(3))));
    assert_eq!(kernel.refcount(comm), Some(1));
    assert!(counter.destroyed.borrow().is_empty());

    kernel.release_activity(comm).unwrap();
    assert_eq!(*counter.destroyed.borrow(), vec![comm]);
    assert_eq!(kernel.refcount(comm), None);

    let err = kernel.release_activity(comm).unwrap_err();
    assert_eq!(
        err.violation(),
        Some(&ProtocolViolation::OverRelease { activity: comm })
    );
    assert_eq!(counter.destroyed.borrow().len(), 1);
}

#[test]
fn waiting_on_a_foreign_handle_is_a_violation() {
    let mut kernel = Kernel::new(KernelConfig::verifier()).unwrap();
    let mailbox = kernel.create_mailbox();
    let tx = kernel.spawn_external("tx");
    let thief = kernel.spawn_external("thief");
    kernel
        .issue(
            tx,
            Call::CommIsend {
                mailbox,
                size: 0,
                payload: 0,
                detached: false,
            },
        )
        .unwrap();
    kernel.fire(tx, 0).unwrap();
    let comm = comm_of(kernel.take_result(tx));

    kernel
        .issue(
            thief,
            Call::CommWait {
                comm,
                timeout: Some(1.0),
            },
        )
        .unwrap();
    let err = kernel.fire(thief, -1).unwrap_err();
    assert_eq!(
        err.violation(),
        Some(&ProtocolViolation::HandleNotHeld {
            actor: thief,
            activity: comm
        })
    );
}

// ── Determinism ──────────────────────────────────────────────────────

fn exchange(kernel: &mut Kernel, log: &EventLog) {
    let m = kernel.create_mailbox();
    let mutex = kernel.create_mutex();
    for payload in 0..2 {
        spawn(
            kernel,
            "sender",
            vec![
                Op::Call(Call::MutexLock { mutex }),
                Op::Call(Call::MutexUnlock { mutex }),
                Op::Send { mailbox: m, payload },
                Op::Wait { timeout: None },
            ],
            log,
        );
    }
    spawn(
        kernel,
        "receiver",
        vec![
            Op::Recv { mailbox: m },
            Op::Wait { timeout: None },
            Op::Recv { mailbox: m },
            Op::Wait { timeout: None },
        ],
        log,
    );
}

/// Fire the `choices[i] % n`-th enabled transition at each step until
/// none is left; returns the fired path.
fn drive(kernel: &mut Kernel, choices: &[usize]) -> Vec<Transition> {
    let mut fired = Vec::new();
    let mut step = 0;
    loop {
        let enabled = kernel.enabled_transitions();
        if enabled.is_empty() {
            return fired;
        }
        let pick = choices.get(step).copied().unwrap_or(0) % enabled.len();
        let t = enabled[pick];
        kernel.fire(t.actor, t.value).unwrap();
        fired.push(t);
        step += 1;
    }
}

#[test]
fn same_choices_give_identical_histories() {
    let choices = [2, 0, 1, 1, 3, 0, 2, 1];
    let mut hashes = Vec::new();
    let mut paths = Vec::new();
    for _ in 0..2 {
        let mut kernel = Kernel::new(KernelConfig::verifier()).unwrap();
        let log = EventLog::new();
        exchange(&mut kernel, &log);
        kernel.wait_for_requests().unwrap();
        paths.push(drive(&mut kernel, &choices));
        hashes.push(history_hash(kernel.history()));
        assert!(kernel.is_finished());
    }
    assert_eq!(hashes[0], hashes[1]);
    assert_eq!(paths[0], paths[1]);
}

#[test]
fn fresh_kernels_are_independent() {
    let mut k1 = Kernel::new(KernelConfig::verifier()).unwrap();
    let mut k2 = Kernel::new(KernelConfig::verifier()).unwrap();
    let a1 = k1.spawn_external("a");
    let a2 = k2.spawn_external("a");
    assert_eq!(a1, a2);
    k1.issue(a1, Call::McRandom { min: 0, max: 0 }).unwrap();
    assert!(k2.pending().is_empty());
    assert_eq!(k1.pending().len(), 1);
    assert_eq!(MailboxId(0), k2.create_mailbox());
}

proptest! {
    #[test]
    fn oracle_is_pure_and_offered_transitions_fire(choices in prop::collection::vec(0usize..8, 0..24)) {
        let mut kernel = Kernel::new(KernelConfig::verifier()).unwrap();
        let log = EventLog::new();
        exchange(&mut kernel, &log);
        kernel.wait_for_requests().unwrap();

        let mut step = 0;
        loop {
            let enabled = kernel.enabled_transitions();
            prop_assert_eq!(&enabled, &kernel.enabled_transitions());
            for p in kernel.pending() {
                prop_assert_eq!(p.enabled, kernel.actor_is_enabled(p.actor));
                prop_assert_eq!(p.enabled, !kernel.transition_values(p.actor).is_empty());
            }
            if enabled.is_empty() {
                break;
            }
            let t = enabled[choices.get(step).copied().unwrap_or(0) % enabled.len()];
            prop_assert!(kernel.fire(t.actor, t.value).is_ok());
            step += 1;
        }
        prop_assert!(kernel.is_finished());
        prop_assert_eq!(kernel.live_activities(), 0);
        prop_assert_eq!(kernel.transitions().len(), step);
    }

    #[test]
    fn random_draw_is_enabled_iff_it_offers_a_value(min in -6i32..6, max in -6i32..6) {
        let mut kernel = Kernel::new(KernelConfig::verifier()).unwrap();
        let a = kernel.spawn_external("a");
        let issued = kernel.issue(a, Call::McRandom { min, max });
        prop_assert_eq!(issued.is_ok(), min <= max);
        for p in kernel.pending() {
            prop_assert_eq!(p.enabled, !kernel.transition_values(p.actor).is_empty());
        }
        if min <= max {
            prop_assert_eq!(kernel.transition_values(a), (min..=max).collect::<Vec<_>>());
        }
    }
}
