//! Enabledness oracle.
//!
//! Decides whether firing a pending request now is guaranteed not to
//! block. Pure: reads kernel state, never mutates it, so asking twice
//! gives the same answer.
//!
//! | call | enabled iff |
//! |---|---|
//! | comm wait, no timeout | both peers bound; for a detached send whose sender left, a receiver is bound |
//! | comm wait, a side has a timeout | always, unless `timeouts_always_enabled` is off |
//! | wait-any | some candidate is ready, as a plain wait on it would be |
//! | mutex lock | mutex free or owned by the issuer |
//! | semaphore acquire, condition wait | `experimental_sync_enabled` |
//! | random draw | `min <= max` |
//! | anything else | always |
//!
//! A communication that already finished (or failed) counts as ready:
//! waiting on it returns at once. So a wait-any candidate is ready when
//! both peers are bound, and also when it is already terminal or is a
//! detached send whose sender left after delivering to a bound
//! receiver. Candidate timeouts play no part in it.

use weft_core::{ActivityId, ActorId, Call, Request};
use weft_replay::Transition;

use crate::actor::ActorState;
use crate::comm::comm_is_ready;
use crate::kernel::Kernel;

/// Whether `request` may be fired now.
pub fn is_enabled(kernel: &Kernel, request: &Request) -> bool {
    match &request.call {
        Call::CommWait { comm, timeout } => wait_is_enabled(kernel, *comm, timeout.is_some()),
        Call::CommWaitAny { comms, .. } => comms.iter().any(|id| candidate_ready(kernel, *id)),
        Call::MutexLock { mutex } => kernel
            .mutex(*mutex)
            .is_some_and(|m| m.owner().is_none_or(|owner| owner == request.issuer)),
        Call::SemAcquire { .. } | Call::CondWait { .. } => kernel.config.experimental_sync_enabled,
        Call::McRandom { min, max } => min <= max,
        _ => true,
    }
}

fn wait_is_enabled(kernel: &Kernel, comm: ActivityId, request_timeout: bool) -> bool {
    let Some(activity) = kernel.activity(comm) else {
        return false;
    };
    let Some(c) = activity.comm() else {
        return false;
    };
    if request_timeout || c.has_timeout() {
        if kernel.config.timeouts_always_enabled {
            return true;
        }
        return activity.state().is_terminal() || c.is_matched();
    }
    comm_is_ready(activity)
}

fn candidate_ready(kernel: &Kernel, id: ActivityId) -> bool {
    kernel.activity(id).is_some_and(comm_is_ready)
}

impl Kernel {
    /// Whether `pid` has a pending request that may be fired now.
    /// False for an actor without one.
    pub fn actor_is_enabled(&self, pid: ActorId) -> bool {
        self.pending_request(pid)
            .is_some_and(|req| is_enabled(self, req))
    }

    fn pending_request(&self, pid: ActorId) -> Option<&Request> {
        let record = self.actors.get(&pid)?;
        if record.state != ActorState::Pending {
            return None;
        }
        record.request.as_ref()
    }

    /// Indices of the ready candidates of `pid`'s pending wait-any or
    /// test-any; empty for any other request.
    pub fn ready_candidates(&self, pid: ActorId) -> Vec<usize> {
        let comms = match self.pending_request(pid).map(|r| &r.call) {
            Some(Call::CommWaitAny { comms, .. } | Call::CommTestAny { comms }) => comms,
            _ => return Vec::new(),
        };
        comms
            .iter()
            .enumerate()
            .filter(|(_, id)| candidate_ready(self, **id))
            .map(|(i, _)| i)
            .collect()
    }

    /// Values the verifier may fire `pid`'s pending request with, in
    /// exploration order. Empty when it is not enabled.
    ///
    /// - wait: `0` completes the transfer, `-1` times out
    /// - wait-any: a ready candidate index
    /// - test-any: a ready candidate index, or `-1` when none is ready
    /// - random draw: every value in `[min, max]`
    /// - anything else: `0`
    pub fn transition_values(&self, pid: ActorId) -> Vec<i32> {
        let Some(request) = self.pending_request(pid) else {
            return Vec::new();
        };
        if !weft_core::is_visible(request) || !is_enabled(self, request) {
            return Vec::new();
        }
        let as_values = |indices: Vec<usize>| -> Vec<i32> {
            indices.into_iter().filter_map(|i| i32::try_from(i).ok()).collect()
        };
        match &request.call {
            Call::CommWait { comm, .. } => {
                if self.activity(*comm).is_some_and(comm_is_ready) {
                    vec![0]
                } else {
                    vec![-1]
                }
            }
            Call::CommWaitAny { .. } => as_values(self.ready_candidates(pid)),
            Call::CommTestAny { .. } => {
                let values = as_values(self.ready_candidates(pid));
                if values.is_empty() {
                    vec![-1]
                } else {
                    values
                }
            }
            Call::McRandom { min, max } => (*min..=*max).collect(),
            _ => vec![0],
        }
    }

    /// Every `(actor, value)` the verifier may fire now, ordered by
    /// actor then value.
    pub fn enabled_transitions(&self) -> Vec<Transition> {
        self.pending()
            .into_iter()
            .filter(|p| p.enabled)
            .flat_map(|p| {
                self.transition_values(p.actor)
                    .into_iter()
                    .map(move |value| Transition {
                        actor: p.actor,
                        value,
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{Activity, ActivityKind, ActivityState, CommSide, Communication, Readiness};
    use crate::config::KernelConfig;
    use crate::sync::Mutex;
    use proptest::prelude::*;
    use weft_core::{ActivityFailure, MailboxId, MutexId, SemaphoreId};

    fn kernel(timeouts_always_enabled: bool) -> Kernel {
        let config = KernelConfig {
            timeouts_always_enabled,
            ..KernelConfig::verifier()
        };
        Kernel::new(config).unwrap()
    }

    #[derive(Clone, Debug)]
    struct CommShape {
        source: Option<ActorId>,
        destination: Option<ActorId>,
        detached: bool,
        readiness: Readiness,
        state: ActivityState,
        source_timeout: bool,
        destination_timeout: bool,
    }

    impl CommShape {
        fn both_bound(&self) -> bool {
            self.source.is_some() && self.destination.is_some()
        }

        fn sender_left_after_delivery(&self) -> bool {
            self.detached
                && self.source.is_none()
                && self.readiness == Readiness::Ready
                && self.destination.is_some()
        }

        /// A plain wait on it returns without timing out.
        fn ready(&self) -> bool {
            self.state.is_terminal() || self.both_bound() || self.sender_left_after_delivery()
        }

        fn insert(&self, kernel: &mut Kernel) -> ActivityId {
            let mut comm = Communication::posted(MailboxId(0), CommSide::Send, ActorId(1));
            comm.source_actor = self.source;
            comm.destination_actor = self.destination;
            comm.is_detached = self.detached;
            comm.readiness = self.readiness;
            comm.source_timeout = self.source_timeout;
            comm.destination_timeout = self.destination_timeout;
            let mut activity = Activity::new(ActivityKind::Communication(comm));
            activity.state = self.state;
            kernel.registry.insert(activity).unwrap()
        }
    }

    fn actor() -> impl Strategy<Value = Option<ActorId>> {
        prop::option::of((1u32..4).prop_map(ActorId))
    }

    prop_compose! {
        fn comm_shape()(
            source in actor(),
            destination in actor(),
            detached in any::<bool>(),
            readiness in prop_oneof![
                Just(Readiness::Pending),
                Just(Readiness::Ready),
                Just(Readiness::Done)
            ],
            state in prop_oneof![
                Just(ActivityState::Waiting),
                Just(ActivityState::Ready),
                Just(ActivityState::Done),
                Just(ActivityState::Failed(ActivityFailure::Cancelled))
            ],
            source_timeout in any::<bool>(),
            destination_timeout in any::<bool>()
        ) -> CommShape {
            CommShape { source, destination, detached, readiness, state, source_timeout, destination_timeout }
        }
    }

    proptest! {
        #[test]
        fn untimed_wait_follows_peer_binding(mut shape in comm_shape(), always in any::<bool>()) {
            shape.source_timeout = false;
            shape.destination_timeout = false;
            let mut kernel = kernel(always);
            let comm = shape.insert(&mut kernel);
            let request = Request::new(ActorId(1), Call::CommWait { comm, timeout: None });
            prop_assert_eq!(is_enabled(&kernel, &request), shape.ready());
        }

        #[test]
        fn timed_wait_follows_the_timeout_policy(
            shape in comm_shape(),
            request_timeout in any::<bool>(),
            always in any::<bool>()
        ) {
            prop_assume!(request_timeout || shape.source_timeout || shape.destination_timeout);
            let mut kernel = kernel(always);
            let comm = shape.insert(&mut kernel);
            let timeout = request_timeout.then_some(1.0);
            let request = Request::new(ActorId(1), Call::CommWait { comm, timeout });
            let expected = always || shape.state.is_terminal() || shape.both_bound();
            prop_assert_eq!(is_enabled(&kernel, &request), expected);
        }

        #[test]
        fn wait_any_needs_one_ready_candidate(
            shapes in prop::collection::vec(comm_shape(), 1..5),
            always in any::<bool>()
        ) {
            let mut kernel = kernel(always);
            let comms = shapes.iter().map(|s| s.insert(&mut kernel)).collect();
            let request = Request::new(ActorId(1), Call::CommWaitAny { comms, timeout: None });
            prop_assert_eq!(is_enabled(&kernel, &request), shapes.iter().any(CommShape::ready));
        }

        #[test]
        fn lock_needs_a_free_or_own_mutex(
            owner in actor(),
            issuer in (1u32..4).prop_map(ActorId),
            always in any::<bool>()
        ) {
            let mut kernel = kernel(always);
            kernel.mutexes.push(Mutex {
                owner,
                depth: u32::from(owner.is_some()),
                ..Mutex::default()
            });
            let request = Request::new(issuer, Call::MutexLock { mutex: MutexId(0) });
            prop_assert_eq!(
                is_enabled(&kernel, &request),
                owner.is_none() || owner == Some(issuer)
            );
        }
    }

    #[test]
    fn waits_on_stale_handles_are_disabled() {
        let mut kernel = kernel(true);
        let comm = CommShape {
            source: Some(ActorId(1)),
            destination: Some(ActorId(2)),
            detached: false,
            readiness: Readiness::Ready,
            state: ActivityState::Ready,
            source_timeout: false,
            destination_timeout: false,
        }
        .insert(&mut kernel);
        kernel.registry.release(comm).unwrap();
        let wait = Request::new(ActorId(1), Call::CommWait { comm, timeout: Some(1.0) });
        assert!(!is_enabled(&kernel, &wait));
        let lock = Request::new(ActorId(1), Call::MutexLock { mutex: MutexId(3) });
        assert!(!is_enabled(&kernel, &lock));
    }

    #[test]
    fn remaining_rows() {
        let kernel = kernel(true);
        let issuer = ActorId(1);
        let draw = |min, max| Request::new(issuer, Call::McRandom { min, max });
        assert!(is_enabled(&kernel, &draw(2, 2)));
        assert!(!is_enabled(&kernel, &draw(3, 1)));
        let acquire = Request::new(
            issuer,
            Call::SemAcquire {
                sem: SemaphoreId(0),
                timeout: None,
            },
        );
        assert!(is_enabled(&kernel, &acquire));
        let sleep = Request::new(issuer, Call::Sleep { duration: 1.0 });
        assert!(is_enabled(&kernel, &sleep));
    }
}
