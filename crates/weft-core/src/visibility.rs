//! Visibility filter.
//!
//! Only calls that can change the set of interleavings a correctness
//! property observes are offered to the verifier. Everything else is a
//! deterministic, locally resolvable operation that the scheduler
//! services on the spot; hiding those keeps exhaustive exploration of
//! realistic programs tractable.

use crate::simcall::{CallKind, Request};

impl CallKind {
    /// Whether requests of this kind must be offered to the verifier.
    pub fn is_visible(self) -> bool {
        matches!(
            self,
            Self::CommIsend
                | Self::CommIrecv
                | Self::CommWait
                | Self::CommWaitAny
                | Self::CommTest
                | Self::CommTestAny
                | Self::McRandom
                | Self::MutexLock
                | Self::MutexTrylock
                | Self::MutexUnlock
        )
    }
}

/// Whether `request` is relevant to the checker.
///
/// Pure: depends on the call kind alone.
pub fn is_visible(request: &Request) -> bool {
    request.kind().is_visible()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{ActivityId, ActorId, BarrierId, SemaphoreId};
    use crate::simcall::Call;
    use proptest::prelude::*;

    #[test]
    fn communication_and_mutex_calls_are_visible() {
        let visible: Vec<_> = CallKind::ALL
            .into_iter()
            .filter(|k| k.is_visible())
            .collect();
        assert_eq!(
            visible,
            vec![
                CallKind::CommIsend,
                CallKind::CommIrecv,
                CallKind::CommWait,
                CallKind::CommWaitAny,
                CallKind::CommTest,
                CallKind::CommTestAny,
                CallKind::McRandom,
                CallKind::MutexLock,
                CallKind::MutexTrylock,
                CallKind::MutexUnlock,
            ]
        );
    }

    #[test]
    fn local_bookkeeping_is_hidden() {
        let sem = Request::new(
            ActorId(1),
            Call::SemAcquire {
                sem: SemaphoreId(0),
                timeout: None,
            },
        );
        assert!(!is_visible(&sem));
        let cancel = Request::new(
            ActorId(1),
            Call::ActivityCancel {
                activity: ActivityId::new(0, 0),
            },
        );
        assert!(!is_visible(&cancel));
        assert!(!is_visible(&Request::new(ActorId(1), Call::Sleep { duration: 1.0 })));
        let barrier = Request::new(
            ActorId(2),
            Call::BarrierEnter {
                barrier: BarrierId(0),
            },
        );
        assert!(!is_visible(&barrier));
    }

    proptest! {
        #[test]
        fn visibility_is_idempotent(code in 0u8..21) {
            let kind = CallKind::from_code(code).unwrap();
            prop_assert_eq!(kind.is_visible(), kind.is_visible());
        }
    }
}
