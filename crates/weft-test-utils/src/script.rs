//! Scripted actors.
//!
//! A [`ScriptedActor`] walks a list of [`Op`]s, one per time-slice. Ops
//! that need a communication handle refer to the handles the actor
//! collected from its own sends and receives, most recent last, so a
//! script reads like straight-line actor code:
//!
//! ```
//! use weft_core::MailboxId;
//! use weft_test_utils::{EventLog, Op, ScriptedActor};
//!
//! let log = EventLog::new();
//! let receiver = ScriptedActor::new(
//!     vec![Op::Recv { mailbox: MailboxId(0) }, Op::Wait { timeout: None }],
//!     log.clone(),
//! );
//! # let _ = receiver;
//! ```

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use weft_core::{
    ActivityId, ActorCode, ActorId, Call, CallKind, Candidates, MailboxId, SimcallResult,
    SimcallValue, Step, Wakeup,
};

/// One scripted operation.
#[derive(Clone, Debug, PartialEq)]
pub enum Op {
    /// Non-detached send; the handle joins the actor's handle list.
    Send { mailbox: MailboxId, payload: u64 },
    /// Detached send; no handle.
    SendDetached { mailbox: MailboxId, payload: u64 },
    /// Receive; the handle joins the actor's handle list.
    Recv { mailbox: MailboxId },
    /// Wait on the most recent handle, consuming it.
    Wait { timeout: Option<f64> },
    /// Wait on the handle at `slot`, consuming it.
    WaitSlot { slot: usize, timeout: Option<f64> },
    /// Wait-any over every held handle.
    WaitAny { timeout: Option<f64> },
    /// Test the most recent handle; consumed once the test succeeds.
    Test,
    /// Test-any over every held handle.
    TestAny,
    /// Any other call, issued verbatim.
    Call(Call),
}

/// One answer received by a scripted actor.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub actor: ActorId,
    pub kind: CallKind,
    pub result: SimcallResult,
    pub now: f64,
}

/// Shared, append-only log of answers, across actors.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<Event>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }

    /// Snapshot of every event so far.
    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    /// Answers received by `actor`, in order.
    pub fn results_of(&self, actor: ActorId) -> Vec<SimcallResult> {
        self.events
            .borrow()
            .iter()
            .filter(|e| e.actor == actor)
            .map(|e| e.result)
            .collect()
    }

    /// Last answer of `kind` received by `actor`.
    pub fn last(&self, actor: ActorId, kind: CallKind) -> Option<SimcallResult> {
        self.events
            .borrow()
            .iter()
            .rev()
            .find(|e| e.actor == actor && e.kind == kind)
            .map(|e| e.result)
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

/// Actor code replaying a fixed list of operations, then exiting.
pub struct ScriptedActor {
    ops: VecDeque<Op>,
    handles: Vec<ActivityId>,
    log: EventLog,
    in_flight: Option<CallKind>,
    tested: Option<ActivityId>,
}

impl ScriptedActor {
    pub fn new(ops: Vec<Op>, log: EventLog) -> Self {
        Self {
            ops: ops.into(),
            handles: Vec::new(),
            log,
            in_flight: None,
            tested: None,
        }
    }

    fn record(&mut self, pid: ActorId, now: f64, result: SimcallResult) {
        let Some(kind) = self.in_flight.take() else {
            return;
        };
        if let Ok(SimcallValue::Comm(id)) = result {
            self.handles.push(id);
        }
        if let Some(id) = self.tested.take() {
            let consumed = !matches!(result, Ok(SimcallValue::Bool(false)));
            if consumed {
                self.handles.retain(|h| *h != id);
            }
        }
        self.log.push(Event {
            actor: pid,
            kind,
            result,
            now,
        });
    }

    fn to_call(&mut self, op: Op) -> Option<Call> {
        let call = match op {
            Op::Send { mailbox, payload } => Call::CommIsend {
                mailbox,
                size: 0,
                payload,
                detached: false,
            },
            Op::SendDetached { mailbox, payload } => Call::CommIsend {
                mailbox,
                size: 0,
                payload,
                detached: true,
            },
            Op::Recv { mailbox } => Call::CommIrecv { mailbox },
            Op::Wait { timeout } => Call::CommWait {
                comm: self.handles.pop()?,
                timeout,
            },
            Op::WaitSlot { slot, timeout } => {
                if slot >= self.handles.len() {
                    return None;
                }
                Call::CommWait {
                    comm: self.handles.remove(slot),
                    timeout,
                }
            }
            Op::WaitAny { timeout } => Call::CommWaitAny {
                comms: self.handles.iter().copied().collect::<Candidates>(),
                timeout,
            },
            Op::Test => {
                let comm = *self.handles.last()?;
                self.tested = Some(comm);
                Call::CommTest { comm }
            }
            Op::TestAny => Call::CommTestAny {
                comms: self.handles.iter().copied().collect::<Candidates>(),
            },
            Op::Call(call) => call,
        };
        Some(call)
    }
}

impl ActorCode for ScriptedActor {
    fn resume(&mut self, wakeup: Wakeup) -> Step {
        if let Some(result) = wakeup.result {
            self.record(wakeup.pid, wakeup.now, result);
        }
        let Some(op) = self.ops.pop_front() else {
            return Step::Exit;
        };
        // An op without the handle it needs ends the script.
        match self.to_call(op) {
            Some(call) => {
                self.in_flight = Some(call.kind());
                Step::Call(call)
            }
            None => Step::Exit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wake(result: Option<SimcallResult>) -> Wakeup {
        Wakeup {
            pid: ActorId(1),
            now: 0.0,
            result,
        }
    }

    #[test]
    fn wait_uses_the_handle_from_recv() {
        let log = EventLog::new();
        let mut actor = ScriptedActor::new(
            vec![Op::Recv { mailbox: MailboxId(0) }, Op::Wait { timeout: None }],
            log.clone(),
        );
        assert_eq!(
            actor.resume(wake(None)),
            Step::Call(Call::CommIrecv { mailbox: MailboxId(0) })
        );
        let id = ActivityId::new(3, 0);
        assert_eq!(
            actor.resume(wake(Some(Ok(SimcallValue::Comm(id))))),
            Step::Call(Call::CommWait {
                comm: id,
                timeout: None
            })
        );
        assert_eq!(
            actor.resume(wake(Some(Ok(SimcallValue::Payload(9))))),
            Step::Exit
        );
        assert_eq!(
            log.results_of(ActorId(1)),
            vec![Ok(SimcallValue::Comm(id)), Ok(SimcallValue::Payload(9))]
        );
    }

    #[test]
    fn missing_handle_ends_the_script() {
        let mut actor = ScriptedActor::new(vec![Op::Wait { timeout: None }], EventLog::new());
        assert_eq!(actor.resume(wake(None)), Step::Exit);
    }

    #[test]
    fn failed_test_keeps_the_handle() {
        let log = EventLog::new();
        let mut actor = ScriptedActor::new(
            vec![
                Op::Send {
                    mailbox: MailboxId(0),
                    payload: 1,
                },
                Op::Test,
                Op::Test,
            ],
            log,
        );
        let id = ActivityId::new(0, 0);
        actor.resume(wake(None));
        actor.resume(wake(Some(Ok(SimcallValue::Comm(id)))));
        assert_eq!(
            actor.resume(wake(Some(Ok(SimcallValue::Bool(false))))),
            Step::Call(Call::CommTest { comm: id })
        );
        actor.resume(wake(Some(Ok(SimcallValue::Bool(true)))));
        assert!(actor.handles.is_empty());
    }
}
