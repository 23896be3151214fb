//! Mailboxes and the communication simcalls.
//!
//! A send and a receive posted on the same mailbox rendezvous: the
//! second one to arrive matches the oldest opposite-side communication
//! in the queue instead of enqueuing its own. In standalone mode the
//! match starts the transfer computation; under verifier control the
//! transfer completes when a wait on it is fired.

use std::collections::VecDeque;

use weft_core::{ActivityFailure, ActivityId, ActorId, CallKind, MailboxId, SimcallValue};

use crate::activity::{Activity, ActivityKind, ActivityState, CommSide, Communication, Readiness, Waiter};
use crate::error::{KernelError, ProtocolViolation};
use crate::kernel::Kernel;

/// Rendezvous point: unmatched communications, oldest first.
#[derive(Clone, Debug, Default)]
pub(crate) struct Mailbox {
    pub(crate) queue: VecDeque<ActivityId>,
}

/// Whether firing a wait on `activity` completes it without a timeout.
///
/// True once terminal, once both peers are bound, or for a detached
/// send whose sender left after the data reached a bound receiver.
pub(crate) fn comm_is_ready(activity: &Activity) -> bool {
    if activity.state().is_terminal() {
        return true;
    }
    let Some(comm) = activity.comm() else {
        return false;
    };
    if comm.is_detached && comm.source_actor.is_none() && comm.readiness == Readiness::Ready {
        return comm.destination_actor.is_some();
    }
    comm.is_matched()
}

impl Kernel {
    /// Remove and return the oldest communication posted by `side`.
    fn take_match(
        &mut self,
        mailbox: MailboxId,
        side: CommSide,
    ) -> Result<Option<ActivityId>, KernelError> {
        let registry = &self.registry;
        let queue = &mut self
            .mailboxes
            .get_mut(mailbox.0 as usize)
            .ok_or(KernelError::UnknownObject {
                kind: "mailbox",
                id: mailbox.0,
            })?
            .queue;
        let pos = queue.iter().position(|id| {
            registry
                .get(*id)
                .ok()
                .and_then(Activity::comm)
                .is_some_and(|c| c.origin == side)
        });
        Ok(pos.and_then(|p| queue.remove(p)))
    }

    /// Bind the second peer of a matched communication and start it.
    fn start_transfer(&mut self, id: ActivityId, bind: impl FnOnce(&mut Communication)) -> Result<(), KernelError> {
        let now = self.clock;
        let verifier = self.config.control.is_verifier();
        let activity = self.registry.get_mut(id)?;
        let mut size = 0;
        if let Some(comm) = activity.comm_mut() {
            bind(comm);
            comm.readiness = Readiness::Ready;
            comm.in_mailbox = false;
            size = comm.size;
        }
        activity.state = ActivityState::Ready;
        if !verifier {
            activity.backing = Some(self.model.communicate(now, size));
        }
        Ok(())
    }

    fn post_comm(&mut self, mailbox: MailboxId, comm: Communication) -> Result<ActivityId, KernelError> {
        let id = self
            .registry
            .insert(Activity::new(ActivityKind::Communication(comm)))?;
        if let Some(mbox) = self.mailboxes.get_mut(mailbox.0 as usize) {
            mbox.queue.push_back(id);
        }
        Ok(id)
    }

    /// Give `pid` an owning handle to `id` and answer with it.
    fn hand_out(&mut self, pid: ActorId, id: ActivityId) -> Result<(), KernelError> {
        self.registry.acquire(id)?;
        self.actor_mut(pid)?.handles.push(id);
        self.answer(pid, Ok(SimcallValue::Comm(id)));
        Ok(())
    }

    pub(crate) fn handle_isend(
        &mut self,
        pid: ActorId,
        mailbox: MailboxId,
        size: u64,
        payload: u64,
        detached: bool,
    ) -> Result<(), KernelError> {
        let id = match self.take_match(mailbox, CommSide::Recv)? {
            Some(id) => {
                self.start_transfer(id, |comm| {
                    comm.source_actor = Some(pid);
                    comm.is_detached = detached;
                    comm.size = size;
                    comm.payload = payload;
                })?;
                id
            }
            None => {
                let mut comm = Communication::posted(mailbox, CommSide::Send, pid);
                comm.is_detached = detached;
                comm.size = size;
                comm.payload = payload;
                self.post_comm(mailbox, comm)?
            }
        };
        if detached {
            self.answer(pid, Ok(SimcallValue::Unit));
            Ok(())
        } else {
            self.hand_out(pid, id)
        }
    }

    pub(crate) fn handle_irecv(&mut self, pid: ActorId, mailbox: MailboxId) -> Result<(), KernelError> {
        let id = match self.take_match(mailbox, CommSide::Send)? {
            Some(id) => {
                self.start_transfer(id, |comm| comm.destination_actor = Some(pid))?;
                id
            }
            None => self.post_comm(mailbox, Communication::posted(mailbox, CommSide::Recv, pid))?,
        };
        self.hand_out(pid, id)
    }

    fn check_handle(&self, pid: ActorId, id: ActivityId) -> Result<(), KernelError> {
        let held = self.actors.get(&pid).is_some_and(|r| r.holds(id));
        if held {
            Ok(())
        } else {
            Err(ProtocolViolation::HandleNotHeld {
                actor: pid,
                activity: id,
            }
            .into())
        }
    }

    pub(crate) fn handle_wait(
        &mut self,
        pid: ActorId,
        comm: ActivityId,
        timeout: Option<f64>,
        value: i32,
    ) -> Result<(), KernelError> {
        self.check_handle(pid, comm)?;
        let terminal = self.registry.get(comm)?.state().is_terminal();
        if self.config.control.is_verifier() && !terminal {
            if value < 0 {
                self.fail_activity(comm, ActivityFailure::Timeout)?;
            } else {
                self.registry.get_mut(comm)?.post();
            }
        }
        let activity = self.registry.get_mut(comm)?;
        activity.register_waiter(Waiter {
            actor: pid,
            call: CallKind::CommWait,
            index: 0,
        });
        if activity.state().is_terminal() {
            return self.finish(comm);
        }
        if timeout.is_some() {
            if let Some(c) = activity.comm_mut() {
                if c.source_actor == Some(pid) {
                    c.source_timeout = true;
                } else {
                    c.destination_timeout = true;
                }
            }
        }
        self.block(pid, CallKind::CommWait, &[comm]);
        self.arm_timer(pid, timeout);
        Ok(())
    }

    pub(crate) fn handle_waitany(
        &mut self,
        pid: ActorId,
        comms: &[ActivityId],
        timeout: Option<f64>,
        value: i32,
    ) -> Result<(), KernelError> {
        for &id in comms {
            self.check_handle(pid, id)?;
        }
        if self.config.control.is_verifier() {
            return self.pick_candidate(pid, comms, value);
        }
        if comms.is_empty() && timeout.is_none() {
            self.answer(pid, Ok(SimcallValue::Index(None)));
            return Ok(());
        }
        for (index, &id) in comms.iter().enumerate() {
            if self.registry.get(id)?.state().is_terminal() {
                self.answer(pid, Ok(SimcallValue::Index(Some(index))));
                return Ok(());
            }
        }
        for (index, &id) in comms.iter().enumerate() {
            self.registry.get_mut(id)?.register_waiter(Waiter {
                actor: pid,
                call: CallKind::CommWaitAny,
                index,
            });
        }
        self.block(pid, CallKind::CommWaitAny, comms);
        self.arm_timer(pid, timeout);
        Ok(())
    }

    /// Verifier choice for wait-any / test-any: `value` is the index of
    /// the candidate to complete, or -1 when a test-any found nothing.
    fn pick_candidate(&mut self, pid: ActorId, comms: &[ActivityId], value: i32) -> Result<(), KernelError> {
        let Ok(index) = usize::try_from(value) else {
            self.answer(pid, Ok(SimcallValue::Index(None)));
            return Ok(());
        };
        let Some(&id) = comms.get(index) else {
            let kind = self.request(pid).map_or(CallKind::CommWaitAny, |r| r.kind());
            return Err(ProtocolViolation::DisabledTransition {
                actor: pid,
                kind,
                value,
            }
            .into());
        };
        self.complete_now(id)?;
        self.answer(pid, Ok(SimcallValue::Index(Some(index))));
        Ok(())
    }

    /// Mark a communication done (unless terminal) and deliver to its
    /// waiters.
    fn complete_now(&mut self, id: ActivityId) -> Result<(), KernelError> {
        let activity = self.registry.get_mut(id)?;
        if !activity.state().is_terminal() {
            activity.post();
        }
        self.finish(id)
    }

    pub(crate) fn handle_test(&mut self, pid: ActorId, comm: ActivityId) -> Result<(), KernelError> {
        self.check_handle(pid, comm)?;
        let verifier = self.config.control.is_verifier();
        let activity = self.registry.get_mut(comm)?;
        let completed = if verifier {
            comm_is_ready(activity)
        } else {
            activity.state().is_terminal()
        };
        if !completed {
            self.answer(pid, Ok(SimcallValue::Bool(false)));
            return Ok(());
        }
        if !activity.state().is_terminal() {
            activity.post();
        }
        activity.register_waiter(Waiter {
            actor: pid,
            call: CallKind::CommTest,
            index: 0,
        });
        self.finish(comm)
    }

    pub(crate) fn handle_testany(
        &mut self,
        pid: ActorId,
        comms: &[ActivityId],
        value: i32,
    ) -> Result<(), KernelError> {
        for &id in comms {
            self.check_handle(pid, id)?;
        }
        if self.config.control.is_verifier() {
            return self.pick_candidate(pid, comms, value);
        }
        let mut found = None;
        for (index, &id) in comms.iter().enumerate() {
            if self.registry.get(id)?.state().is_terminal() {
                found = Some(index);
                break;
            }
        }
        self.answer(pid, Ok(SimcallValue::Index(found)));
        Ok(())
    }
}
