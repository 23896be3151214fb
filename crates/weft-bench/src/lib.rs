//! Benchmark workloads for the Weft kernel.
//!
//! Each builder returns a kernel with its actors spawned and ready to
//! drive:
//!
//! - [`pipeline_profile`]: `pairs` independent sender/receiver pairs,
//!   each exchanging `messages` payloads over its own mailbox
//! - [`contention_profile`]: `actors` actors taking one shared mutex
//!   `iterations` times each, computing while they hold it
//! - [`fan_in_profile`]: `senders` detached senders and one receiver
//!   that posts every receive, wait-anys for the first, then drains
//!
//! The same workloads built with [`KernelConfig::verifier`] serve as
//! small exploration targets.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use weft_core::{Call, MailboxId};
use weft_kernel::{ConfigError, Kernel, KernelConfig};
use weft_test_utils::{EventLog, Op, ScriptedActor};

/// Flops each contention critical section computes.
pub const CRITICAL_SECTION_FLOPS: f64 = 1.0e6;

/// Build the pipeline workload.
pub fn pipeline_profile(
    config: KernelConfig,
    pairs: usize,
    messages: u64,
) -> Result<Kernel, ConfigError> {
    let mut kernel = Kernel::new(config)?;
    let log = EventLog::new();
    for _ in 0..pairs {
        let mailbox = kernel.create_mailbox();
        kernel.spawn("sender", ScriptedActor::new(sends(mailbox, messages), log.clone()));
        kernel.spawn("receiver", ScriptedActor::new(recvs(mailbox, messages), log.clone()));
    }
    Ok(kernel)
}

/// Build the mutex contention workload.
pub fn contention_profile(
    config: KernelConfig,
    actors: usize,
    iterations: usize,
) -> Result<Kernel, ConfigError> {
    let mut kernel = Kernel::new(config)?;
    let log = EventLog::new();
    let mutex = kernel.create_mutex();
    for _ in 0..actors {
        let mut ops = Vec::with_capacity(iterations * 3);
        for _ in 0..iterations {
            ops.push(Op::Call(Call::MutexLock { mutex }));
            ops.push(Op::Call(Call::Execute {
                flops: CRITICAL_SECTION_FLOPS,
            }));
            ops.push(Op::Call(Call::MutexUnlock { mutex }));
        }
        kernel.spawn("worker", ScriptedActor::new(ops, log.clone()));
    }
    Ok(kernel)
}

/// Build the fan-in workload.
pub fn fan_in_profile(config: KernelConfig, senders: usize) -> Result<Kernel, ConfigError> {
    let mut kernel = Kernel::new(config)?;
    let log = EventLog::new();
    let mailbox = kernel.create_mailbox();
    for payload in 0..senders as u64 {
        kernel.spawn(
            "sender",
            ScriptedActor::new(vec![Op::SendDetached { mailbox, payload }], log.clone()),
        );
    }
    let mut ops: Vec<Op> = (0..senders).map(|_| Op::Recv { mailbox }).collect();
    ops.push(Op::WaitAny { timeout: None });
    ops.extend((0..senders).map(|_| Op::Wait { timeout: None }));
    kernel.spawn("sink", ScriptedActor::new(ops, log));
    Ok(kernel)
}

fn sends(mailbox: MailboxId, messages: u64) -> Vec<Op> {
    (0..messages)
        .flat_map(|payload| [Op::Send { mailbox, payload }, Op::Wait { timeout: None }])
        .collect()
}

fn recvs(mailbox: MailboxId, messages: u64) -> Vec<Op> {
    (0..messages)
        .flat_map(|_| [Op::Recv { mailbox }, Op::Wait { timeout: None }])
        .collect()
}
