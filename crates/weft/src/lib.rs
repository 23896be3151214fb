//! Weft: a discrete-event simulation kernel for message-passing programs,
//! with an interleaving model checker on top.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Weft sub-crates. For most users, adding `weft` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use weft::prelude::*;
//!
//! let mut kernel = Kernel::new(KernelConfig::default()).unwrap();
//! let mailbox = kernel.create_mailbox();
//!
//! // Each actor issues a transfer, waits on it, then exits.
//! let actor = |call: Call| {
//!     let mut first = Some(call);
//!     move |wakeup: Wakeup| match (first.take(), wakeup.result) {
//!         (Some(call), _) => Step::Call(call),
//!         (None, Some(Ok(SimcallValue::Comm(comm)))) => {
//!             Step::Call(Call::CommWait { comm, timeout: None })
//!         }
//!         _ => Step::Exit,
//!     }
//! };
//! kernel.spawn(
//!     "sender",
//!     actor(Call::CommIsend { mailbox, size: 1_000_000_000, payload: 42, detached: false }),
//! );
//! kernel.spawn("receiver", actor(Call::CommIrecv { mailbox }));
//!
//! // One gigabyte at the default one gigabyte per second.
//! assert_eq!(kernel.run().unwrap(), RunOutcome::Completed { clock: 1.0 });
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `weft-core` | IDs, simcalls, actor and resource-model traits |
//! | [`arena`] | `weft-arena` | Generation-checked refcounted activity registry |
//! | [`replay`] | `weft-replay` | Random oracle, record traces, binary and textual formats |
//! | [`kernel`] | `weft-kernel` | The kernel: scheduling, activities, sync objects |
//! | [`check`] | `weft-check` | Interleaving exploration and trace replay |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and IDs (`weft-core`).
///
/// Contains the simcall vocabulary ([`types::Call`], [`types::SimcallValue`])
/// and the traits actors and resource models implement
/// ([`types::ActorCode`], [`types::ResourceModel`], [`types::Action`]).
pub use weft_core as types;

/// Activity storage (`weft-arena`).
pub use weft_arena as arena;

/// Recording and replaying executions (`weft-replay`).
///
/// Write traces with [`replay::TraceWriter`], read them back with
/// [`replay::TraceReader`], and exchange them as `pid/value` paths.
pub use weft_replay as replay;

/// The simulation kernel (`weft-kernel`).
///
/// [`kernel::Kernel`] runs standalone with [`kernel::Kernel::run`], or
/// under an external verifier through [`kernel::Kernel::fire`].
pub use weft_kernel as kernel;

/// Interleaving exploration (`weft-check`).
pub use weft_check as check;

/// Common imports for typical Weft usage.
///
/// ```rust
/// use weft::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use weft_core::{
        ActivityFailure, ActivityId, ActorCode, ActorId, Call, MailboxId, MutexId,
        ResourceModel, SimcallResult, SimcallValue, Step, Wakeup,
    };

    // Kernel
    pub use weft_kernel::{
        ConstantModel, ControlMode, Kernel, KernelConfig, KernelError, RunOutcome,
    };

    // Replay
    pub use weft_replay::{RecordTrace, Transition};

    // Exploration
    pub use weft_check::{ExplorationConfig, Explorer, Outcome};
}
