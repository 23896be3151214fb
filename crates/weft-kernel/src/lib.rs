//! Activity/actor execution kernel for Weft.
//!
//! The kernel tracks the pending asynchronous operations (activities)
//! issued by simulated actors, drives actors in deterministic rounds,
//! and answers the verifier's question "which pending request may fire
//! next". One [`Kernel`] value owns the entire state of a run.
//!
//! # Architecture
//!
//! ```text
//! Kernel
//! ├── actors        IndexMap<ActorId, record>  (pending request, handles, timer)
//! ├── registry      Registry<Activity>         (refcounted, generation-checked)
//! ├── mailboxes / mutexes / semaphores / conditions
//! ├── model         Box<dyn ResourceModel>     (backing computations)
//! └── random        RandomOracle               (free / replay / verifier)
//! ```
//!
//! Two control modes share the same servicing code:
//!
//! - **standalone** ([`Kernel::run`]): every request is serviced as
//!   issued and the clock advances to the next computation completion
//! - **verifier** ([`Kernel::wait_for_requests`], [`Kernel::pending`],
//!   [`Kernel::fire`]): invisible requests are serviced at once, visible
//!   ones wait until the driver fires them
//!
//! # Example
//!
//! ```
//! use weft_core::{Call, SimcallValue, Step, Wakeup};
//! use weft_kernel::{Kernel, KernelConfig, RunOutcome};
//!
//! let mut kernel = Kernel::new(KernelConfig::default()).unwrap();
//! let mut slept = false;
//! kernel.spawn("sleeper", move |w: Wakeup| {
//!     if slept {
//!         assert_eq!(w.result, Some(Ok(SimcallValue::Unit)));
//!         return Step::Exit;
//!     }
//!     slept = true;
//!     Step::Call(Call::Sleep { duration: 2.5 })
//! });
//! assert_eq!(kernel.run().unwrap(), RunOutcome::Completed { clock: 2.5 });
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod activity;
pub mod actor;
mod comm;
pub mod config;
pub mod enabled;
pub mod error;
pub mod kernel;
mod lifecycle;
pub mod model;
pub mod observer;
pub mod sync;

pub use activity::{Activity, ActivityKind, ActivityState, CommSide, Communication, OtherKind, Readiness, Waiter};
pub use actor::{ActorState, BlockedOn};
pub use config::{ConfigError, ControlMode, KernelConfig};
pub use enabled::is_enabled;
pub use error::{KernelError, ProtocolViolation};
pub use kernel::{Kernel, PendingRequest, RunOutcome};
pub use model::{ConstantModel, DelayAction};
pub use observer::KernelObserver;
pub use sync::{Barrier, Condition, Mutex, Semaphore};
