//! Interleaving exploration and trace replay for Weft.
//!
//! [`Explorer`] drives a kernel under verifier control through every
//! order in which enabled transitions can fire, re-executing from
//! scratch for each branch, and stops at the first deadlock or property
//! violation with a [`RecordTrace`](weft_replay::RecordTrace) that
//! reproduces it. [`replay_trace`] fires such a trace again.
//!
//! # Example
//!
//! ```
//! use weft_check::{ExplorationConfig, Explorer, Outcome};
//! use weft_core::{Call, Step, Wakeup};
//! use weft_kernel::{Kernel, KernelConfig};
//!
//! let explorer = Explorer::new(ExplorationConfig::default()).unwrap();
//! let report = explorer
//!     .explore_deadlocks(|| {
//!         let mut kernel = Kernel::new(KernelConfig::verifier())?;
//!         let mutex = kernel.create_mutex();
//!         for name in ["a", "b"] {
//!             let mut locked = false;
//!             kernel.spawn(name, move |_: Wakeup| {
//!                 let step = if locked {
//!                     Step::Exit
//!                 } else {
//!                     Step::Call(Call::MutexLock { mutex })
//!                 };
//!                 locked = true;
//!                 step
//!             });
//!         }
//!         Ok(kernel)
//!     })
//!     .unwrap();
//! // Exiting releases the mutex, so both orders complete.
//! assert_eq!(report.outcome, Outcome::Exhausted);
//! assert_eq!(report.terminal_states, 2);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod explorer;
pub mod replay;

pub use config::ExplorationConfig;
pub use error::CheckError;
pub use explorer::{Explorer, Outcome, Report};
pub use replay::{replay_path, replay_trace};
