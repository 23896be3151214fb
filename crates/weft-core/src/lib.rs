//! Core types and traits for the Weft simulation kernel.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by every other Weft crate: actor and activity
//! identifiers, the simcall (request) model, the visibility filter,
//! activity failure results, and the traits through which the kernel
//! talks to simulated actors and to the resource model.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod simcall;
pub mod traits;
pub mod visibility;

pub use error::ActivityFailure;
pub use id::{ActivityId, ActorId, BarrierId, ConditionId, MailboxId, MutexId, RoundId, SemaphoreId};
pub use simcall::{Call, CallKind, Candidates, Request, SimcallResult, SimcallValue};
pub use traits::{Action, ActorCode, ResourceModel, Step, Wakeup};
pub use visibility::is_visible;
