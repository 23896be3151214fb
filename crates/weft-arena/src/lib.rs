//! Generation-checked, reference-counted activity registry.
//!
//! The kernel is the only true owner of activities; actors merely hold
//! [`ActivityId`](weft_core::ActivityId)s. Each id carries the slot
//! generation it was minted with, so a handle that outlived its
//! activity is rejected on lookup in O(1) instead of aliasing whatever
//! reuses the slot.
//!
//! # Ownership model
//!
//! ```text
//! Registry<T>
//! ├── Slot[] (generation + optional Entry)
//! │   └── Entry { value: T, refcount }
//! └── free list (LIFO slot reuse)
//! ```
//!
//! Every live entry counts its distinct owners. [`Registry::release`]
//! hands the value back to the caller exactly once, on the 1 → 0
//! transition, so finalization runs once and never twice. Releasing
//! past zero is reported as a stale handle, never ignored.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod registry;

pub use config::RegistryConfig;
pub use error::ArenaError;
pub use registry::{Registry, Release};
