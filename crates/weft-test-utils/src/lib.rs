//! Test utilities and mock types for Weft development.
//!
//! Provides scripted actors ([`ScriptedActor`]) that replay a fixed
//! sequence of operations and log every answer they receive, and a
//! hand-driven resource model ([`ManualModel`]) whose computations
//! complete only when a test says so.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod model;
pub mod script;

pub use model::{ManualAction, ManualControl, ManualModel};
pub use script::{Event, EventLog, Op, ScriptedActor};
