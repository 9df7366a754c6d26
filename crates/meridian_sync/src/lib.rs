//! MERIDIAN.SYNC State Tree & Sync Engine
//!
//! The authoritative state tree is owned and mutated exclusively inside one
//! room's single-writer execution path; the sync engine reads it to produce
//! per-viewer snapshots and incremental diffs with deterministic patch
//! order.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod engine;
pub mod project;
pub mod tree;

pub use engine::{SyncConfig, SyncEngine};
pub use project::{project_all, project_instance};
pub use tree::{DirtyKeys, DirtyTracker, StateTree};
