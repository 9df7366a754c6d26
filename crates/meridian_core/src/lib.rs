//! MERIDIAN.SYNC Core Types
//!
//! This crate contains pure types and logic with no I/O: identities,
//! sync-field paths, FNV-1a hashing, patches, state updates, and schema
//! versions. Everything here is deterministic and serializable.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod hash;
pub mod id;
pub mod patch;
pub mod path;
pub mod version;

// Re-exports
pub use error::{CoreError, CoreResult};
pub use hash::{fnv1a32, fnv1a64, PathHash, StateHash};
pub use id::{ClientId, PlayerId, RoomId, SessionId};
pub use patch::{Patch, PatchOp, Snapshot, StateUpdate};
pub use path::{ConcretePath, FieldId, PathMatch, PathPattern, Segment};
pub use version::{SchemaVersion, DEFAULT_SINCE};
