//! Opcode and patch-op tables.
//!
//! The numeric tables are part of the protocol contract; both opcode-array
//! and packed encodings use them. Plain encoding carries string kinds
//! instead and never sees these values.

/// Join request
pub const OP_JOIN: u64 = 0;
/// Join accept/deny answer
pub const OP_JOIN_RESPONSE: u64 = 1;
/// Client action request
pub const OP_ACTION: u64 = 2;
/// Action result answer
pub const OP_ACTION_RESPONSE: u64 = 3;
/// Event, either direction
pub const OP_EVENT: u64 = 4;
/// Connection-level error
pub const OP_ERROR: u64 = 5;
/// State update: nothing changed for this viewer
pub const OP_NO_CHANGE: u64 = 6;
/// State update: complete projected snapshot
pub const OP_FIRST_SYNC: u64 = 7;
/// State update: incremental patch list
pub const OP_DIFF: u64 = 8;

/// Patch op: set a path absent from the viewer's baseline
pub const PATCH_ADD: u64 = 0;
/// Patch op: overwrite a path present in the viewer's baseline
pub const PATCH_REPLACE: u64 = 1;
/// Patch op: remove a path from the viewer's view
pub const PATCH_REMOVE: u64 = 2;

/// Direction code for client-originated events
pub const DIR_FROM_CLIENT: u64 = 0;
/// Direction code for server-originated events
pub const DIR_FROM_SERVER: u64 = 1;
