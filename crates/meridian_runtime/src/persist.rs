//! The persistence seam.
//!
//! Invoked at finalize with the full snapshot and the schema version it was
//! written under; restoring an older snapshot default-initializes newer
//! fields instead of running migrations.

use meridian_core::{RoomId, SchemaVersion};
use serde_json::Value;

/// Snapshot storage for finalized rooms
pub trait PersistenceSink: Send + Sync {
    /// Persist the final snapshot of a room
    ///
    /// # Errors
    ///
    /// An error is logged by the executor and dropped; destruction
    /// proceeds.
    fn save(&self, room: RoomId, snapshot: &Value, version: SchemaVersion) -> Result<(), String>;
}
