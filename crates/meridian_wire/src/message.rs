//! Transport message kinds, independent of encoding.

use meridian_core::{ClientId, PlayerId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which side originated an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    /// Client-sent event, dispatched to an event handler
    FromClient,
    /// Server-emitted event, queued by a handler via `emit_event`
    FromServer,
}

/// One encoding-independent transport message
#[derive(Debug, Clone, PartialEq)]
pub enum TransportMessage {
    /// Join request for a room
    Join {
        /// Account identity (from external auth)
        player: PlayerId,
        /// Device/instance identity
        client: ClientId,
        /// Application join payload
        payload: Value,
    },
    /// Accept/deny answer to a join
    JoinResponse {
        /// Whether the join was accepted
        accepted: bool,
        /// Deny reason when rejected
        reason: Option<String>,
    },
    /// Client-requested state mutation
    Action {
        /// Client-chosen request id, echoed in the response
        request: u32,
        /// Declared action name
        name: String,
        /// Action payload
        payload: Value,
    },
    /// Typed answer to an action
    ActionResponse {
        /// Echoed request id
        request: u32,
        /// Handler result or error message
        result: Result<Value, String>,
    },
    /// Fire-and-forget event in either direction
    Event {
        /// Originating side
        direction: Direction,
        /// Declared event name
        name: String,
        /// Event payload
        payload: Value,
    },
    /// Connection-level error notification
    Error {
        /// Numeric error code
        code: u16,
        /// Human-readable message
        message: String,
    },
}
