//! Frame and input types for the journal.
//!
//! Resolver outputs are recorded as a named JSON map next to the input that
//! consumed them, so replay substitutes the recorded values instead of
//! re-running the resolvers.

use indexmap::IndexMap;
use meridian_core::{SessionId, StateHash};
use meridian_schema::Viewer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Recorded resolver outputs, keyed by resolver name
pub type ResolverOutputMap = IndexMap<String, Value>;

/// One recorded room input, in arrival order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RecordedInput {
    /// Room initialization; always the first input of frame 0
    Initialize,
    /// An accepted join
    Join {
        /// The joining viewer
        viewer: Viewer,
        /// Application join payload
        payload: Value,
        /// Outputs the join resolvers produced
        resolver_outputs: ResolverOutputMap,
    },
    /// A session leaving the room
    Leave {
        /// The departing session
        session: SessionId,
    },
    /// An accepted action request
    Action {
        /// Requesting session
        session: SessionId,
        /// Declared action name
        name: String,
        /// Action payload
        payload: Value,
        /// Outputs the action's resolvers produced
        resolver_outputs: ResolverOutputMap,
    },
    /// A client-sent event
    ClientEvent {
        /// Originating session
        session: SessionId,
        /// Declared event name
        name: String,
        /// Event payload
        payload: Value,
        /// Outputs the event's resolvers produced
        resolver_outputs: ResolverOutputMap,
    },
}

/// A server-emitted event captured during a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedServerEvent {
    /// Targeted session, `None` for a broadcast
    pub target: Option<SessionId>,
    /// Event name
    pub name: String,
    /// Event payload
    pub payload: Value,
}

/// All inputs of one tick, sealed with optional verification data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickFrame {
    /// Tick number; frame 0 holds initialization
    pub tick: u64,
    /// Inputs in arrival order
    pub inputs: Vec<RecordedInput>,
    /// Post-tick hash of the full state tree, when recorded
    pub state_hash: Option<StateHash>,
    /// Full post-tick snapshot side-channel, when recorded
    pub snapshot: Option<Value>,
    /// Server events emitted during the frame, when recorded
    pub server_events: Vec<RecordedServerEvent>,
}

impl TickFrame {
    /// Create an empty, unsealed frame
    #[must_use]
    pub fn new(tick: u64) -> Self {
        Self {
            tick,
            inputs: Vec::new(),
            state_hash: None,
            snapshot: None,
            server_events: Vec::new(),
        }
    }

    /// Whether the frame recorded anything
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty() && self.server_events.is_empty()
    }
}

/// A complete recorded room run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameLog {
    frames: Vec<TickFrame>,
}

impl FrameLog {
    /// Create an empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sealed frame
    pub fn push(&mut self, frame: TickFrame) {
        self.frames.push(frame);
    }

    /// The sealed frames, in tick order
    #[must_use]
    pub fn frames(&self) -> &[TickFrame] {
        &self.frames
    }

    /// Number of sealed frames
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the log holds no frames
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FromIterator<TickFrame> for FrameLog {
    fn from_iter<I: IntoIterator<Item = TickFrame>>(iter: I) -> Self {
        Self {
            frames: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_frame_starts_unsealed() {
        let frame = TickFrame::new(0);
        assert!(frame.is_empty());
        assert!(frame.state_hash.is_none());
        assert!(frame.snapshot.is_none());
    }

    #[test]
    fn test_log_keeps_tick_order() {
        let mut log = FrameLog::new();
        for tick in 0..3 {
            log.push(TickFrame::new(tick));
        }
        assert_eq!(log.len(), 3);
        let ticks: Vec<u64> = log.frames().iter().map(|f| f.tick).collect();
        assert_eq!(ticks, vec![0, 1, 2]);
    }

    #[test]
    fn test_input_round_trips_through_json() {
        let input = RecordedInput::Action {
            session: SessionId::from_bytes([1u8; 16]),
            name: "Draw".to_string(),
            payload: json!({"count": 2}),
            resolver_outputs: ResolverOutputMap::from_iter([(
                "shuffle".to_string(),
                json!([3, 1, 2]),
            )]),
        };
        let encoded = serde_json::to_vec(&input).unwrap();
        let decoded: RecordedInput = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(decoded, input);
    }
}
