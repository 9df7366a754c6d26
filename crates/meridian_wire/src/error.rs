//! Protocol errors.
//!
//! These are surfaced to the transport for a connection-level decision
//! (drop, close, resync); the core never takes down a room over them.
//! `SlotBeforeDefinition` is deliberately distinct from payload corruption:
//! it implies the two ends disagree about the slot table, e.g. a reconnect
//! that skipped the firstSync reset.

use thiserror::Error;

/// Wire decoding/encoding failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Frame bytes did not parse or had the wrong shape
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// Frame carried an opcode outside the negotiated tables
    #[error("unexpected opcode {0}")]
    UnexpectedOpcode(u64),

    /// A packed patch referenced a path hash missing from the schema
    #[error("unknown path hash {0:08x}")]
    UnknownPathHash(u32),

    /// A plain/opcode patch carried a path matching no sync field
    #[error("no sync field matches path {0}")]
    UnknownPath(String),

    /// Dynamic key count did not match the field's wildcard count
    #[error("wrong dynamic key arity for {pattern}: expected {expected}, got {got}")]
    WrongKeyArity {
        /// The field's pattern
        pattern: String,
        /// Wildcard count declared by the schema
        expected: usize,
        /// Keys present on the wire
        got: usize,
    },

    /// A slot reference arrived before its definition - desync, not
    /// corruption
    #[error("slot {0} referenced before definition")]
    SlotBeforeDefinition(u32),

    /// A slot was rebound to a different key without a firstSync reset
    #[error("slot {slot} redefined from {existing:?} to {incoming:?}")]
    SlotRedefined {
        /// The slot number
        slot: u32,
        /// Key the slot was bound to
        existing: String,
        /// Key the definition tried to bind
        incoming: String,
    },
}
