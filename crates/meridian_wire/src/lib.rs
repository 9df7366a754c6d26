//! MERIDIAN.SYNC Wire Codec
//!
//! Serializes transport messages and state updates across three negotiated
//! encodings: plain keyed JSON (debug), positional opcode arrays, and the
//! production default - opcode arrays with 32-bit path hashes, per-viewer
//! dynamic-key slot compression, and MessagePack binary framing.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod error;
pub mod message;
pub mod opcode;
pub mod slot;

pub use codec::{Codec, Encoding};
pub use error::ProtocolError;
pub use message::{Direction, TransportMessage};
pub use slot::{SlotReader, SlotRef, SlotTable};
