//! MERIDIAN.SYNC Journal
//!
//! Per-tick frame log of everything that entered a room: joins, leaves,
//! actions, client events, and the resolver outputs each of them consumed.
//! A sealed frame optionally carries the post-tick state hash and a full
//! snapshot side-channel. The log is the sole input the reevaluation
//! verifier needs to re-run a room.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod frame;
pub mod io;
pub mod recorder;

pub use frame::{FrameLog, RecordedInput, RecordedServerEvent, ResolverOutputMap, TickFrame};
pub use io::{JournalError, JournalReader, JournalWriter};
pub use recorder::{RecordOptions, Recorder};
