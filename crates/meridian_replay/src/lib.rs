//! Reevaluation verifier for recorded room runs.
//!
//! A frame log plus the room definition is a complete description of a run:
//! every input arrived in a known order, every resolver output was captured,
//! and every tick boundary carries the hash the live room computed. This
//! crate replays the log through the same command dispatcher and compares
//! what it recomputes against what was recorded. Any divergence means a
//! handler consumed nondeterministic data outside the resolver channel.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod diff;
pub mod reevaluate;
pub mod report;

pub use diff::{diff_values, FieldDivergence};
pub use reevaluate::Reevaluator;
pub use report::{ReevaluationReport, TickMismatch};
