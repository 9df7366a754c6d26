//! Reevaluation results.

use meridian_core::StateHash;
use serde::{Deserialize, Serialize};

use crate::diff::FieldDivergence;

/// One tick whose recomputed state disagrees with the recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickMismatch {
    /// The diverging tick
    pub tick: u64,
    /// Hash the live room recorded, `None` if hashes were not captured
    pub recorded: Option<StateHash>,
    /// Hash the reevaluation computed
    pub recomputed: StateHash,
    /// Per-field localization, empty unless the journal carried the
    /// snapshot side-channel
    pub field_diff: Vec<FieldDivergence>,
}

/// Outcome of replaying one frame log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReevaluationReport {
    /// Sealed frames whose tick was re-executed
    pub ticks_replayed: u64,
    /// Recorded inputs re-applied
    pub inputs_replayed: usize,
    /// Every tick that diverged
    pub mismatches: Vec<TickMismatch>,
}

impl ReevaluationReport {
    /// Whether the run reproduced exactly
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.mismatches.is_empty()
    }

    /// The earliest diverging tick, if any
    #[must_use]
    pub fn first_mismatch(&self) -> Option<&TickMismatch> {
        self.mismatches.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report_is_deterministic() {
        let report = ReevaluationReport::default();
        assert!(report.is_deterministic());
        assert!(report.first_mismatch().is_none());
    }

    #[test]
    fn test_first_mismatch_is_earliest() {
        let mismatch = |tick| TickMismatch {
            tick,
            recorded: Some(StateHash::from_raw(1)),
            recomputed: StateHash::from_raw(2),
            field_diff: Vec::new(),
        };
        let report = ReevaluationReport {
            ticks_replayed: 5,
            inputs_replayed: 3,
            mismatches: vec![mismatch(2), mismatch(4)],
        };
        assert!(!report.is_deterministic());
        assert_eq!(report.first_mismatch().map(|m| m.tick), Some(2));
    }
}
