//! Replaying a frame log through the room dispatcher.

use meridian_core::RoomId;
use meridian_journal::{FrameLog, RecordedInput, TickFrame};
use meridian_runtime::{
    ResolverOutputs, RoomCore, RoomDefinition, RuntimeConfig, RuntimeResult, ServiceRegistry,
};
use std::sync::Arc;
use tracing::debug;

use crate::diff::diff_values;
use crate::report::{ReevaluationReport, TickMismatch};

/// Replays recorded runs and verifies they reproduce
///
/// The reevaluator drives the same synchronous dispatcher the live executor
/// uses, but substitutes recorded resolver outputs instead of running
/// resolvers, so external services are never contacted.
pub struct Reevaluator {
    definition: RoomDefinition,
    services: Arc<ServiceRegistry>,
}

impl Reevaluator {
    /// Create a reevaluator over the definition the run was recorded with
    #[must_use]
    pub fn new(definition: RoomDefinition, services: Arc<ServiceRegistry>) -> Self {
        Self {
            definition,
            services,
        }
    }

    /// Replay a frame log from a fresh room and compare every sealed tick
    ///
    /// Frames carrying a state hash or snapshot were sealed by a live tick
    /// and get one re-executed tick each; a trailing unsealed frame is
    /// replayed for its inputs only. Handler errors inside replayed actions
    /// and events are reproduced, not reported.
    ///
    /// # Errors
    ///
    /// Returns the underlying runtime error when a recorded input fails to
    /// re-apply at all, such as a join that a nondeterministic gate now
    /// denies.
    pub fn reevaluate(&self, log: &FrameLog) -> RuntimeResult<ReevaluationReport> {
        let config = RuntimeConfig::default();
        let mut core = RoomCore::new(
            RoomId::new(),
            self.definition.clone(),
            self.services.clone(),
            &config,
        );
        let mut report = ReevaluationReport::default();

        for frame in log.frames() {
            for input in &frame.inputs {
                self.apply_input(&mut core, input)?;
                report.inputs_replayed += 1;
            }
            if !sealed_by_tick(frame) {
                continue;
            }

            let _ = core.apply_tick();
            report.ticks_replayed += 1;

            let recomputed = core.state_hash();
            let hash_matches = frame.state_hash.map_or(true, |hash| hash == recomputed);
            let field_diff = frame
                .snapshot
                .as_ref()
                .map(|snapshot| diff_values(snapshot, &core.snapshot_value()))
                .unwrap_or_default();

            if !hash_matches || !field_diff.is_empty() {
                debug!(tick = frame.tick, %recomputed, "tick diverged");
                report.mismatches.push(TickMismatch {
                    tick: frame.tick,
                    recorded: frame.state_hash,
                    recomputed,
                    field_diff,
                });
            }
        }

        Ok(report)
    }

    fn apply_input(&self, core: &mut RoomCore, input: &RecordedInput) -> RuntimeResult<()> {
        match input {
            RecordedInput::Initialize => {
                core.initialize()?;
            }
            RecordedInput::Join {
                viewer,
                payload,
                resolver_outputs,
            } => {
                let outputs = ResolverOutputs::from_recorded(resolver_outputs.clone());
                core.apply_join(viewer.clone(), payload, &outputs)?;
            }
            RecordedInput::Leave { session } => {
                core.apply_leave(*session)?;
            }
            RecordedInput::Action {
                session,
                name,
                payload,
                resolver_outputs,
            } => {
                let outputs = ResolverOutputs::from_recorded(resolver_outputs.clone());
                // a recorded action may have failed live; the failure is
                // part of the run being reproduced
                let (_result, _output) = core.apply_action(*session, name, payload, &outputs);
            }
            RecordedInput::ClientEvent {
                session,
                name,
                payload,
                resolver_outputs,
            } => {
                let outputs = ResolverOutputs::from_recorded(resolver_outputs.clone());
                let _output = core.apply_event(*session, name, payload, &outputs);
            }
        }
        Ok(())
    }
}

/// Whether a frame was closed by a live tick
///
/// Sealed frames carry the hash (and optionally the snapshot) captured
/// post-tick; a trailing frame kept open at shutdown carries neither.
fn sealed_by_tick(frame: &TickFrame) -> bool {
    frame.state_hash.is_some() || frame.snapshot.is_some()
}
