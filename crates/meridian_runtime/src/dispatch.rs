//! The synchronous single-writer room core.
//!
//! `RoomCore` owns the authoritative tree and applies commands one at a
//! time: the live executor feeds it from a channel, the reevaluation
//! verifier feeds it from a recorded frame log. Resolver outputs arrive
//! already materialized, so everything in here is deterministic.
//!
//! Every mutating command ends in a sync cycle; handler errors abort only
//! their own request and never terminate the room.

use indexmap::IndexMap;
use meridian_core::{RoomId, SchemaVersion, SessionId, StateHash, StateUpdate};
use meridian_schema::Viewer;
use meridian_sync::{StateTree, SyncConfig, SyncEngine};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::RuntimeConfig;
use crate::context::{PendingEvent, RoomContext};
use crate::definition::RoomDefinition;
use crate::error::{RuntimeError, RuntimeResult};
use crate::lifecycle::RoomPhase;
use crate::resolver::ResolverOutputs;
use crate::services::ServiceRegistry;

/// What one command produced: per-viewer updates and queued server events
#[derive(Debug, Default)]
pub struct SyncOutput {
    /// One update per registered viewer, in join order
    pub updates: IndexMap<SessionId, StateUpdate>,
    /// Server events queued by the handler, in emission order
    pub events: Vec<PendingEvent>,
}

/// The deterministic heart of one room
pub struct RoomCore {
    id: RoomId,
    definition: RoomDefinition,
    services: Arc<ServiceRegistry>,
    tree: StateTree,
    engine: SyncEngine,
    viewers: IndexMap<SessionId, Viewer>,
    phase: RoomPhase,
    tick: u64,
    outbox: Vec<PendingEvent>,
    sync_requested: bool,
}

impl RoomCore {
    /// Create an uninitialized core with a fresh tree
    #[must_use]
    pub fn new(
        id: RoomId,
        definition: RoomDefinition,
        services: Arc<ServiceRegistry>,
        config: &RuntimeConfig,
    ) -> Self {
        let tree = StateTree::new(definition.schema().clone());
        Self::with_tree(id, definition, services, config, tree)
    }

    /// Create an uninitialized core over a persisted snapshot
    ///
    /// # Errors
    ///
    /// Returns `SchemaViolation` when the snapshot root is not an object.
    pub fn from_snapshot(
        id: RoomId,
        definition: RoomDefinition,
        services: Arc<ServiceRegistry>,
        config: &RuntimeConfig,
        snapshot: Value,
        version: SchemaVersion,
    ) -> RuntimeResult<Self> {
        let tree = StateTree::from_snapshot(definition.schema().clone(), snapshot, version)?;
        Ok(Self::with_tree(id, definition, services, config, tree))
    }

    fn with_tree(
        id: RoomId,
        definition: RoomDefinition,
        services: Arc<ServiceRegistry>,
        config: &RuntimeConfig,
        tree: StateTree,
    ) -> Self {
        Self {
            id,
            definition,
            services,
            tree,
            engine: SyncEngine::new(SyncConfig {
                dirty_tracking: config.dirty_tracking,
            }),
            viewers: IndexMap::new(),
            phase: RoomPhase::Uninitialized,
            tick: 0,
            outbox: Vec::new(),
            sync_requested: false,
        }
    }

    /// The room id
    #[must_use]
    pub fn id(&self) -> RoomId {
        self.id
    }

    /// The current phase
    #[must_use]
    pub fn phase(&self) -> RoomPhase {
        self.phase
    }

    /// The open tick number
    #[must_use]
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Number of joined viewers
    #[must_use]
    pub fn viewer_count(&self) -> usize {
        self.viewers.len()
    }

    /// Look up a joined viewer
    #[must_use]
    pub fn viewer(&self, session: SessionId) -> Option<&Viewer> {
        self.viewers.get(&session)
    }

    /// The room definition driving this core
    #[must_use]
    pub fn definition(&self) -> &RoomDefinition {
        &self.definition
    }

    /// Hash of the full authoritative tree
    #[must_use]
    pub fn state_hash(&self) -> StateHash {
        self.tree.state_hash()
    }

    /// Clone the full tree as an immutable value
    #[must_use]
    pub fn snapshot_value(&self) -> Value {
        self.tree.snapshot_value()
    }

    /// Run `OnInitialize` and start accepting commands
    ///
    /// # Errors
    ///
    /// `WrongPhase` if already initialized; `Lifecycle` if the hook fails,
    /// which leaves the room unusable.
    pub fn initialize(&mut self) -> RuntimeResult<SyncOutput> {
        if self.phase != RoomPhase::Uninitialized {
            return Err(RuntimeError::WrongPhase(self.phase));
        }
        if let Some(hook) = self.definition.on_initialize().cloned() {
            self.handler_scope(|ctx| hook(ctx))
                .map_err(|message| RuntimeError::Lifecycle {
                    hook: "OnInitialize",
                    message,
                })?;
        }
        self.phase = RoomPhase::Running;
        info!(room = %self.id, "room initialized");
        Ok(self.finish_command())
    }

    /// Evaluate the join gate without mutating anything
    ///
    /// # Errors
    ///
    /// `JoinDenied` with the gate's reason, or for a duplicate session;
    /// `WrongPhase` outside `Running`.
    pub fn check_join(&self, viewer: &Viewer, payload: &Value) -> RuntimeResult<()> {
        if !self.phase.is_running() {
            return Err(RuntimeError::WrongPhase(self.phase));
        }
        if self.viewers.contains_key(&viewer.session) {
            return Err(RuntimeError::JoinDenied {
                reason: "session already joined".to_string(),
            });
        }
        if let Some(gate) = self.definition.can_join() {
            gate(viewer, payload, &self.tree)
                .map_err(|reason| RuntimeError::JoinDenied { reason })?;
        }
        Ok(())
    }

    /// Apply an accepted join: gate, `OnJoin`, register, sync
    ///
    /// The closing sync cycle gives the new viewer its firstSync and every
    /// other viewer any diff `OnJoin` caused.
    ///
    /// # Errors
    ///
    /// `JoinDenied` / `WrongPhase` per [`RoomCore::check_join`];
    /// `Lifecycle` when `OnJoin` fails, in which case the viewer is not
    /// registered.
    pub fn apply_join(
        &mut self,
        viewer: Viewer,
        payload: &Value,
        outputs: &ResolverOutputs,
    ) -> RuntimeResult<SyncOutput> {
        self.check_join(&viewer, payload)?;
        if let Some(handler) = self.definition.on_join().cloned() {
            self.handler_scope(|ctx| handler(ctx, &viewer, payload, outputs))
                .map_err(|message| RuntimeError::Lifecycle {
                    hook: "OnJoin",
                    message,
                })?;
        }
        info!(room = %self.id, viewer = %viewer, "viewer joined");
        self.viewers.insert(viewer.session, viewer.clone());
        self.engine.add_viewer(viewer);
        Ok(self.finish_command())
    }

    /// Apply a leave: `OnLeave`, drop the viewer and its baseline, sync
    ///
    /// An `OnLeave` error is logged and dropped - the viewer leaves anyway.
    ///
    /// # Errors
    ///
    /// `UnknownSession` when the session is not joined; `WrongPhase`
    /// outside `Running`.
    pub fn apply_leave(&mut self, session: SessionId) -> RuntimeResult<SyncOutput> {
        if !self.phase.is_running() {
            return Err(RuntimeError::WrongPhase(self.phase));
        }
        let viewer = self
            .viewers
            .shift_remove(&session)
            .ok_or(RuntimeError::UnknownSession(session))?;
        if let Some(handler) = self.definition.on_leave().cloned() {
            if let Err(message) = self.handler_scope(|ctx| handler(ctx, &viewer)) {
                warn!(room = %self.id, viewer = %viewer, %message, "OnLeave error dropped");
            }
        }
        self.engine.remove_viewer(session);
        info!(room = %self.id, viewer = %viewer, "viewer left");
        Ok(self.finish_command())
    }

    /// Apply an action request
    ///
    /// An error response aborts only this request; the closing sync cycle
    /// still flushes whatever the handler mutated before failing.
    pub fn apply_action(
        &mut self,
        session: SessionId,
        name: &str,
        payload: &Value,
        outputs: &ResolverOutputs,
    ) -> (RuntimeResult<Value>, SyncOutput) {
        let result = self.run_action(session, name, payload, outputs);
        if let Err(err) = &result {
            debug!(room = %self.id, action = name, %err, "action failed");
        }
        (result, self.finish_command())
    }

    fn run_action(
        &mut self,
        session: SessionId,
        name: &str,
        payload: &Value,
        outputs: &ResolverOutputs,
    ) -> RuntimeResult<Value> {
        if !self.phase.is_running() {
            return Err(RuntimeError::WrongPhase(self.phase));
        }
        let viewer = self
            .viewers
            .get(&session)
            .cloned()
            .ok_or(RuntimeError::UnknownSession(session))?;
        let handler = self
            .definition
            .action(name)
            .ok_or_else(|| RuntimeError::UnknownAction(name.to_string()))?
            .handler
            .clone();
        self.handler_scope(|ctx| handler(ctx, &viewer, payload, outputs))
            .map_err(|message| RuntimeError::Action {
                name: name.to_string(),
                message,
            })
    }

    /// Apply a client event; errors are logged and dropped
    pub fn apply_event(
        &mut self,
        session: SessionId,
        name: &str,
        payload: &Value,
        outputs: &ResolverOutputs,
    ) -> SyncOutput {
        if let Err(err) = self.run_event(session, name, payload, outputs) {
            warn!(room = %self.id, event = name, %err, "event dropped");
        }
        self.finish_command()
    }

    fn run_event(
        &mut self,
        session: SessionId,
        name: &str,
        payload: &Value,
        outputs: &ResolverOutputs,
    ) -> RuntimeResult<()> {
        if !self.phase.is_running() {
            return Err(RuntimeError::WrongPhase(self.phase));
        }
        let viewer = self
            .viewers
            .get(&session)
            .cloned()
            .ok_or(RuntimeError::UnknownSession(session))?;
        let handler = self
            .definition
            .event(name)
            .ok_or_else(|| RuntimeError::UnknownEvent(name.to_string()))?
            .handler
            .clone();
        self.handler_scope(|ctx| handler(ctx, &viewer, payload, outputs))
            .map_err(|message| RuntimeError::Event {
                name: name.to_string(),
                message,
            })
    }

    /// Apply one tick: run the tick handler, sync, advance the tick counter
    ///
    /// The only time-driven mutation path. A tick handler error is logged
    /// and dropped.
    pub fn apply_tick(&mut self) -> SyncOutput {
        if self.phase.is_running() {
            if let Some(handler) = self.definition.tick().cloned() {
                if let Err(message) = self.handler_scope(|ctx| handler(ctx)) {
                    warn!(room = %self.id, tick = self.tick, %message, "tick handler error dropped");
                }
            }
        }
        let output = self.finish_command();
        self.tick += 1;
        output
    }

    /// Run `OnFinalize` and stop accepting commands; returns the snapshot
    /// to persist
    ///
    /// A hook error is logged and dropped - finalization proceeds.
    ///
    /// # Errors
    ///
    /// `WrongPhase` outside `Running`.
    pub fn finalize(&mut self) -> RuntimeResult<Value> {
        if !self.phase.is_running() {
            return Err(RuntimeError::WrongPhase(self.phase));
        }
        if let Some(hook) = self.definition.on_finalize().cloned() {
            if let Err(message) = self.handler_scope(|ctx| hook(ctx)) {
                warn!(room = %self.id, %message, "OnFinalize error dropped");
            }
        }
        self.phase = RoomPhase::Finalizing;
        info!(room = %self.id, "room finalizing");
        Ok(self.tree.snapshot_value())
    }

    /// Run `AfterFinalize` (post-persistence) and destroy the room
    ///
    /// # Errors
    ///
    /// `WrongPhase` outside `Finalizing`.
    pub fn after_finalize(&mut self) -> RuntimeResult<()> {
        if self.phase != RoomPhase::Finalizing {
            return Err(RuntimeError::WrongPhase(self.phase));
        }
        if let Some(hook) = self.definition.after_finalize().cloned() {
            if let Err(message) = self.handler_scope(|ctx| hook(ctx)) {
                warn!(room = %self.id, %message, "AfterFinalize error dropped");
            }
        }
        self.phase = RoomPhase::Destroyed;
        info!(room = %self.id, "room destroyed");
        Ok(())
    }

    /// Run `OnShutdown`: the process is stopping, whatever the phase
    pub fn shutdown(&mut self) {
        if let Some(hook) = self.definition.on_shutdown().cloned() {
            if let Err(message) = self.handler_scope(|ctx| hook(ctx)) {
                warn!(room = %self.id, %message, "OnShutdown error dropped");
            }
        }
    }

    /// Run a handler against a fresh context
    fn handler_scope<R>(
        &mut self,
        f: impl FnOnce(&mut RoomContext<'_>) -> Result<R, String>,
    ) -> Result<R, String> {
        let mut ctx = RoomContext::new(
            &mut self.tree,
            &self.services,
            self.tick,
            &mut self.outbox,
            &mut self.sync_requested,
        );
        f(&mut ctx)
    }

    /// End-of-command flush: honor a requested full sync, run the cycle,
    /// drain the outbox
    fn finish_command(&mut self) -> SyncOutput {
        if self.sync_requested {
            self.tree.mark_all_dirty();
            self.sync_requested = false;
        }
        let updates = self.engine.sync_cycle(&mut self.tree);
        debug!(room = %self.id, tick = self.tick, viewers = updates.len(), "sync cycle");
        SyncOutput {
            updates,
            events: std::mem::take(&mut self.outbox),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::{ClientId, ConcretePath, FieldId, Patch, PatchOp};
    use meridian_schema::{FieldDecl, Schema, SyncPolicy};
    use serde_json::json;

    const ROUND: u16 = 0;
    const HANDS: u16 = 1;
    const DECK: u16 = 2;

    fn demo_schema() -> Arc<Schema> {
        Arc::new(
            Schema::builder()
                .field(
                    FieldDecl::new("round", SyncPolicy::Broadcast)
                        .unwrap()
                        .with_default(json!(0)),
                )
                .field(FieldDecl::new("hands.*", SyncPolicy::PerPlayerSlice).unwrap())
                .field(
                    FieldDecl::new("deck", SyncPolicy::ServerOnly)
                        .unwrap()
                        .with_default(json!([])),
                )
                .build()
                .unwrap(),
        )
    }

    fn demo_definition() -> RoomDefinition {
        RoomDefinition::builder(demo_schema())
            .on_initialize(|ctx| {
                ctx.set("deck", json!(["c3", "c2", "c1"]))
                    .map_err(|e| e.to_string())
            })
            .can_join(|_, payload, _| {
                if payload.get("banned").is_some() {
                    Err("banned".to_string())
                } else {
                    Ok(())
                }
            })
            .on_join(|ctx, viewer, _, _| {
                ctx.set(&format!("hands.{}", viewer.player), json!([]))
                    .map_err(|e| e.to_string())
            })
            .on_leave(|ctx, viewer| {
                ctx.delete(&format!("hands.{}", viewer.player))
                    .map(|_| ())
                    .map_err(|e| e.to_string())
            })
            .action("Draw", Vec::new(), |ctx, viewer, _, _| {
                let mut deck: Vec<String> =
                    serde_json::from_value(ctx.get("deck").cloned().unwrap_or(json!([])))
                        .map_err(|e| e.to_string())?;
                let card = deck.pop().ok_or("deck empty")?;
                let hand_path = format!("hands.{}", viewer.player);
                let mut hand: Vec<String> =
                    serde_json::from_value(ctx.get(&hand_path).cloned().unwrap_or(json!([])))
                        .map_err(|e| e.to_string())?;
                hand.push(card.clone());
                ctx.set("deck", json!(deck)).map_err(|e| e.to_string())?;
                ctx.set(&hand_path, json!(hand)).map_err(|e| e.to_string())?;
                Ok(json!({ "card": card }))
            })
            .event("Emote", Vec::new(), |ctx, viewer, payload, _| {
                ctx.emit_event(
                    "Emoted",
                    json!({ "player": viewer.player.as_str(), "emote": payload }),
                );
                Ok(())
            })
            .on_tick(|ctx| {
                let round = ctx.get("round").and_then(Value::as_u64).unwrap_or(0);
                ctx.set("round", json!(round + 1)).map_err(|e| e.to_string())
            })
            .build()
    }

    fn viewer(name: &str) -> Viewer {
        Viewer::new(name.into(), ClientId::new(), SessionId::new())
    }

    fn running_core() -> RoomCore {
        let mut core = RoomCore::new(
            RoomId::new(),
            demo_definition(),
            Arc::new(ServiceRegistry::new()),
            &RuntimeConfig::default(),
        );
        core.initialize().unwrap();
        core
    }

    fn path(field: u16, keys: &[&str]) -> ConcretePath {
        ConcretePath::new(
            FieldId::from_raw(field),
            keys.iter().map(|k| (*k).to_string()).collect(),
        )
    }

    fn patch_paths(patches: &[Patch]) -> Vec<ConcretePath> {
        patches.iter().map(|p| p.path.clone()).collect()
    }

    #[test]
    fn test_first_sync_excludes_server_only() {
        let mut core = running_core();
        let alice = viewer("A");
        let out = core.apply_join(alice.clone(), &json!({}), &ResolverOutputs::new()).unwrap();

        let update = &out.updates[&alice.session];
        let StateUpdate::FirstSync(patches) = update else {
            panic!("expected firstSync, got {update:?}");
        };
        let paths = patch_paths(patches);
        assert!(paths.contains(&path(ROUND, &[])));
        assert!(paths.contains(&path(HANDS, &["A"])));
        assert!(!paths.iter().any(|p| p.field == FieldId::from_raw(DECK)));
    }

    #[test]
    fn test_join_denied_leaves_no_trace() {
        let mut core = running_core();
        let err = core
            .apply_join(viewer("A"), &json!({"banned": true}), &ResolverOutputs::new())
            .unwrap_err();
        assert!(matches!(err, RuntimeError::JoinDenied { .. }));
        assert_eq!(core.viewer_count(), 0);
    }

    #[test]
    fn test_duplicate_session_denied() {
        let mut core = running_core();
        let alice = viewer("A");
        core.apply_join(alice.clone(), &json!({}), &ResolverOutputs::new())
            .unwrap();
        let err = core
            .apply_join(alice, &json!({}), &ResolverOutputs::new())
            .unwrap_err();
        assert!(matches!(err, RuntimeError::JoinDenied { .. }));
    }

    #[test]
    fn test_action_diff_isolated_per_viewer() {
        let mut core = running_core();
        let alice = viewer("A");
        let bob = viewer("B");
        core.apply_join(alice.clone(), &json!({}), &ResolverOutputs::new())
            .unwrap();
        core.apply_join(bob.clone(), &json!({}), &ResolverOutputs::new())
            .unwrap();

        let (result, out) =
            core.apply_action(alice.session, "Draw", &json!({}), &ResolverOutputs::new());
        assert_eq!(result.unwrap(), json!({"card": "c1"}));

        // Alice sees her hand change; the deck (ServerOnly) reaches no one.
        let StateUpdate::Diff(patches) = &out.updates[&alice.session] else {
            panic!("expected a diff for the actor");
        };
        assert_eq!(patch_paths(patches), vec![path(HANDS, &["A"])]);
        assert_eq!(patches[0].op, PatchOp::Set(json!(["c1"])));

        assert!(out.updates[&bob.session].is_no_change());
    }

    #[test]
    fn test_tick_broadcasts_to_everyone() {
        let mut core = running_core();
        let alice = viewer("A");
        let bob = viewer("B");
        core.apply_join(alice.clone(), &json!({}), &ResolverOutputs::new())
            .unwrap();
        core.apply_join(bob.clone(), &json!({}), &ResolverOutputs::new())
            .unwrap();

        assert_eq!(core.current_tick(), 0);
        let out = core.apply_tick();
        assert_eq!(core.current_tick(), 1);

        for session in [alice.session, bob.session] {
            let StateUpdate::Diff(patches) = &out.updates[&session] else {
                panic!("expected a round diff");
            };
            assert_eq!(patch_paths(patches), vec![path(ROUND, &[])]);
            assert_eq!(patches[0].op, PatchOp::Set(json!(1)));
        }
    }

    #[test]
    fn test_idempotent_cycle_after_no_mutation() {
        let mut core = running_core();
        let alice = viewer("A");
        core.apply_join(alice.clone(), &json!({}), &ResolverOutputs::new())
            .unwrap();

        // an event that mutates nothing
        let out = core.apply_event(alice.session, "Emote", &json!("wave"), &ResolverOutputs::new());
        assert!(out.updates[&alice.session].is_no_change());
        assert_eq!(out.events.len(), 1);
        assert_eq!(out.events[0].name, "Emoted");
        assert!(out.events[0].target.is_none());
    }

    #[test]
    fn test_action_error_aborts_only_that_request() {
        let mut core = running_core();
        let alice = viewer("A");
        core.apply_join(alice.clone(), &json!({}), &ResolverOutputs::new())
            .unwrap();

        for _ in 0..3 {
            let (result, _) =
                core.apply_action(alice.session, "Draw", &json!({}), &ResolverOutputs::new());
            result.unwrap();
        }
        let (result, _) =
            core.apply_action(alice.session, "Draw", &json!({}), &ResolverOutputs::new());
        assert!(matches!(result.unwrap_err(), RuntimeError::Action { .. }));

        // room keeps running
        assert!(core.phase().is_running());
        let (result, _) =
            core.apply_action(alice.session, "Nope", &json!({}), &ResolverOutputs::new());
        assert!(matches!(result.unwrap_err(), RuntimeError::UnknownAction(_)));
    }

    #[test]
    fn test_unknown_event_dropped_room_continues() {
        let mut core = running_core();
        let alice = viewer("A");
        core.apply_join(alice.clone(), &json!({}), &ResolverOutputs::new())
            .unwrap();
        let out = core.apply_event(alice.session, "Nope", &json!({}), &ResolverOutputs::new());
        assert!(out.updates[&alice.session].is_no_change());
        assert!(core.phase().is_running());
    }

    #[test]
    fn test_leave_drops_viewer_and_baseline() {
        let mut core = running_core();
        let alice = viewer("A");
        let bob = viewer("B");
        core.apply_join(alice.clone(), &json!({}), &ResolverOutputs::new())
            .unwrap();
        core.apply_join(bob.clone(), &json!({}), &ResolverOutputs::new())
            .unwrap();

        let out = core.apply_leave(bob.session).unwrap();
        assert!(!out.updates.contains_key(&bob.session));
        // Bob's hand was never in Alice's projection, so nothing changes
        assert!(out.updates[&alice.session].is_no_change());
        assert_eq!(core.viewer_count(), 1);
    }

    #[test]
    fn test_rejoin_gets_fresh_first_sync() {
        let mut core = running_core();
        let alice = viewer("A");
        core.apply_join(alice.clone(), &json!({}), &ResolverOutputs::new())
            .unwrap();
        core.apply_leave(alice.session).unwrap();

        let alice2 = viewer("A");
        let out = core
            .apply_join(alice2.clone(), &json!({}), &ResolverOutputs::new())
            .unwrap();
        assert!(matches!(
            out.updates[&alice2.session],
            StateUpdate::FirstSync(_)
        ));
    }

    #[test]
    fn test_commands_rejected_outside_running() {
        let mut core = RoomCore::new(
            RoomId::new(),
            demo_definition(),
            Arc::new(ServiceRegistry::new()),
            &RuntimeConfig::default(),
        );
        let alice = viewer("A");
        let (result, _) =
            core.apply_action(alice.session, "Draw", &json!({}), &ResolverOutputs::new());
        assert!(matches!(result.unwrap_err(), RuntimeError::WrongPhase(_)));

        core.initialize().unwrap();
        core.finalize().unwrap();
        let err = core
            .apply_join(alice, &json!({}), &ResolverOutputs::new())
            .unwrap_err();
        assert!(matches!(err, RuntimeError::WrongPhase(_)));
    }

    #[test]
    fn test_finalize_flow() {
        let mut core = running_core();
        let snapshot = core.finalize().unwrap();
        assert_eq!(snapshot["deck"], json!(["c3", "c2", "c1"]));
        assert_eq!(core.phase(), RoomPhase::Finalizing);
        core.after_finalize().unwrap();
        assert_eq!(core.phase(), RoomPhase::Destroyed);
    }

    #[test]
    fn test_request_sync_now_is_idempotent() {
        let definition = RoomDefinition::builder(demo_schema())
            .action("Nudge", Vec::new(), |ctx, _, _, _| {
                ctx.request_sync_now();
                Ok(json!(null))
            })
            .build();
        let mut core = RoomCore::new(
            RoomId::new(),
            definition,
            Arc::new(ServiceRegistry::new()),
            &RuntimeConfig::default(),
        );
        core.initialize().unwrap();
        let alice = viewer("A");
        core.apply_join(alice.clone(), &json!({}), &ResolverOutputs::new())
            .unwrap();

        // a forced full sync with unchanged values emits nothing
        let (result, out) =
            core.apply_action(alice.session, "Nudge", &json!({}), &ResolverOutputs::new());
        result.unwrap();
        assert!(out.updates[&alice.session].is_no_change());
    }

    #[test]
    fn test_state_hash_tracks_mutation() {
        let mut core = running_core();
        let before = core.state_hash();
        core.apply_tick();
        assert_ne!(core.state_hash(), before);
    }

    #[test]
    fn test_snapshot_restore_default_initializes_new_fields() {
        let schema = Arc::new(
            Schema::builder()
                .field(
                    FieldDecl::new("round", SyncPolicy::Broadcast)
                        .unwrap()
                        .with_default(json!(0)),
                )
                .field(
                    FieldDecl::new("phase", SyncPolicy::Broadcast)
                        .unwrap()
                        .with_since(2)
                        .with_default(json!("lobby")),
                )
                .build()
                .unwrap(),
        );
        let definition = RoomDefinition::builder(schema).build();
        let core = RoomCore::from_snapshot(
            RoomId::new(),
            definition,
            Arc::new(ServiceRegistry::new()),
            &RuntimeConfig::default(),
            json!({"round": 5}),
            SchemaVersion::from_raw(1),
        )
        .unwrap();
        assert_eq!(core.snapshot_value(), json!({"round": 5, "phase": "lobby"}));
    }
}
