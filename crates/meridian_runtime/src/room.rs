//! The live room executor.
//!
//! One tokio task per room owns a [`RoomCore`] and a command channel.
//! Commands are processed strictly in arrival order; the tick interval is
//! multiplexed into the same loop, so nothing ever touches the tree
//! concurrently. Rooms are fully independent - no shared state, no
//! cross-room ordering.

use bytes::Bytes;
use indexmap::IndexMap;
use meridian_core::{RoomId, SessionId};
use meridian_journal::{FrameLog, RecordedInput, RecordedServerEvent, Recorder};
use meridian_schema::Viewer;
use meridian_wire::{Codec, Direction, Encoding, SlotTable, TransportMessage};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::config::RuntimeConfig;
use crate::context::PendingEvent;
use crate::definition::RoomDefinition;
use crate::dispatch::{RoomCore, SyncOutput};
use crate::error::{RuntimeError, RuntimeResult};
use crate::persist::PersistenceSink;
use crate::resolver::{run_resolvers, Resolver, ResolverOutputs};
use crate::services::ServiceRegistry;
use crate::transport::Transport;

const COMMAND_BUFFER: usize = 256;

/// A command delivered to a room task
pub enum RoomCommand {
    /// Join a viewer, negotiating its wire encoding
    Join {
        /// The joining viewer
        viewer: Viewer,
        /// Application join payload
        payload: Value,
        /// Negotiated encoding, `None` for the configured default
        encoding: Option<Encoding>,
        /// Accept/deny answer
        reply: oneshot::Sender<RuntimeResult<()>>,
    },
    /// Remove a session
    Leave {
        /// The departing session
        session: SessionId,
    },
    /// Run an action request
    Action {
        /// Requesting session
        session: SessionId,
        /// Client request id, echoed in the wire response
        request: u32,
        /// Declared action name
        name: String,
        /// Action payload
        payload: Value,
        /// In-process answer, in addition to the wire response
        reply: Option<oneshot::Sender<RuntimeResult<Value>>>,
    },
    /// Dispatch a client event
    Event {
        /// Originating session
        session: SessionId,
        /// Declared event name
        name: String,
        /// Event payload
        payload: Value,
    },
    /// Finalize and destroy the room
    Destroy,
}

/// Handle to a running room task
pub struct Room {
    id: RoomId,
    commands: mpsc::Sender<RoomCommand>,
    task: tokio::task::JoinHandle<Option<FrameLog>>,
}

impl Room {
    /// Spawn a room task
    #[must_use]
    pub fn spawn(
        id: RoomId,
        definition: RoomDefinition,
        config: RuntimeConfig,
        services: Arc<ServiceRegistry>,
        transport: Arc<dyn Transport>,
        persistence: Option<Arc<dyn PersistenceSink>>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let core = RoomCore::new(id, definition, services.clone(), &config);
        let recorder = config.record.map(Recorder::new);
        let task = RoomTask {
            core,
            config,
            services,
            transport,
            persistence,
            recorder,
            sessions: IndexMap::new(),
            last_activity: Instant::now(),
        };
        let handle = tokio::spawn(task.run(rx));
        Self {
            id,
            commands: tx,
            task: handle,
        }
    }

    /// The room id
    #[must_use]
    pub fn id(&self) -> RoomId {
        self.id
    }

    /// Join a viewer with the configured default encoding
    ///
    /// # Errors
    ///
    /// `JoinDenied`, `Resolver`, or `ChannelClosed`.
    pub async fn join(&self, viewer: Viewer, payload: Value) -> RuntimeResult<()> {
        self.join_with_encoding(viewer, payload, None).await
    }

    /// Join a viewer with a negotiated encoding
    ///
    /// # Errors
    ///
    /// Same as [`Room::join`].
    pub async fn join_with_encoding(
        &self,
        viewer: Viewer,
        payload: Value,
        encoding: Option<Encoding>,
    ) -> RuntimeResult<()> {
        let (reply, answer) = oneshot::channel();
        self.send(RoomCommand::Join {
            viewer,
            payload,
            encoding,
            reply,
        })
        .await?;
        answer.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Run an action and await its typed response
    ///
    /// # Errors
    ///
    /// The handler's error, `UnknownAction`, `Resolver`, or
    /// `ChannelClosed`.
    pub async fn action(
        &self,
        session: SessionId,
        request: u32,
        name: impl Into<String>,
        payload: Value,
    ) -> RuntimeResult<Value> {
        let (reply, answer) = oneshot::channel();
        self.send(RoomCommand::Action {
            session,
            request,
            name: name.into(),
            payload,
            reply: Some(reply),
        })
        .await?;
        answer.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Dispatch a client event, fire-and-forget
    ///
    /// # Errors
    ///
    /// `ChannelClosed` only; handler errors are logged and dropped.
    pub async fn event(
        &self,
        session: SessionId,
        name: impl Into<String>,
        payload: Value,
    ) -> RuntimeResult<()> {
        self.send(RoomCommand::Event {
            session,
            name: name.into(),
            payload,
        })
        .await
    }

    /// Remove a session
    ///
    /// # Errors
    ///
    /// `ChannelClosed` only.
    pub async fn leave(&self, session: SessionId) -> RuntimeResult<()> {
        self.send(RoomCommand::Leave { session }).await
    }

    /// Destroy the room and collect its frame log, if recording was on
    pub async fn into_log(self) -> Option<FrameLog> {
        let _ = self.commands.send(RoomCommand::Destroy).await;
        self.task.await.ok().flatten()
    }

    async fn send(&self, command: RoomCommand) -> RuntimeResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| RuntimeError::ChannelClosed)
    }
}

struct SessionLink {
    codec: Codec,
    slots: SlotTable,
}

impl SessionLink {
    fn new(encoding: Encoding) -> Self {
        Self {
            codec: Codec::new(encoding),
            slots: SlotTable::new(),
        }
    }
}

struct RoomTask {
    core: RoomCore,
    config: RuntimeConfig,
    services: Arc<ServiceRegistry>,
    transport: Arc<dyn Transport>,
    persistence: Option<Arc<dyn PersistenceSink>>,
    recorder: Option<Recorder>,
    sessions: IndexMap<SessionId, SessionLink>,
    last_activity: Instant,
}

impl RoomTask {
    async fn run(mut self, mut commands: mpsc::Receiver<RoomCommand>) -> Option<FrameLog> {
        match self.core.initialize() {
            Ok(output) => {
                if let Some(recorder) = &mut self.recorder {
                    recorder.record_input(RecordedInput::Initialize);
                }
                self.dispatch_output(output);
            }
            Err(err) => {
                error!(room = %self.core.id(), %err, "initialization failed");
                return self.recorder.take().map(Recorder::finish);
            }
        }

        let start = Instant::now() + self.config.tick_interval;
        let mut ticks = tokio::time::interval_at(start, self.config.tick_interval);
        ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = commands.recv() => {
                    self.last_activity = Instant::now();
                    match command {
                        None | Some(RoomCommand::Destroy) => break,
                        Some(RoomCommand::Join { viewer, payload, encoding, reply }) => {
                            let result = self.handle_join(viewer, payload, encoding).await;
                            let _ = reply.send(result);
                        }
                        Some(RoomCommand::Leave { session }) => {
                            self.handle_leave(session);
                        }
                        Some(RoomCommand::Action { session, request, name, payload, reply }) => {
                            let result = self.handle_action(session, request, &name, &payload).await;
                            if let Some(reply) = reply {
                                let _ = reply.send(result);
                            }
                        }
                        Some(RoomCommand::Event { session, name, payload }) => {
                            self.handle_event(session, &name, &payload).await;
                        }
                    }
                }
                _ = ticks.tick() => {
                    let output = self.core.apply_tick();
                    self.dispatch_output(output);
                    if let Some(recorder) = &mut self.recorder {
                        let snapshot = recorder
                            .options()
                            .snapshots
                            .then(|| self.core.snapshot_value());
                        recorder.seal_frame(self.core.state_hash(), snapshot);
                    }
                    if let Some(timeout) = self.config.idle_timeout {
                        if self.core.viewer_count() == 0 && self.last_activity.elapsed() >= timeout {
                            info!(room = %self.core.id(), "idle timeout, destroying");
                            break;
                        }
                    }
                }
            }
        }

        self.finalize();
        self.recorder.take().map(Recorder::finish)
    }

    async fn handle_join(
        &mut self,
        viewer: Viewer,
        payload: Value,
        encoding: Option<Encoding>,
    ) -> RuntimeResult<()> {
        self.core.check_join(&viewer, &payload)?;
        let resolvers: Vec<Arc<dyn Resolver>> = self.core.definition().join_resolvers().to_vec();
        let outputs = run_resolvers(&resolvers, &self.services, &payload).await?;
        let output = self.core.apply_join(viewer.clone(), &payload, &outputs)?;
        if let Some(recorder) = &mut self.recorder {
            recorder.record_input(RecordedInput::Join {
                viewer: viewer.clone(),
                payload,
                resolver_outputs: outputs.to_recorded(),
            });
        }
        self.sessions.insert(
            viewer.session,
            SessionLink::new(encoding.unwrap_or(self.config.default_encoding)),
        );
        self.dispatch_output(output);
        Ok(())
    }

    fn handle_leave(&mut self, session: SessionId) {
        match self.core.apply_leave(session) {
            Ok(output) => {
                if let Some(recorder) = &mut self.recorder {
                    recorder.record_input(RecordedInput::Leave { session });
                }
                self.sessions.shift_remove(&session);
                self.dispatch_output(output);
            }
            Err(err) => warn!(room = %self.core.id(), %err, "leave dropped"),
        }
    }

    async fn handle_action(
        &mut self,
        session: SessionId,
        request: u32,
        name: &str,
        payload: &Value,
    ) -> RuntimeResult<Value> {
        let result = self.run_action(session, name, payload).await;
        let wire_result = match &result {
            Ok(value) => Ok(value.clone()),
            Err(err) => Err(err.to_string()),
        };
        self.send_message(
            session,
            &TransportMessage::ActionResponse {
                request,
                result: wire_result,
            },
        );
        result
    }

    async fn run_action(
        &mut self,
        session: SessionId,
        name: &str,
        payload: &Value,
    ) -> RuntimeResult<Value> {
        let resolvers: Vec<Arc<dyn Resolver>> = self
            .core
            .definition()
            .action(name)
            .ok_or_else(|| RuntimeError::UnknownAction(name.to_string()))?
            .resolvers
            .clone();
        let outputs = run_resolvers(&resolvers, &self.services, payload).await?;
        let (result, output) = self.core.apply_action(session, name, payload, &outputs);
        if let Some(recorder) = &mut self.recorder {
            recorder.record_input(RecordedInput::Action {
                session,
                name: name.to_string(),
                payload: payload.clone(),
                resolver_outputs: outputs.to_recorded(),
            });
        }
        self.dispatch_output(output);
        result
    }

    async fn handle_event(&mut self, session: SessionId, name: &str, payload: &Value) {
        let Some(def) = self.core.definition().event(name) else {
            warn!(room = %self.core.id(), event = name, "unknown event dropped");
            return;
        };
        let resolvers: Vec<Arc<dyn Resolver>> = def.resolvers.clone();
        let outputs = match run_resolvers(&resolvers, &self.services, payload).await {
            Ok(outputs) => outputs,
            Err(err) => {
                warn!(room = %self.core.id(), event = name, %err, "event resolvers failed, dropped");
                return;
            }
        };
        let output = self.core.apply_event(session, name, payload, &outputs);
        if let Some(recorder) = &mut self.recorder {
            recorder.record_input(RecordedInput::ClientEvent {
                session,
                name: name.to_string(),
                payload: payload.clone(),
                resolver_outputs: outputs.to_recorded(),
            });
        }
        self.dispatch_output(output);
    }

    /// Push one command's updates and events out through the transport,
    /// recording server events along the way
    fn dispatch_output(&mut self, output: SyncOutput) {
        let schema = self.core.definition().schema().clone();
        for (session, update) in &output.updates {
            if update.is_no_change() {
                continue;
            }
            let Some(link) = self.sessions.get_mut(session) else {
                continue;
            };
            match link.codec.encode_update(&schema, &mut link.slots, update) {
                Ok(frame) => self.transport.send(*session, frame),
                Err(err) => {
                    error!(room = %self.core.id(), session = %session, %err, "update encode failed")
                }
            }
        }
        for event in output.events {
            if let Some(recorder) = &mut self.recorder {
                recorder.record_server_event(RecordedServerEvent {
                    target: event.target,
                    name: event.name.clone(),
                    payload: event.payload.clone(),
                });
            }
            self.send_event(&event);
        }
    }

    fn send_event(&self, event: &PendingEvent) {
        let message = TransportMessage::Event {
            direction: Direction::FromServer,
            name: event.name.clone(),
            payload: event.payload.clone(),
        };
        match event.target {
            Some(session) => self.send_message(session, &message),
            None => {
                for session in self.sessions.keys() {
                    self.send_message(*session, &message);
                }
            }
        }
    }

    fn send_message(&self, session: SessionId, message: &TransportMessage) {
        let Some(link) = self.sessions.get(&session) else {
            return;
        };
        match link.codec.encode_message(message) {
            Ok(frame) => self.transport.send(session, frame),
            Err(err) => {
                error!(room = %self.core.id(), session = %session, %err, "message encode failed")
            }
        }
    }

    fn finalize(&mut self) {
        match self.core.finalize() {
            Ok(snapshot) => {
                if let Some(sink) = &self.persistence {
                    let version = self.core.definition().schema().version();
                    if let Err(message) = sink.save(self.core.id(), &snapshot, version) {
                        warn!(room = %self.core.id(), %message, "persistence failed");
                    }
                }
                if let Err(err) = self.core.after_finalize() {
                    warn!(room = %self.core.id(), %err, "after-finalize failed");
                }
            }
            Err(err) => warn!(room = %self.core.id(), %err, "finalize skipped"),
        }
        self.core.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::{ClientId, PatchOp, PlayerId, StateUpdate};
    use meridian_schema::{FieldDecl, Schema, SyncPolicy};
    use meridian_wire::SlotReader;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct VecTransport {
        frames: Mutex<Vec<(SessionId, Bytes)>>,
    }

    impl Transport for VecTransport {
        fn send(&self, session: SessionId, frame: Bytes) {
            self.frames.lock().unwrap().push((session, frame));
        }

        fn broadcast(&self, _frame: Bytes) {}
    }

    impl VecTransport {
        fn frames_for(&self, session: SessionId) -> Vec<Bytes> {
            self.frames
                .lock()
                .unwrap()
                .iter()
                .filter(|(s, _)| *s == session)
                .map(|(_, f)| f.clone())
                .collect()
        }
    }

    fn demo_schema() -> Arc<Schema> {
        Arc::new(
            Schema::builder()
                .field(
                    FieldDecl::new("round", SyncPolicy::Broadcast)
                        .unwrap()
                        .with_default(json!(0)),
                )
                .field(FieldDecl::new("hands.*", SyncPolicy::PerPlayerSlice).unwrap())
                .build()
                .unwrap(),
        )
    }

    fn demo_definition() -> RoomDefinition {
        RoomDefinition::builder(demo_schema())
            .on_join(|ctx, viewer, _, _| {
                ctx.set(&format!("hands.{}", viewer.player), json!([]))
                    .map_err(|e| e.to_string())
            })
            .action("Draw", Vec::new(), |ctx, viewer, _, _| {
                let hand_path = format!("hands.{}", viewer.player);
                let mut hand: Vec<String> =
                    serde_json::from_value(ctx.get(&hand_path).cloned().unwrap_or(json!([])))
                        .map_err(|e| e.to_string())?;
                hand.push("c1".to_string());
                ctx.set(&hand_path, json!(hand)).map_err(|e| e.to_string())?;
                Ok(json!({"card": "c1"}))
            })
            .build()
    }

    fn viewer(name: &str) -> Viewer {
        Viewer::new(PlayerId::new(name), ClientId::new(), SessionId::new())
    }

    // tick interval long enough that flow tests never see a tick
    fn no_tick_config() -> RuntimeConfig {
        RuntimeConfig::default().with_tick_interval(Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn test_join_then_action_over_the_wire() {
        let transport = Arc::new(VecTransport::default());
        let room = Room::spawn(
            RoomId::new(),
            demo_definition(),
            no_tick_config(),
            Arc::new(ServiceRegistry::new()),
            transport.clone(),
            None,
        );

        let alice = viewer("A");
        room.join_with_encoding(alice.clone(), json!({}), Some(Encoding::Plain))
            .await
            .unwrap();
        let response = room.action(alice.session, 1, "Draw", json!({})).await.unwrap();
        assert_eq!(response, json!({"card": "c1"}));

        let frames = transport.frames_for(alice.session);
        assert_eq!(frames.len(), 3);

        let codec = Codec::new(Encoding::Plain);
        let schema = demo_schema();
        let mut reader = SlotReader::new();

        let first = codec.decode_update(&schema, &mut reader, &frames[0]).unwrap();
        assert!(matches!(first, StateUpdate::FirstSync(_)));

        let StateUpdate::Diff(patches) = codec
            .decode_update(&schema, &mut reader, &frames[1])
            .unwrap()
        else {
            panic!("expected a diff after the action");
        };
        assert_eq!(patches[0].op, PatchOp::Set(json!(["c1"])));

        let message = codec.decode_message(&frames[2]).unwrap();
        assert_eq!(
            message,
            TransportMessage::ActionResponse {
                request: 1,
                result: Ok(json!({"card": "c1"})),
            }
        );

        assert!(room.into_log().await.is_none());
    }

    #[tokio::test]
    async fn test_updates_are_per_session() {
        let transport = Arc::new(VecTransport::default());
        let room = Room::spawn(
            RoomId::new(),
            demo_definition(),
            no_tick_config(),
            Arc::new(ServiceRegistry::new()),
            transport.clone(),
            None,
        );

        let alice = viewer("A");
        let bob = viewer("B");
        room.join(alice.clone(), json!({})).await.unwrap();
        room.join(bob.clone(), json!({})).await.unwrap();
        let before_bob = transport.frames_for(bob.session).len();

        room.action(alice.session, 1, "Draw", json!({})).await.unwrap();

        // Bob's hand projection did not change; he got no new update frame
        assert_eq!(transport.frames_for(bob.session).len(), before_bob);
        room.into_log().await;
    }

    #[tokio::test]
    async fn test_join_denied_through_handle() {
        let definition = RoomDefinition::builder(demo_schema())
            .can_join(|_, _, _| Err("room full".to_string()))
            .build();
        let room = Room::spawn(
            RoomId::new(),
            definition,
            no_tick_config(),
            Arc::new(ServiceRegistry::new()),
            Arc::new(VecTransport::default()),
            None,
        );

        let err = room.join(viewer("A"), json!({})).await.unwrap_err();
        assert!(matches!(err, RuntimeError::JoinDenied { .. }));
        room.into_log().await;
    }

    #[tokio::test]
    async fn test_unsealed_inputs_survive_destroy() {
        let config = no_tick_config().with_recording(meridian_journal::RecordOptions::default());
        let room = Room::spawn(
            RoomId::new(),
            demo_definition(),
            config,
            Arc::new(ServiceRegistry::new()),
            Arc::new(VecTransport::default()),
            None,
        );

        let alice = viewer("A");
        room.join(alice.clone(), json!({})).await.unwrap();
        room.action(alice.session, 1, "Draw", json!({})).await.unwrap();

        let log = room.into_log().await.unwrap();
        assert_eq!(log.len(), 1);
        let frame = &log.frames()[0];
        assert_eq!(frame.tick, 0);
        assert!(matches!(frame.inputs[0], RecordedInput::Initialize));
        assert!(matches!(frame.inputs[1], RecordedInput::Join { .. }));
        assert!(matches!(frame.inputs[2], RecordedInput::Action { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_seal_recorded_frames() {
        let config = RuntimeConfig::default()
            .with_tick_interval(Duration::from_millis(100))
            .with_recording(meridian_journal::RecordOptions::default());
        let room = Room::spawn(
            RoomId::new(),
            demo_definition(),
            config,
            Arc::new(ServiceRegistry::new()),
            Arc::new(VecTransport::default()),
            None,
        );

        let alice = viewer("A");
        room.join(alice.clone(), json!({})).await.unwrap();

        tokio::time::advance(Duration::from_millis(150)).await;
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }

        let log = room.into_log().await.unwrap();
        assert!(!log.is_empty());
        let frame = &log.frames()[0];
        assert_eq!(frame.tick, 0);
        assert!(frame.state_hash.is_some());
        assert!(frame
            .inputs
            .iter()
            .any(|input| matches!(input, RecordedInput::Join { .. })));
    }
}
