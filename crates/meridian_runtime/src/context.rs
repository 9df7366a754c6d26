//! The handler-facing room context.
//!
//! Deliberately narrow: state access, event emission, and a sync trigger.
//! No clock and no RNG - nondeterministic data must arrive through resolver
//! outputs, or replay verification will catch the divergence.

use meridian_core::{CoreResult, SessionId};
use meridian_sync::StateTree;
use serde_json::Value;

use crate::services::ServiceRegistry;

/// A server event queued by a handler, drained at end of command
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEvent {
    /// Targeted session, `None` for a broadcast
    pub target: Option<SessionId>,
    /// Event name
    pub name: String,
    /// Event payload
    pub payload: Value,
}

/// Mutable room access handed to synchronous handlers
pub struct RoomContext<'a> {
    tree: &'a mut StateTree,
    services: &'a ServiceRegistry,
    tick: u64,
    outbox: &'a mut Vec<PendingEvent>,
    sync_requested: &'a mut bool,
}

impl<'a> RoomContext<'a> {
    pub(crate) fn new(
        tree: &'a mut StateTree,
        services: &'a ServiceRegistry,
        tick: u64,
        outbox: &'a mut Vec<PendingEvent>,
        sync_requested: &'a mut bool,
    ) -> Self {
        Self {
            tree,
            services,
            tick,
            outbox,
            sync_requested,
        }
    }

    /// Set a value at a concrete dotted path
    ///
    /// # Errors
    ///
    /// `UnknownField` for undeclared paths, `SchemaViolation` for bad
    /// navigation - returned to the handler, never terminal for the room.
    pub fn set(&mut self, path: &str, value: Value) -> CoreResult<()> {
        self.tree.set(path, value)
    }

    /// Delete the value at a concrete dotted path; returns whether one was
    /// present
    ///
    /// # Errors
    ///
    /// `UnknownField` for undeclared paths.
    pub fn delete(&mut self, path: &str) -> CoreResult<bool> {
        self.tree.delete(path)
    }

    /// Read the value at a concrete dotted path
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.tree.get(path)
    }

    /// Queue a broadcast server event
    pub fn emit_event(&mut self, name: impl Into<String>, payload: Value) {
        self.outbox.push(PendingEvent {
            target: None,
            name: name.into(),
            payload,
        });
    }

    /// Queue a server event for one session
    pub fn emit_event_to(&mut self, session: SessionId, name: impl Into<String>, payload: Value) {
        self.outbox.push(PendingEvent {
            target: Some(session),
            name: name.into(),
            payload,
        });
    }

    /// Force a full sync at the end of the current command or tick
    ///
    /// The flush is deterministic - it happens at the command boundary,
    /// never out of band.
    pub fn request_sync_now(&mut self) {
        *self.sync_requested = true;
    }

    /// The current tick number
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Read access to the room's services
    #[must_use]
    pub fn services(&self) -> &ServiceRegistry {
        self.services
    }
}
