//! Room definitions.
//!
//! A definition is the application's complete description of one room type:
//! the schema, lifecycle hooks, the join gate, and the named actions, events
//! and tick handler. Handlers are synchronous and receive resolver outputs
//! already materialized; the same definition drives both the live executor
//! and the reevaluation verifier.

use indexmap::IndexMap;
use meridian_schema::{Schema, Viewer};
use meridian_sync::StateTree;
use serde_json::Value;
use std::sync::Arc;

use crate::context::RoomContext;
use crate::resolver::{Resolver, ResolverOutputs};

/// Lifecycle hook: `OnInitialize`, `OnFinalize`, `AfterFinalize`,
/// `OnShutdown`
pub type LifecycleHook = Arc<dyn Fn(&mut RoomContext<'_>) -> Result<(), String> + Send + Sync>;

/// Join gate; an `Err` denies with a reason relayed to the client
pub type CanJoinFn = Arc<dyn Fn(&Viewer, &Value, &StateTree) -> Result<(), String> + Send + Sync>;

/// Handler for an accepted join
pub type JoinHandler = Arc<
    dyn Fn(&mut RoomContext<'_>, &Viewer, &Value, &ResolverOutputs) -> Result<(), String>
        + Send
        + Sync,
>;

/// Handler for a leaving viewer
pub type LeaveHandler =
    Arc<dyn Fn(&mut RoomContext<'_>, &Viewer) -> Result<(), String> + Send + Sync>;

/// Action handler; the `Ok` value is the typed response to the caller
pub type ActionHandler = Arc<
    dyn Fn(&mut RoomContext<'_>, &Viewer, &Value, &ResolverOutputs) -> Result<Value, String>
        + Send
        + Sync,
>;

/// Event handler; fire-and-forget, no response
pub type EventHandler = Arc<
    dyn Fn(&mut RoomContext<'_>, &Viewer, &Value, &ResolverOutputs) -> Result<(), String>
        + Send
        + Sync,
>;

/// Tick handler
pub type TickHandler = Arc<dyn Fn(&mut RoomContext<'_>) -> Result<(), String> + Send + Sync>;

/// One declared action: resolvers, then the handler
#[derive(Clone)]
pub struct ActionDef {
    /// Resolvers run concurrently before the handler
    pub resolvers: Vec<Arc<dyn Resolver>>,
    /// The synchronous handler
    pub handler: ActionHandler,
}

/// One declared client event
#[derive(Clone)]
pub struct EventDef {
    /// Resolvers run concurrently before the handler
    pub resolvers: Vec<Arc<dyn Resolver>>,
    /// The synchronous handler
    pub handler: EventHandler,
}

/// A complete room type definition
#[derive(Clone)]
pub struct RoomDefinition {
    schema: Arc<Schema>,
    can_join: Option<CanJoinFn>,
    join_resolvers: Vec<Arc<dyn Resolver>>,
    on_initialize: Option<LifecycleHook>,
    on_join: Option<JoinHandler>,
    on_leave: Option<LeaveHandler>,
    on_finalize: Option<LifecycleHook>,
    after_finalize: Option<LifecycleHook>,
    on_shutdown: Option<LifecycleHook>,
    actions: IndexMap<String, ActionDef>,
    events: IndexMap<String, EventDef>,
    tick: Option<TickHandler>,
}

impl RoomDefinition {
    /// Start building a definition over a schema
    #[must_use]
    pub fn builder(schema: Arc<Schema>) -> RoomDefinitionBuilder {
        RoomDefinitionBuilder {
            definition: RoomDefinition {
                schema,
                can_join: None,
                join_resolvers: Vec::new(),
                on_initialize: None,
                on_join: None,
                on_leave: None,
                on_finalize: None,
                after_finalize: None,
                on_shutdown: None,
                actions: IndexMap::new(),
                events: IndexMap::new(),
                tick: None,
            },
        }
    }

    /// The schema this room type is declared over
    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// The join gate, if declared
    #[must_use]
    pub fn can_join(&self) -> Option<&CanJoinFn> {
        self.can_join.as_ref()
    }

    /// Resolvers run for every join
    #[must_use]
    pub fn join_resolvers(&self) -> &[Arc<dyn Resolver>] {
        &self.join_resolvers
    }

    /// The `OnInitialize` hook
    #[must_use]
    pub fn on_initialize(&self) -> Option<&LifecycleHook> {
        self.on_initialize.as_ref()
    }

    /// The `OnJoin` handler
    #[must_use]
    pub fn on_join(&self) -> Option<&JoinHandler> {
        self.on_join.as_ref()
    }

    /// The `OnLeave` handler
    #[must_use]
    pub fn on_leave(&self) -> Option<&LeaveHandler> {
        self.on_leave.as_ref()
    }

    /// The `OnFinalize` hook
    #[must_use]
    pub fn on_finalize(&self) -> Option<&LifecycleHook> {
        self.on_finalize.as_ref()
    }

    /// The `AfterFinalize` hook
    #[must_use]
    pub fn after_finalize(&self) -> Option<&LifecycleHook> {
        self.after_finalize.as_ref()
    }

    /// The `OnShutdown` hook
    #[must_use]
    pub fn on_shutdown(&self) -> Option<&LifecycleHook> {
        self.on_shutdown.as_ref()
    }

    /// Look up a declared action
    #[must_use]
    pub fn action(&self, name: &str) -> Option<&ActionDef> {
        self.actions.get(name)
    }

    /// Look up a declared event
    #[must_use]
    pub fn event(&self, name: &str) -> Option<&EventDef> {
        self.events.get(name)
    }

    /// The tick handler, if declared
    #[must_use]
    pub fn tick(&self) -> Option<&TickHandler> {
        self.tick.as_ref()
    }
}

impl std::fmt::Debug for RoomDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomDefinition")
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .field("events", &self.events.keys().collect::<Vec<_>>())
            .field("has_tick", &self.tick.is_some())
            .finish()
    }
}

/// Builder for [`RoomDefinition`]
pub struct RoomDefinitionBuilder {
    definition: RoomDefinition,
}

impl RoomDefinitionBuilder {
    /// Set the join gate
    #[must_use]
    pub fn can_join(
        mut self,
        f: impl Fn(&Viewer, &Value, &StateTree) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.definition.can_join = Some(Arc::new(f));
        self
    }

    /// Add a resolver run for every join
    #[must_use]
    pub fn join_resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.definition.join_resolvers.push(resolver);
        self
    }

    /// Set the `OnInitialize` hook
    #[must_use]
    pub fn on_initialize(
        mut self,
        f: impl Fn(&mut RoomContext<'_>) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.definition.on_initialize = Some(Arc::new(f));
        self
    }

    /// Set the `OnJoin` handler
    #[must_use]
    pub fn on_join(
        mut self,
        f: impl Fn(&mut RoomContext<'_>, &Viewer, &Value, &ResolverOutputs) -> Result<(), String>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.definition.on_join = Some(Arc::new(f));
        self
    }

    /// Set the `OnLeave` handler
    #[must_use]
    pub fn on_leave(
        mut self,
        f: impl Fn(&mut RoomContext<'_>, &Viewer) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.definition.on_leave = Some(Arc::new(f));
        self
    }

    /// Set the `OnFinalize` hook
    #[must_use]
    pub fn on_finalize(
        mut self,
        f: impl Fn(&mut RoomContext<'_>) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.definition.on_finalize = Some(Arc::new(f));
        self
    }

    /// Set the `AfterFinalize` hook
    #[must_use]
    pub fn after_finalize(
        mut self,
        f: impl Fn(&mut RoomContext<'_>) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.definition.after_finalize = Some(Arc::new(f));
        self
    }

    /// Set the `OnShutdown` hook
    #[must_use]
    pub fn on_shutdown(
        mut self,
        f: impl Fn(&mut RoomContext<'_>) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.definition.on_shutdown = Some(Arc::new(f));
        self
    }

    /// Declare an action with its resolvers and handler
    #[must_use]
    pub fn action(
        mut self,
        name: impl Into<String>,
        resolvers: Vec<Arc<dyn Resolver>>,
        handler: impl Fn(&mut RoomContext<'_>, &Viewer, &Value, &ResolverOutputs) -> Result<Value, String>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.definition.actions.insert(
            name.into(),
            ActionDef {
                resolvers,
                handler: Arc::new(handler),
            },
        );
        self
    }

    /// Declare a client event with its resolvers and handler
    #[must_use]
    pub fn event(
        mut self,
        name: impl Into<String>,
        resolvers: Vec<Arc<dyn Resolver>>,
        handler: impl Fn(&mut RoomContext<'_>, &Viewer, &Value, &ResolverOutputs) -> Result<(), String>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.definition.events.insert(
            name.into(),
            EventDef {
                resolvers,
                handler: Arc::new(handler),
            },
        );
        self
    }

    /// Set the tick handler
    #[must_use]
    pub fn on_tick(
        mut self,
        f: impl Fn(&mut RoomContext<'_>) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.definition.tick = Some(Arc::new(f));
        self
    }

    /// Finish the definition
    #[must_use]
    pub fn build(self) -> RoomDefinition {
        self.definition
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_schema::{FieldDecl, SyncPolicy};
    use serde_json::json;

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::builder()
                .field(FieldDecl::new("round", SyncPolicy::Broadcast).unwrap())
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_builder_registers_handlers_by_name() {
        let definition = RoomDefinition::builder(schema())
            .action("Draw", Vec::new(), |_, _, _, _| Ok(json!(null)))
            .event("Emote", Vec::new(), |_, _, _, _| Ok(()))
            .on_tick(|_| Ok(()))
            .build();

        assert!(definition.action("Draw").is_some());
        assert!(definition.action("Discard").is_none());
        assert!(definition.event("Emote").is_some());
        assert!(definition.tick().is_some());
        assert!(definition.on_join().is_none());
    }
}
