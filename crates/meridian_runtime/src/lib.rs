//! MERIDIAN.SYNC Runtime
//!
//! The single-writer room executor. A room owns its authoritative state
//! tree and processes commands strictly in arrival order on one tokio task:
//! joins, leaves, actions, events, and interval ticks. Nondeterministic
//! data enters only through named async resolvers, which run concurrently
//! before the synchronous handler and whose outputs are recorded for
//! deterministic reevaluation.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod context;
pub mod definition;
pub mod dispatch;
pub mod error;
pub mod lifecycle;
pub mod persist;
pub mod resolver;
pub mod room;
pub mod services;
pub mod transport;

pub use config::RuntimeConfig;
pub use context::{PendingEvent, RoomContext};
pub use definition::{ActionDef, EventDef, RoomDefinition, RoomDefinitionBuilder};
pub use dispatch::{RoomCore, SyncOutput};
pub use error::{RuntimeError, RuntimeResult};
pub use lifecycle::RoomPhase;
pub use persist::PersistenceSink;
pub use resolver::{run_resolvers, FnResolver, Resolver, ResolverContext, ResolverOutputs};
pub use room::{Room, RoomCommand};
pub use services::ServiceRegistry;
pub use transport::Transport;
