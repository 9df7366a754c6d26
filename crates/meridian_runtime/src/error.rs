//! Runtime errors.
//!
//! Handler and resolver failures abort only the request that carried them;
//! the room keeps running. Only configuration errors at definition time and
//! a closed command channel are terminal.

use meridian_core::CoreError;
use thiserror::Error;

use crate::lifecycle::RoomPhase;

/// Result alias for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Room executor failures
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The `can_join` predicate rejected the viewer
    #[error("join denied: {reason}")]
    JoinDenied {
        /// Application-provided reason, relayed to the client
        reason: String,
    },

    /// An action handler returned an error
    #[error("action {name}: {message}")]
    Action {
        /// Declared action name
        name: String,
        /// Handler error message
        message: String,
    },

    /// An event handler returned an error
    #[error("event {name}: {message}")]
    Event {
        /// Declared event name
        name: String,
        /// Handler error message
        message: String,
    },

    /// A resolver failed; the request never reached its handler
    #[error("resolver {resolver}: {message}")]
    Resolver {
        /// Name of the failing resolver
        resolver: String,
        /// Resolver error message
        message: String,
    },

    /// A lifecycle hook or join handler returned an error
    #[error("{hook} hook: {message}")]
    Lifecycle {
        /// Hook name (`OnInitialize`, `OnJoin`, ...)
        hook: &'static str,
        /// Hook error message
        message: String,
    },

    /// A request named an action the definition does not declare
    #[error("unknown action {0}")]
    UnknownAction(String),

    /// A request named an event the definition does not declare
    #[error("unknown event {0}")]
    UnknownEvent(String),

    /// A request arrived from a session that is not joined
    #[error("unknown session {0}")]
    UnknownSession(meridian_core::SessionId),

    /// The operation is not valid in the room's current phase
    #[error("room is {0}")]
    WrongPhase(RoomPhase),

    /// A mutation or lookup violated the schema
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The room task is gone; no further commands can be delivered
    #[error("room command channel closed")]
    ChannelClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RuntimeError::JoinDenied {
            reason: "room full".to_string(),
        };
        assert_eq!(err.to_string(), "join denied: room full");

        let err = RuntimeError::Resolver {
            resolver: "shuffle".to_string(),
            message: "rng unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "resolver shuffle: rng unavailable");
    }

    #[test]
    fn test_core_error_converts() {
        let core = CoreError::UnknownField {
            path: "nope".to_string(),
        };
        let err: RuntimeError = core.into();
        assert!(matches!(err, RuntimeError::Core(_)));
    }
}
