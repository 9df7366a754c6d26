//! Identities for MERIDIAN.SYNC.
//!
//! Player, client, and session identities are independent: one player
//! (account) may hold several concurrent clients (devices) and sessions
//! (connections). Players are named by external auth, so `PlayerId` is an
//! opaque string; the rest are UUIDs serialized in canonical format.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Player identifier - an account, assigned by external authentication
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(String);

impl PlayerId {
    /// Create from an opaque account identifier
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Client identifier - a device or app instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientId(Uuid);

impl ClientId {
    /// Create a new random ClientId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from UUID bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Get as UUID
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "client_{}", self.0)
    }
}

/// Session identifier - one persistent connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new random SessionId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from UUID bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Get as UUID
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session_{}", self.0)
    }
}

/// Room identifier - one authoritative state instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomId(Uuid);

impl RoomId {
    /// Create a new random RoomId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from UUID bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Get as UUID
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RoomId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "room_{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_opaque() {
        let p = PlayerId::new("alice");
        assert_eq!(p.as_str(), "alice");
        assert_eq!(format!("{}", p), "alice");
    }

    #[test]
    fn test_uuid_ids_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
        assert_ne!(ClientId::new(), ClientId::new());
        assert_ne!(RoomId::new(), RoomId::new());
    }

    #[test]
    fn test_id_from_bytes() {
        let bytes = [7u8; 16];
        let id = SessionId::from_bytes(bytes);
        assert_eq!(id, SessionId::from_bytes(bytes));
    }

    #[test]
    fn test_id_display_prefixes() {
        assert!(format!("{}", SessionId::new()).starts_with("session_"));
        assert!(format!("{}", ClientId::new()).starts_with("client_"));
        assert!(format!("{}", RoomId::new()).starts_with("room_"));
    }

    #[test]
    fn test_same_player_distinct_sessions() {
        let player = PlayerId::new("alice");
        let s1 = SessionId::new();
        let s2 = SessionId::new();
        assert_eq!(player, PlayerId::new("alice"));
        assert_ne!(s1, s2);
    }
}
