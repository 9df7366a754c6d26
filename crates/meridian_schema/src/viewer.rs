//! Viewer identity.

use meridian_core::{ClientId, PlayerId, SessionId};
use serde::{Deserialize, Serialize};

/// A joined session that state is projected for
///
/// The three identities are independent: the same player may be joined
/// through several clients and sessions at once, and each session gets its
/// own projection and baseline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Viewer {
    /// Account identity (drives `PerPlayerSlice` / `PerPlayer` policies)
    pub player: PlayerId,
    /// Device or app instance
    pub client: ClientId,
    /// The connection this viewer is projected over
    pub session: SessionId,
}

impl Viewer {
    /// Create a viewer
    #[must_use]
    pub fn new(player: PlayerId, client: ClientId, session: SessionId) -> Self {
        Self {
            player,
            client,
            session,
        }
    }
}

impl std::fmt::Display for Viewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.player, self.session)
    }
}
