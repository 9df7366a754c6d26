//! Room lifecycle phases.

use std::fmt;

/// Phase of a room's life
///
/// `Uninitialized → Running → Finalizing → Destroyed`, one direction only.
/// Commands are processed only while `Running`; finalization is triggered by
/// an explicit destroy or by the idle timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    /// Created, `OnInitialize` not yet run
    Uninitialized,
    /// Processing commands and ticks
    Running,
    /// `OnFinalize` ran; awaiting persistence and `AfterFinalize`
    Finalizing,
    /// Fully torn down
    Destroyed,
}

impl RoomPhase {
    /// Whether `next` is a legal transition from this phase
    #[must_use]
    pub fn can_transition_to(self, next: RoomPhase) -> bool {
        matches!(
            (self, next),
            (RoomPhase::Uninitialized, RoomPhase::Running)
                | (RoomPhase::Running, RoomPhase::Finalizing)
                | (RoomPhase::Finalizing, RoomPhase::Destroyed)
        )
    }

    /// Whether the room accepts commands
    #[must_use]
    pub fn is_running(self) -> bool {
        self == RoomPhase::Running
    }
}

impl fmt::Display for RoomPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RoomPhase::Uninitialized => "uninitialized",
            RoomPhase::Running => "running",
            RoomPhase::Finalizing => "finalizing",
            RoomPhase::Destroyed => "destroyed",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phases_move_one_direction() {
        assert!(RoomPhase::Uninitialized.can_transition_to(RoomPhase::Running));
        assert!(RoomPhase::Running.can_transition_to(RoomPhase::Finalizing));
        assert!(RoomPhase::Finalizing.can_transition_to(RoomPhase::Destroyed));

        assert!(!RoomPhase::Running.can_transition_to(RoomPhase::Uninitialized));
        assert!(!RoomPhase::Destroyed.can_transition_to(RoomPhase::Running));
        assert!(!RoomPhase::Uninitialized.can_transition_to(RoomPhase::Destroyed));
    }

    #[test]
    fn test_only_running_accepts_commands() {
        assert!(RoomPhase::Running.is_running());
        assert!(!RoomPhase::Finalizing.is_running());
    }
}
