//! Session loop state machine types

use std::fmt;

/// States of the session loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    InitialDisplay,
    AwaitingCommand,
    Dispatching,
    Reconciling,
    Displaying,
    Terminated,
}

impl SessionState {
    /// Whether moving from `self` to `next` is a legal transition
    #[must_use]
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;

        matches!(
            (self, next),
            (Connecting, InitialDisplay)
                | (InitialDisplay, AwaitingCommand)
                | (AwaitingCommand, Dispatching)
                | (Dispatching, Reconciling)
                | (Reconciling, Displaying)
                | (Displaying, AwaitingCommand)
                | (Displaying | AwaitingCommand, Terminated)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Connecting => "connecting",
            SessionState::InitialDisplay => "initial_display",
            SessionState::AwaitingCommand => "awaiting_command",
            SessionState::Dispatching => "dispatching",
            SessionState::Reconciling => "reconciling",
            SessionState::Displaying => "displaying",
            SessionState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}
