//! Poller state machine types

use std::fmt;

/// States of the update polling loop
///
/// The loop starts in `Checking` and has no terminal state; it only stops when its
/// cancellation token fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollerState {
    #[default]
    Checking,
    Authenticating,
    Sleeping,
}

impl PollerState {
    /// Whether the loop may move from `self` to `next`
    #[must_use]
    pub fn can_transition_to(self, next: PollerState) -> bool {
        use PollerState::{Authenticating, Checking, Sleeping};

        matches!(
            (self, next),
            (Checking, Sleeping | Authenticating)
                | (Authenticating, Checking | Sleeping)
                | (Sleeping, Checking)
        )
    }
}

impl fmt::Display for PollerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PollerState::Checking => "checking",
            PollerState::Authenticating => "authenticating",
            PollerState::Sleeping => "sleeping",
        };
        f.write_str(name)
    }
}
