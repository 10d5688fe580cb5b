//! Poller event types
//!
//! Broadcast by the poller so operator surfaces can follow both the update-check and
//! the installation failure domains.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PollerEvent {
    StateChanged {
        from: String,
        to: String,
    },
    CheckCompleted {
        result: String,
    },
    InstallRequested {
        artifact_id: String,
        uri: String,
    },
    InstallFinished {
        artifact_id: String,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Authenticated,
    AuthenticationFailed {
        reason: String,
    },
}
