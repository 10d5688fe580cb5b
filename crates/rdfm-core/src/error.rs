//! Core error types for rdfm-core

use std::time::Duration;

use thiserror::Error;

use crate::state::PollerState;

/// Errors that can occur in polling, credential and installation operations
///
/// None of these is fatal to the poller: each is logged and absorbed into a state
/// transition.
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    /// Device identity could not be discovered
    #[error("failed to read device metadata: {0}")]
    MetadataUnavailable(String),

    /// Authentication handshake failed
    #[error("failed to authenticate: {0}")]
    AuthenticationFailed(String),

    /// Artifact installation failed
    #[error("failed to install package from {uri}: {reason}")]
    InstallFailed {
        /// Artifact locator handed to the installer
        uri: String,
        /// Installer error
        reason: String,
    },

    /// A collaborator call exceeded its deadline
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        /// Operation that was cut off
        operation: &'static str,
        /// Deadline that was exceeded
        after: Duration,
    },

    /// Invalid state transition attempted
    #[error("invalid state transition from {from} to {to}")]
    InvalidTransition {
        /// Current state
        from: PollerState,
        /// Attempted target state
        to: PollerState,
    },

    /// External command could not be run or exited unsuccessfully
    #[error("command failed: {0}")]
    CommandFailed(String),

    /// Actor communication error
    #[error("actor communication error: {0}")]
    ActorError(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(String),
}
