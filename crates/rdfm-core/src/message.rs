//! Message types for actor communication
//!
//! Message handlers are implemented in their respective actor modules.

use chrono::{DateTime, Utc};
use kameo_macros::Reply;

use rdfm_api::AuthToken;

// ============================================================================
// CredentialActor Messages
// ============================================================================

/// Read the current bearer token
#[derive(Debug)]
pub struct CurrentToken;

/// Current token and when it was obtained
#[derive(Debug, Clone, Reply)]
pub struct TokenSnapshot {
    /// Bearer token (empty until the first successful authentication)
    pub token: AuthToken,
    /// When the token was stored
    pub obtained_at: Option<DateTime<Utc>>,
}

/// Run the authentication handshake and store the resulting token
///
/// Handled one at a time, so at most one handshake is ever in flight.
#[derive(Debug)]
pub struct Reauthenticate;

/// Replace the token with one obtained outside the poller
#[derive(Debug)]
pub struct ReplaceToken {
    /// New bearer token
    pub token: AuthToken,
}
