//! `CredentialActor`: owner of the device bearer token
//!
//! All reads and writes of the token go through this actor's mailbox. Messages are
//! handled one at a time, which also serializes authentication handshakes. A handshake
//! is cut off after `handshake_timeout` so token reads never queue behind it for longer.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use kameo::actor::{ActorRef, WeakActorRef};
use kameo::error::ActorStopReason;
use kameo::message::{Context, Message};
use kameo::prelude::*;
use tokio::time::timeout;
use tracing::{info, warn};

use rdfm_api::AuthToken;

use crate::error::CoreError;
use crate::message::{CurrentToken, Reauthenticate, ReplaceToken, TokenSnapshot};
use crate::traits::Authenticator;

/// Arguments for spawning a `CredentialActor`
pub struct CredentialActorArgs {
    /// Authentication handshake implementation
    pub authenticator: Arc<dyn Authenticator>,
    /// Token to start with, e.g. one persisted by a previous run
    pub initial_token: Option<AuthToken>,
    /// Deadline for one handshake; the mailbox is blocked at most this long
    pub handshake_timeout: Duration,
}

/// Actor holding the current bearer token
pub struct CredentialActor {
    /// Current token
    token: AuthToken,
    /// When `token` was stored
    obtained_at: Option<DateTime<Utc>>,
    /// Authentication handshake implementation
    authenticator: Arc<dyn Authenticator>,
    /// Deadline for one handshake
    handshake_timeout: Duration,
}

impl CredentialActor {
    fn store(&mut self, token: AuthToken) {
        self.token = token;
        self.obtained_at = Some(Utc::now());
    }

    fn snapshot(&self) -> TokenSnapshot {
        TokenSnapshot {
            token: self.token.clone(),
            obtained_at: self.obtained_at,
        }
    }
}

impl Actor for CredentialActor {
    type Args = CredentialActorArgs;
    type Error = CoreError;

    async fn on_start(args: Self::Args, actor_ref: ActorRef<Self>) -> Result<Self, Self::Error> {
        let seeded = args.initial_token.as_ref().is_some_and(|t| !t.is_empty());
        info!(id = %actor_ref.id(), seeded, "CredentialActor starting");

        let mut actor = Self {
            token: AuthToken::default(),
            obtained_at: None,
            authenticator: args.authenticator,
            handshake_timeout: args.handshake_timeout,
        };
        if let Some(token) = args.initial_token {
            actor.store(token);
        }
        Ok(actor)
    }

    async fn on_stop(
        &mut self,
        _actor_ref: WeakActorRef<Self>,
        reason: ActorStopReason,
    ) -> Result<(), Self::Error> {
        info!(reason = ?reason, "CredentialActor stopping");
        Ok(())
    }
}

// ============================================================================
// Message Handlers
// ============================================================================

impl Message<CurrentToken> for CredentialActor {
    type Reply = TokenSnapshot;

    async fn handle(
        &mut self,
        _msg: CurrentToken,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        self.snapshot()
    }
}

impl Message<Reauthenticate> for CredentialActor {
    type Reply = Result<(), CoreError>;

    async fn handle(
        &mut self,
        _msg: Reauthenticate,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        info!("authenticating device with the server");

        let handshake = timeout(self.handshake_timeout, self.authenticator.authenticate()).await;

        match handshake {
            Err(_) => {
                let e = CoreError::Timeout {
                    operation: "authentication",
                    after: self.handshake_timeout,
                };
                warn!(error = %e, "handshake abandoned, keeping previous token");
                Err(CoreError::AuthenticationFailed(e.to_string()))
            }
            Ok(Ok(token)) if token.is_empty() => {
                warn!("authenticator returned an empty token");
                Err(CoreError::AuthenticationFailed(
                    "server returned an empty token".to_string(),
                ))
            }
            Ok(Ok(token)) => {
                self.store(token);
                info!("device token refreshed");
                Ok(())
            }
            Ok(Err(e @ CoreError::AuthenticationFailed(_))) => Err(e),
            Ok(Err(e)) => Err(CoreError::AuthenticationFailed(e.to_string())),
        }
    }
}

impl Message<ReplaceToken> for CredentialActor {
    type Reply = ();

    async fn handle(
        &mut self,
        msg: ReplaceToken,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        info!("device token replaced externally");
        self.store(msg.token);
    }
}
