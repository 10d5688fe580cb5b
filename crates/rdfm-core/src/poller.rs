//! `Poller`: the periodic update-check loop
//!
//! Runs `Checking → {Sleeping | Authenticating}` forever on one task. A rejected token
//! leads straight into `Authenticating`; a successful handshake goes back to `Checking`
//! without waiting, anything else waits out the poll interval. Every failure is logged
//! and absorbed into a transition.

use std::sync::Arc;

use kameo::actor::{ActorRef, Spawn};
use kameo::error::SendError;
use kameo::prelude::*;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use rdfm_api::{AuthToken, PollerEvent};
use rdfm_client::UpdateCheckResult;

use crate::actor::credentials::{CredentialActor, CredentialActorArgs};
use crate::checker::{CheckOutcome, InstallHandle};
use crate::config::PollerConfig;
use crate::error::CoreError;
use crate::message::{CurrentToken, Reauthenticate};
use crate::state::PollerState;
use crate::traits::{Authenticator, MetadataProvider, UpdateCheck};

/// Arguments for building a `Poller`
pub struct PollerArgs {
    /// Timing configuration
    pub config: PollerConfig,
    /// Device identity source
    pub metadata: Arc<dyn MetadataProvider>,
    /// Update check implementation
    pub checker: Arc<dyn UpdateCheck>,
    /// Authentication handshake implementation
    pub authenticator: Arc<dyn Authenticator>,
    /// Token to start with
    pub initial_token: Option<AuthToken>,
}

/// Update-check loop state machine
pub struct Poller {
    /// Timing configuration
    config: PollerConfig,
    /// Current state
    state: PollerState,
    /// Device identity source
    metadata: Arc<dyn MetadataProvider>,
    /// Update check implementation
    checker: Arc<dyn UpdateCheck>,
    /// Owner of the bearer token
    credentials: ActorRef<CredentialActor>,
    /// Event broadcast sender
    event_tx: broadcast::Sender<PollerEvent>,
}

impl Poller {
    /// Build a poller and spawn its `CredentialActor`
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(args: PollerArgs) -> Self {
        let (event_tx, _) = broadcast::channel(args.config.event_channel_capacity.max(1));

        let credentials = CredentialActor::spawn(CredentialActorArgs {
            authenticator: args.authenticator,
            initial_token: args.initial_token,
            handshake_timeout: args.config.call_timeout,
        });

        Self {
            config: args.config,
            state: PollerState::default(),
            metadata: args.metadata,
            checker: args.checker,
            credentials,
            event_tx,
        }
    }

    /// Get current state
    #[must_use]
    pub fn state(&self) -> PollerState {
        self.state
    }

    /// Reference to the token owner, for external re-authentication triggers
    #[must_use]
    pub fn credentials(&self) -> ActorRef<CredentialActor> {
        self.credentials.clone()
    }

    /// Get event receiver
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PollerEvent> {
        self.event_tx.subscribe()
    }

    /// Perform the work of the current state and move to the next one
    pub async fn advance(&mut self) -> PollerState {
        let next = match self.state {
            PollerState::Checking => self.check().await,
            PollerState::Authenticating => self.authenticate().await,
            PollerState::Sleeping => {
                sleep(self.config.poll_interval).await;
                PollerState::Checking
            }
        };

        if let Err(e) = self.transition_to(next) {
            error!(error = %e, "rejected state transition");
        }
        self.state
    }

    /// Run until `cancel` fires
    ///
    /// Cancellation is observed while sleeping and while a check or handshake is in
    /// flight.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            interval = ?self.config.poll_interval,
            "starting periodic update checks"
        );

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = self.advance() => {}
            }
        }

        info!("stopped checking for updates");
        self.credentials.stop_gracefully().await.ok();
    }

    /// Run on a dedicated task
    #[must_use]
    pub fn spawn(self) -> PollerHandle {
        let cancel = CancellationToken::new();
        let credentials = self.credentials.clone();
        let event_tx = self.event_tx.clone();
        let task = tokio::spawn(self.run(cancel.clone()));

        PollerHandle {
            cancel,
            task,
            credentials,
            event_tx,
        }
    }

    /// Transition to a new state with validation and event emission
    fn transition_to(&mut self, new_state: PollerState) -> Result<(), CoreError> {
        if !self.state.can_transition_to(new_state) {
            return Err(CoreError::InvalidTransition {
                from: self.state,
                to: new_state,
            });
        }

        let old_state = self.state;
        self.state = new_state;

        debug!(from = %old_state, to = %new_state, "state transition");

        if new_state == PollerState::Sleeping {
            info!(delay = ?self.config.poll_interval, "next update check scheduled");
        }

        // Ignore send errors (no subscribers is fine)
        let _ = self.event_tx.send(PollerEvent::StateChanged {
            from: old_state.to_string(),
            to: new_state.to_string(),
        });

        Ok(())
    }

    /// `Checking`: one bounded update check
    async fn check(&mut self) -> PollerState {
        let deadline = self.config.call_timeout;

        match timeout(deadline, self.run_check()).await {
            Ok(Ok(outcome)) => self.handle_outcome(outcome),
            Ok(Err(e)) => {
                error!(error = %e, "update check failed");
                PollerState::Sleeping
            }
            Err(_) => {
                let e = CoreError::Timeout {
                    operation: "update check",
                    after: deadline,
                };
                error!(error = %e, "update check failed");
                PollerState::Sleeping
            }
        }
    }

    async fn run_check(&self) -> Result<CheckOutcome, CoreError> {
        let metadata = self.metadata.metadata().await?;
        debug!(?metadata, "metadata to check updates");

        let snapshot = self
            .credentials
            .ask(CurrentToken)
            .await
            .map_err(|e| CoreError::ActorError(e.to_string()))?;

        Ok(self.checker.check(&metadata, &snapshot.token).await)
    }

    fn handle_outcome(&self, outcome: CheckOutcome) -> PollerState {
        let CheckOutcome {
            result,
            installation,
        } = outcome;

        let _ = self.event_tx.send(PollerEvent::CheckCompleted {
            result: result.to_string(),
        });

        if let Some(handle) = installation {
            self.watch_installation(handle);
        }

        match result {
            UpdateCheckResult::Unauthorized => {
                warn!("device is not authorized, re-authenticating");
                PollerState::Authenticating
            }
            UpdateCheckResult::NoUpdate => {
                info!("no updates are available");
                PollerState::Sleeping
            }
            UpdateCheckResult::UpdateAvailable { artifact } => {
                info!(artifact = %artifact.id, uri = %artifact.uri, "an update is available");
                PollerState::Sleeping
            }
            other => {
                error!(error = %other, "update check failed");
                PollerState::Sleeping
            }
        }
    }

    /// Report the installation outcome without holding up the loop
    fn watch_installation(&self, handle: InstallHandle) {
        let artifact_id = handle.artifact().id.clone();
        let _ = self.event_tx.send(PollerEvent::InstallRequested {
            artifact_id: artifact_id.clone(),
            uri: handle.artifact().uri.clone(),
        });

        let event_tx = self.event_tx.clone();
        tokio::spawn(async move {
            let event = match handle.outcome().await {
                Ok(()) => PollerEvent::InstallFinished {
                    artifact_id,
                    success: true,
                    error: None,
                },
                Err(e) => PollerEvent::InstallFinished {
                    artifact_id,
                    success: false,
                    error: Some(e.to_string()),
                },
            };
            let _ = event_tx.send(event);
        });
    }

    /// `Authenticating`: one bounded handshake through the credential actor
    async fn authenticate(&mut self) -> PollerState {
        let deadline = self.config.call_timeout;
        let credentials = &self.credentials;

        let result = match timeout(deadline, async { credentials.ask(Reauthenticate).await }).await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(SendError::HandlerError(e))) => Err(e),
            Ok(Err(e)) => Err(CoreError::AuthenticationFailed(e.to_string())),
            Err(_) => Err(CoreError::AuthenticationFailed(
                CoreError::Timeout {
                    operation: "authentication",
                    after: deadline,
                }
                .to_string(),
            )),
        };

        match result {
            Ok(()) => {
                info!("device authenticated, checking updates again");
                let _ = self.event_tx.send(PollerEvent::Authenticated);
                PollerState::Checking
            }
            Err(e) => {
                error!(error = %e, "update check failed");
                let _ = self.event_tx.send(PollerEvent::AuthenticationFailed {
                    reason: e.to_string(),
                });
                PollerState::Sleeping
            }
        }
    }
}

/// Handle to a poller running on its own task
pub struct PollerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    credentials: ActorRef<CredentialActor>,
    event_tx: broadcast::Sender<PollerEvent>,
}

impl PollerHandle {
    /// Reference to the token owner, for external re-authentication triggers
    #[must_use]
    pub fn credentials(&self) -> &ActorRef<CredentialActor> {
        &self.credentials
    }

    /// Get event receiver
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PollerEvent> {
        self.event_tx.subscribe()
    }

    /// Whether the loop task has exited
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the loop and wait for its task to exit
    ///
    /// # Errors
    /// Returns `ActorError` if the loop task panicked.
    pub async fn shutdown(self) -> Result<(), CoreError> {
        self.cancel.cancel();
        self.task
            .await
            .map_err(|e| CoreError::ActorError(e.to_string()))
    }
}
