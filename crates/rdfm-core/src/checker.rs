//! `UpdateChecker`: one update check plus the installation it triggers
//!
//! Update detection and update application are separate failure domains. The checker
//! starts installation on its own task and hands back an [`InstallHandle`]; the check
//! result is final before installation has even begun.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{error, info};

use rdfm_api::{ArtifactRef, AuthToken, DeviceMetadata};
use rdfm_client::{ServerClient, UpdateCheckResult};

use crate::error::CoreError;
use crate::traits::{Installer, UpdateCheck};

/// Result of one update check
#[derive(Debug)]
pub struct CheckOutcome {
    /// Classified server answer
    pub result: UpdateCheckResult,
    /// Installation started because of `result`, if any
    pub installation: Option<InstallHandle>,
}

impl CheckOutcome {
    /// Outcome that started no installation
    #[must_use]
    pub fn without_installation(result: UpdateCheckResult) -> Self {
        Self {
            result,
            installation: None,
        }
    }
}

/// Handle to an installation running in the background
#[derive(Debug)]
pub struct InstallHandle {
    artifact: ArtifactRef,
    task: JoinHandle<Result<(), CoreError>>,
}

impl InstallHandle {
    /// Start installing `artifact` through `installer` on its own task
    ///
    /// Failures are logged here and otherwise only visible through the handle.
    #[must_use]
    pub fn spawn(artifact: ArtifactRef, installer: Arc<dyn Installer>) -> Self {
        let id = artifact.id.clone();
        let uri = artifact.uri.clone();

        let task = tokio::spawn(async move {
            info!(artifact = %id, uri = %uri, "installing package");

            let result = installer.install(&uri).await;
            match &result {
                Ok(()) => info!(artifact = %id, "package installation finished"),
                // TODO: decide whether a failed install should trigger an early re-check
                Err(e) => error!(artifact = %id, error = %e, "failed to install package"),
            }
            result
        });

        Self { artifact, task }
    }

    /// Artifact being installed
    #[must_use]
    pub fn artifact(&self) -> &ArtifactRef {
        &self.artifact
    }

    /// Whether the installer has returned
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the installer to return
    ///
    /// # Errors
    /// Returns `InstallFailed` if the installer failed or its task panicked.
    pub async fn outcome(self) -> Result<(), CoreError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(CoreError::InstallFailed {
                uri: self.artifact.uri,
                reason: e.to_string(),
            }),
        }
    }
}

/// Checks the management server for updates and forwards offered artifacts to an
/// [`Installer`]
pub struct UpdateChecker {
    client: ServerClient,
    installer: Arc<dyn Installer>,
}

impl UpdateChecker {
    /// Create a checker talking to `client` and installing through `installer`
    #[must_use]
    pub fn new(client: ServerClient, installer: Arc<dyn Installer>) -> Self {
        Self { client, installer }
    }
}

#[async_trait]
impl UpdateCheck for UpdateChecker {
    async fn check(&self, metadata: &DeviceMetadata, token: &AuthToken) -> CheckOutcome {
        let result = self.client.check_update(metadata, token).await;

        let installation = result
            .artifact()
            .cloned()
            .map(|artifact| InstallHandle::spawn(artifact, self.installer.clone()));

        CheckOutcome {
            result,
            installation,
        }
    }
}
