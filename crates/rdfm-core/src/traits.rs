//! Collaborator traits
//!
//! Device identity discovery, the authentication handshake and artifact installation
//! live outside this crate; the poller reaches them through these traits.

use async_trait::async_trait;

use rdfm_api::{AuthToken, DeviceMetadata};

use crate::checker::CheckOutcome;
use crate::error::CoreError;

/// Supplies the device identity sent with every update check
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Current device type, installed artifact version and network identifier
    async fn metadata(&self) -> Result<DeviceMetadata, CoreError>;
}

/// Performs the authentication handshake with the management server
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Obtain a fresh bearer token
    async fn authenticate(&self) -> Result<AuthToken, CoreError>;
}

/// Installs an artifact given its locator
#[async_trait]
pub trait Installer: Send + Sync {
    async fn install(&self, uri: &str) -> Result<(), CoreError>;
}

/// Runs one update check and starts any installation it calls for
#[async_trait]
pub trait UpdateCheck: Send + Sync {
    async fn check(&self, metadata: &DeviceMetadata, token: &AuthToken) -> CheckOutcome;
}
