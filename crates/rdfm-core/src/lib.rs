//! rdfm-core: Update polling and credential management
//!
//! Implements the periodic update-check loop (`Poller`), the `UpdateChecker` that turns
//! a server answer into an installation request, and the `CredentialActor` that owns the
//! device bearer token.

pub mod actor;
pub mod checker;
pub mod config;
pub mod error;
pub mod message;
pub mod poller;
pub mod state;
pub mod traits;

pub use actor::credentials::{CredentialActor, CredentialActorArgs};
pub use checker::{CheckOutcome, InstallHandle, UpdateChecker};
pub use config::PollerConfig;
pub use error::CoreError;
pub use message::{CurrentToken, Reauthenticate, ReplaceToken, TokenSnapshot};
pub use poller::{Poller, PollerArgs, PollerHandle};
pub use state::PollerState;
pub use traits::{Authenticator, Installer, MetadataProvider, UpdateCheck};
