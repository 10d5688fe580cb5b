//! Actor implementations

pub mod credentials;

pub use credentials::{CredentialActor, CredentialActorArgs};
