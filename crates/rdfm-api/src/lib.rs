//! rdfm-api: Shared wire types
//!
//! Contains the update-check request/response bodies, the device bearer token and the
//! event types the poller publishes for operator surfaces.

pub mod auth;
pub mod events;
pub mod requests;
pub mod responses;

pub use auth::AuthToken;
pub use events::PollerEvent;
pub use requests::DeviceMetadata;
pub use responses::ArtifactRef;
