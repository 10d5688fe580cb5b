//! Error types for the rdfm client

use thiserror::Error;

/// Errors that can occur while constructing the rdfm client
///
/// Failures of an individual update check are not errors; they are classified into
/// [`crate::UpdateCheckResult`] variants.
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP transport could not be built
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// URL parsed but cannot address the management server
    #[error("Unsupported server URL: {0}")]
    UnsupportedUrl(String),
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
