//! rdfm-client: HTTP client for the rdfm management server
//!
//! Sends the device update check and classifies the server's answer into an
//! [`UpdateCheckResult`].
//!
//! # Example
//!
//! ```no_run
//! use rdfm_api::{AuthToken, DeviceMetadata};
//! use rdfm_client::{ServerClient, UpdateCheckResult};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ServerClient::new("http://localhost:5000")?;
//! let metadata = DeviceMetadata::new("rpi4", "1.0.0", "AA:BB:CC:DD:EE:FF");
//!
//! match client.check_update(&metadata, &AuthToken::new("token")).await {
//!     UpdateCheckResult::UpdateAvailable { artifact } => println!("install {}", artifact.uri),
//!     UpdateCheckResult::NoUpdate => println!("up to date"),
//!     other => println!("check failed: {other}"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod check;
pub mod error;
pub mod http;

pub use check::UpdateCheckResult;
pub use error::{ClientError, Result};
pub use http::{ServerClient, UPDATE_CHECK_PATH};
