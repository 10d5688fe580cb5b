//! Request bodies sent by the device

use serde::{Deserialize, Serialize};

/// Device identity sent with every update check
///
/// Serialized with the fixed `rdfm.*` keys expected by the management server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceMetadata {
    /// Hardware device type, e.g. `rpi4`
    #[serde(rename = "rdfm.hardware.devtype")]
    pub device_type: String,
    /// Name of the currently installed artifact
    #[serde(rename = "rdfm.software.version")]
    pub artifact_version: String,
    /// Network identifier (MAC address)
    #[serde(rename = "rdfm.hardware.macaddr")]
    pub network_id: String,
}

impl DeviceMetadata {
    /// Create metadata from its three components
    #[must_use]
    pub fn new(
        device_type: impl Into<String>,
        artifact_version: impl Into<String>,
        network_id: impl Into<String>,
    ) -> Self {
        Self {
            device_type: device_type.into(),
            artifact_version: artifact_version.into(),
            network_id: network_id.into(),
        }
    }
}
