//! Response bodies returned by the management server

use serde::{Deserialize, Deserializer, Serialize};

/// Artifact offered by the server in a 200 update-check response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    /// Server-side package identifier
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Locator the installer downloads the artifact from
    pub uri: String,
}

impl ArtifactRef {
    /// Whether the artifact carries a locator that can be handed to an installer
    #[must_use]
    pub fn is_installable(&self) -> bool {
        !self.uri.trim().is_empty()
    }
}

/// Package ids are numeric in the server database but strings on some deployments
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Unsigned(u64),
        Signed(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Unsigned(n) => n.to_string(),
        Id::Signed(n) => n.to_string(),
    })
}
