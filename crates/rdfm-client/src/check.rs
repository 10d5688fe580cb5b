//! Update-check result classification

use std::fmt;

use rdfm_api::ArtifactRef;

/// Outcome of a single update check
///
/// Every server answer and transport failure maps onto exactly one variant, so callers
/// select their next step by matching rather than by inspecting errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateCheckResult {
    /// Server offers a newer artifact (200)
    UpdateAvailable {
        /// Artifact to install
        artifact: ArtifactRef,
    },
    /// Device is up to date (204)
    NoUpdate,
    /// Bearer token missing, invalid or expired (401)
    Unauthorized,
    /// Server rejected the device metadata (400)
    MalformedMetadata,
    /// Any other status code
    UnexpectedStatus {
        /// HTTP status code returned by the server
        code: u16,
    },
    /// Request never produced a response (connection, timeout, body read)
    TransportFailure {
        /// Underlying error
        cause: String,
    },
    /// 200 body was not a usable artifact description
    DecodeFailure {
        /// Underlying error
        cause: String,
    },
}

impl UpdateCheckResult {
    /// Classify a status code that carries no body of interest
    ///
    /// 200 needs its body decoded, so callers route it through
    /// [`UpdateCheckResult::from_artifact_body`] instead.
    #[must_use]
    pub fn from_status(code: u16) -> Self {
        match code {
            204 => Self::NoUpdate,
            400 => Self::MalformedMetadata,
            401 => Self::Unauthorized,
            code => Self::UnexpectedStatus { code },
        }
    }

    /// Decode the body of a 200 response
    #[must_use]
    pub fn from_artifact_body(body: &[u8]) -> Self {
        match serde_json::from_slice::<ArtifactRef>(body) {
            Ok(artifact) if artifact.is_installable() => Self::UpdateAvailable { artifact },
            Ok(artifact) => Self::DecodeFailure {
                cause: format!("artifact {} has an empty uri", artifact.id),
            },
            Err(e) => Self::DecodeFailure {
                cause: e.to_string(),
            },
        }
    }

    /// Whether the check itself succeeded (update or no update)
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::UpdateAvailable { .. } | Self::NoUpdate)
    }

    /// Artifact to install, if any
    #[must_use]
    pub fn artifact(&self) -> Option<&ArtifactRef> {
        match self {
            Self::UpdateAvailable { artifact } => Some(artifact),
            _ => None,
        }
    }
}

impl fmt::Display for UpdateCheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpdateAvailable { artifact } => {
                write!(f, "update available: {} ({})", artifact.id, artifact.uri)
            }
            Self::NoUpdate => write!(f, "no updates are available"),
            Self::Unauthorized => write!(
                f,
                "device did not provide authorization data, or the authorization has expired"
            ),
            Self::MalformedMetadata => write!(
                f,
                "device metadata is missing device type and/or software version"
            ),
            Self::UnexpectedStatus { code } => {
                write!(f, "unexpected status code from the server: {code}")
            }
            Self::TransportFailure { cause } => write!(f, "update check request failed: {cause}"),
            Self::DecodeFailure { cause } => {
                write!(f, "failed to deserialize package metadata: {cause}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_statuses() {
        assert_eq!(UpdateCheckResult::from_status(204), UpdateCheckResult::NoUpdate);
        assert_eq!(
            UpdateCheckResult::from_status(400),
            UpdateCheckResult::MalformedMetadata
        );
        assert_eq!(
            UpdateCheckResult::from_status(401),
            UpdateCheckResult::Unauthorized
        );
    }

    #[test]
    fn test_other_statuses_keep_code() {
        for code in [201, 202, 301, 403, 404, 409, 500, 502, 503] {
            assert_eq!(
                UpdateCheckResult::from_status(code),
                UpdateCheckResult::UnexpectedStatus { code }
            );
        }
    }

    #[test]
    fn test_artifact_body() {
        let result =
            UpdateCheckResult::from_artifact_body(br#"{"id":"pkg1","uri":"http://x/pkg1"}"#);
        assert_eq!(result.artifact().map(|a| a.uri.as_str()), Some("http://x/pkg1"));
        assert!(result.is_success());
    }

    #[test]
    fn test_malformed_body() {
        let result = UpdateCheckResult::from_artifact_body(b"{not json");
        assert!(matches!(result, UpdateCheckResult::DecodeFailure { .. }));
        assert!(!result.is_success());
    }

    #[test]
    fn test_empty_uri_is_decode_failure() {
        let result = UpdateCheckResult::from_artifact_body(br#"{"id":"pkg1","uri":""}"#);
        assert!(matches!(result, UpdateCheckResult::DecodeFailure { .. }));
        assert!(result.artifact().is_none());
    }
}
