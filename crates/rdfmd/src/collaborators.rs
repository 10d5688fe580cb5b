//! Command-backed implementations of the poller's collaborators
//!
//! Device identity, installation and authentication are delegated to external programs
//! configured in the `[device]` and `[commands]` sections.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument};

use rdfm_api::{AuthToken, DeviceMetadata};
use rdfm_core::{Authenticator, CoreError, Installer, MetadataProvider};

use crate::config::{CommandsConfig, DeviceConfig};

/// Placeholder replaced with the artifact locator in the install command
pub const URI_PLACEHOLDER: &str = "{uri}";

/// Run `argv` without a shell and return its trimmed stdout
#[instrument(level = "debug")]
async fn run_command(argv: &[String]) -> Result<String, CoreError> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| CoreError::ConfigError("empty command".to_string()))?;

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| CoreError::CommandFailed(format!("failed to spawn {program}: {e}")))?;

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CoreError::CommandFailed(format!(
            "{program} exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    debug!(program = %program, "command completed");
    Ok(stdout)
}

/// Where the installed artifact name comes from
#[derive(Debug, Clone)]
enum VersionSource {
    Fixed(String),
    Command(Vec<String>),
}

/// Where the network identifier comes from
#[derive(Debug, Clone)]
enum NetworkIdSource {
    Fixed(String),
    Interface(PathBuf),
}

/// Device identity from configuration, a version command and sysfs
#[derive(Debug, Clone)]
pub struct ConfigMetadataProvider {
    device_type: String,
    version: VersionSource,
    network_id: NetworkIdSource,
}

impl ConfigMetadataProvider {
    /// Build a provider from the `[device]` section
    #[must_use]
    pub fn new(config: &DeviceConfig) -> Self {
        let version = match &config.artifact_version {
            Some(version) => VersionSource::Fixed(version.clone()),
            None => VersionSource::Command(config.artifact_version_command.clone()),
        };

        let network_id = match &config.mac_address {
            Some(mac) => NetworkIdSource::Fixed(mac.clone()),
            None => NetworkIdSource::Interface(
                PathBuf::from("/sys/class/net")
                    .join(&config.network_interface)
                    .join("address"),
            ),
        };

        Self {
            device_type: config.device_type.clone(),
            version,
            network_id,
        }
    }

    async fn artifact_version(&self) -> Result<String, CoreError> {
        match &self.version {
            VersionSource::Fixed(version) => Ok(version.clone()),
            VersionSource::Command(argv) => run_command(argv).await.map_err(|e| {
                CoreError::MetadataUnavailable(format!("error getting current software version: {e}"))
            }),
        }
    }

    async fn network_id(&self) -> Result<String, CoreError> {
        match &self.network_id {
            NetworkIdSource::Fixed(mac) => Ok(mac.clone()),
            NetworkIdSource::Interface(path) => tokio::fs::read_to_string(path)
                .await
                .map(|mac| mac.trim().to_string())
                .map_err(|e| {
                    CoreError::MetadataUnavailable(format!(
                        "error reading {}: {e}",
                        path.display()
                    ))
                }),
        }
    }
}

#[async_trait]
impl MetadataProvider for ConfigMetadataProvider {
    async fn metadata(&self) -> Result<DeviceMetadata, CoreError> {
        let artifact_version = self.artifact_version().await?;
        let network_id = self.network_id().await?;

        for (name, value) in [
            ("device type", &self.device_type),
            ("software version", &artifact_version),
            ("network identifier", &network_id),
        ] {
            if value.is_empty() {
                return Err(CoreError::MetadataUnavailable(format!("{name} is empty")));
            }
        }

        Ok(DeviceMetadata::new(
            self.device_type.clone(),
            artifact_version,
            network_id,
        ))
    }
}

/// Installs artifacts by running the configured install command
#[derive(Debug, Clone)]
pub struct CommandInstaller {
    argv: Vec<String>,
}

impl CommandInstaller {
    /// Build an installer from the `[commands]` section
    #[must_use]
    pub fn new(config: &CommandsConfig) -> Self {
        Self {
            argv: config.install.clone(),
        }
    }

    /// Install command with the locator substituted
    ///
    /// The locator is appended when the template has no placeholder.
    fn command_for(&self, uri: &str) -> Vec<String> {
        let mut argv: Vec<String> = self
            .argv
            .iter()
            .map(|arg| arg.replace(URI_PLACEHOLDER, uri))
            .collect();
        if !self.argv.iter().any(|arg| arg.contains(URI_PLACEHOLDER)) {
            argv.push(uri.to_string());
        }
        argv
    }
}

#[async_trait]
impl Installer for CommandInstaller {
    async fn install(&self, uri: &str) -> Result<(), CoreError> {
        run_command(&self.command_for(uri))
            .await
            .map(|_| ())
            .map_err(|e| CoreError::InstallFailed {
                uri: uri.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Obtains tokens by running the configured authentication command
#[derive(Debug, Clone)]
pub struct CommandAuthenticator {
    argv: Vec<String>,
}

impl CommandAuthenticator {
    /// Build an authenticator from the `[commands]` section
    #[must_use]
    pub fn new(config: &CommandsConfig) -> Self {
        Self {
            argv: config.authenticate.clone(),
        }
    }
}

#[async_trait]
impl Authenticator for CommandAuthenticator {
    async fn authenticate(&self) -> Result<AuthToken, CoreError> {
        run_command(&self.argv).await.map(AuthToken::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_install_placeholder() {
        let installer = CommandInstaller::new(&CommandsConfig {
            install: argv(&["rdfm", "install", "{uri}"]),
            authenticate: vec![],
        });
        assert_eq!(
            installer.command_for("http://x/pkg1"),
            argv(&["rdfm", "install", "http://x/pkg1"])
        );
    }

    #[test]
    fn test_install_without_placeholder_appends() {
        let installer = CommandInstaller::new(&CommandsConfig {
            install: argv(&["rdfm", "install"]),
            authenticate: vec![],
        });
        assert_eq!(
            installer.command_for("http://x/pkg1"),
            argv(&["rdfm", "install", "http://x/pkg1"])
        );
    }

    #[tokio::test]
    async fn test_authenticator_reads_stdout() {
        let authenticator = CommandAuthenticator::new(&CommandsConfig {
            install: vec![],
            authenticate: argv(&["echo", "abc.def"]),
        });
        let token = authenticator.authenticate().await.unwrap();
        assert_eq!(token.as_str(), "abc.def");
    }

    #[tokio::test]
    async fn test_failing_install_reports_uri() {
        let installer = CommandInstaller::new(&CommandsConfig {
            install: argv(&["false"]),
            authenticate: vec![],
        });
        let err = installer.install("http://x/pkg1").await.unwrap_err();
        assert!(matches!(err, CoreError::InstallFailed { ref uri, .. } if uri == "http://x/pkg1"));
    }

    #[tokio::test]
    async fn test_fixed_metadata() {
        let provider = ConfigMetadataProvider::new(&DeviceConfig {
            device_type: "rpi4".to_string(),
            artifact_version: Some("1.0.0".to_string()),
            artifact_version_command: vec![],
            network_interface: "eth0".to_string(),
            mac_address: Some("AA:BB".to_string()),
        });
        let metadata = provider.metadata().await.unwrap();
        assert_eq!(metadata, DeviceMetadata::new("rpi4", "1.0.0", "AA:BB"));
    }

    #[tokio::test]
    async fn test_version_from_command() {
        let provider = ConfigMetadataProvider::new(&DeviceConfig {
            device_type: "rpi4".to_string(),
            artifact_version: None,
            artifact_version_command: argv(&["echo", "release-2"]),
            network_interface: "eth0".to_string(),
            mac_address: Some("AA:BB".to_string()),
        });
        let metadata = provider.metadata().await.unwrap();
        assert_eq!(metadata.artifact_version, "release-2");
    }

    #[tokio::test]
    async fn test_missing_interface_is_metadata_error() {
        let provider = ConfigMetadataProvider::new(&DeviceConfig {
            device_type: "rpi4".to_string(),
            artifact_version: Some("1.0.0".to_string()),
            artifact_version_command: vec![],
            network_interface: "does-not-exist0".to_string(),
            mac_address: None,
        });
        let err = provider.metadata().await.unwrap_err();
        assert!(matches!(err, CoreError::MetadataUnavailable(_)));
    }
}
