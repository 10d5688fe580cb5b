//! Configuration loading and types

use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{WrapErr, bail};
use serde::{Deserialize, Serialize};

use rdfm_core::PollerConfig;

/// Environment variable pointing at the config file
pub const CONFIG_ENV: &str = "RDFMD_CONFIG";

/// Top-level configuration for the rdfm daemon
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Logging settings
    #[serde(default)]
    pub daemon: DaemonConfig,
    /// Management server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Update polling settings
    #[serde(default)]
    pub poller: PollerSection,
    /// Device identity
    #[serde(default)]
    pub device: DeviceConfig,
    /// External commands backing installation and authentication
    #[serde(default)]
    pub commands: CommandsConfig,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Management server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server base URL
    #[serde(default = "default_server_url")]
    pub url: String,
    /// Transport-level deadline for one HTTP request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Token to use before the first handshake
    pub initial_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            request_timeout_secs: default_request_timeout_secs(),
            initial_token: None,
        }
    }
}

impl ServerConfig {
    /// Request deadline as a `Duration`
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_server_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Update polling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerSection {
    /// Seconds between update checks
    #[serde(default = "default_poll_interval")]
    pub update_poll_interval_seconds: u64,
    /// Deadline for one check or authentication attempt
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
    /// Capacity of the poller event channel
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for PollerSection {
    fn default() -> Self {
        Self {
            update_poll_interval_seconds: default_poll_interval(),
            call_timeout_secs: default_call_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_poll_interval() -> u64 {
    300
}

fn default_call_timeout_secs() -> u64 {
    60
}

fn default_event_channel_capacity() -> usize {
    64
}

/// Device identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Hardware device type reported to the server
    #[serde(default)]
    pub device_type: String,
    /// Installed artifact name, if fixed
    pub artifact_version: Option<String>,
    /// Command printing the installed artifact name
    #[serde(default)]
    pub artifact_version_command: Vec<String>,
    /// Interface whose MAC address identifies the device
    #[serde(default = "default_network_interface")]
    pub network_interface: String,
    /// Fixed network identifier overriding the interface lookup
    pub mac_address: Option<String>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_type: String::new(),
            artifact_version: None,
            artifact_version_command: Vec::new(),
            network_interface: default_network_interface(),
            mac_address: None,
        }
    }
}

fn default_network_interface() -> String {
    "eth0".to_string()
}

/// External commands
///
/// Each command is an argv list; no shell is involved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandsConfig {
    /// Installs an artifact; `{uri}` is replaced with the artifact locator
    #[serde(default)]
    pub install: Vec<String>,
    /// Prints a fresh bearer token on stdout
    #[serde(default)]
    pub authenticate: Vec<String>,
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .wrap_err_with(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// First existing config file among the standard locations
    #[must_use]
    pub fn locate() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }

        let paths = [
            Some(PathBuf::from("rdfmd.toml")),
            Some(PathBuf::from("/etc/rdfm/rdfmd.toml")),
            dirs::config_dir().map(|p| p.join("rdfm/rdfmd.toml")),
        ];

        paths.into_iter().flatten().find(|path| path.exists())
    }

    /// Check values the daemon cannot start without
    ///
    /// # Errors
    /// Returns error describing the first invalid setting
    pub fn validate(&self) -> eyre::Result<()> {
        if self.device.device_type.trim().is_empty() {
            bail!("device.device_type must be set");
        }
        if self.device.artifact_version.is_none() && self.device.artifact_version_command.is_empty()
        {
            bail!("one of device.artifact_version or device.artifact_version_command must be set");
        }
        if self.commands.install.is_empty() {
            bail!("commands.install must be set");
        }
        if self.commands.authenticate.is_empty() {
            bail!("commands.authenticate must be set");
        }
        if self.server.request_timeout_secs == 0 {
            bail!("server.request_timeout_secs must be greater than zero");
        }
        self.poller_config()
            .validate()
            .wrap_err("invalid [poller] section")?;
        Ok(())
    }

    /// Poller timing derived from the `[poller]` section
    #[must_use]
    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            poll_interval: Duration::from_secs(self.poller.update_poll_interval_seconds),
            call_timeout: Duration::from_secs(self.poller.call_timeout_secs),
            event_channel_capacity: self.poller.event_channel_capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const SAMPLE: &str = r#"
[server]
url = "https://rdfm.example.com"

[poller]
update_poll_interval_seconds = 30

[device]
device_type = "rpi4"
artifact_version = "1.0.0"
network_interface = "wlan0"

[commands]
install = ["rdfm", "install", "{uri}"]
authenticate = ["rdfm-auth", "--print-token"]
"#;

    #[test]
    fn test_load_sample() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.url, "https://rdfm.example.com");
        assert_eq!(config.server.request_timeout_secs, 30);
        assert_eq!(config.device.network_interface, "wlan0");
        assert_eq!(config.daemon.log_format, LogFormat::Pretty);
        assert!(config.validate().is_ok());

        let poller = config.poller_config();
        assert_eq!(poller.poll_interval, Duration::from_secs(30));
        assert_eq!(poller.call_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_defaults_need_device_settings() {
        let config = Config::default();
        assert_eq!(config.poller.update_poll_interval_seconds, 300);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config: Config = toml::from_str(SAMPLE).unwrap();
        config.poller.update_poll_interval_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_log_format() {
        let config: Config = toml::from_str("[daemon]\nlog_format = \"json\"\n").unwrap();
        assert_eq!(config.daemon.log_format, LogFormat::Json);
        assert_eq!(config.daemon.log_level, "info");
    }
}
