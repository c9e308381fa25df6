//! Configuration management for the collector.
//!
//! Loads configuration from an optional TOML file. Every section has
//! defaults, so an empty file (or no file at all) is a valid configuration.

use crate::executor::manifest::{Manifest, ManifestEntry};
use crate::utils::errors::{CollectorError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Share link used when neither the CLI nor the config names one.
pub const DEFAULT_UPLOAD_URL: &str = "https://supportfiles.firemon.com/s/rGWsNfq2NZ5RFMz";

/// Environment variable holding the share password (read with `--password`).
pub const UPLOAD_PASSWORD_ENV: &str = "SUPPORT_FILES_PASSWORD";

/// Environment variable holding the device password, skipping the prompt.
pub const DEVICE_PASSWORD_ENV: &str = "JUNOS_PASSWORD";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub output: OutputConfig,
    pub upload: UploadConfig,
    pub log: LogConfig,

    /// Replaces the built-in manifest when non-empty
    pub commands: Vec<CommandConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Device hostname or IP (prompted for when absent)
    pub host: Option<String>,

    /// SSH port
    pub port: u16,

    /// Login user (prompted for when absent)
    pub username: Option<String>,

    /// Upper bound for a single command round-trip
    pub command_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Parent directory of each run's output directory
    pub root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Upload the archive after collection
    pub enabled: bool,

    /// Public share link, `<cloud>/s/<token>`
    pub url: String,

    /// Skip TLS certificate verification
    pub insecure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandConfig {
    /// Output file name
    pub name: String,

    /// Device CLI command
    pub command: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 22,
            username: None,
            command_timeout_secs: 300,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/var/tmp"),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: DEFAULT_UPLOAD_URL.to_string(),
            insecure: false,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl DeviceConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
            .map_err(|e| CollectorError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| CollectorError::Config(e.to_string()))
    }

    /// The manifest to run: the `[[commands]]` table if present, otherwise
    /// the built-in Junos manifest.
    pub fn manifest(&self) -> Result<Manifest> {
        if self.commands.is_empty() {
            return Ok(Manifest::junos_default());
        }

        Manifest::new(
            self.commands
                .iter()
                .map(|c| ManifestEntry::new(c.name.clone(), c.command.clone()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.device.port, 22);
        assert_eq!(config.device.command_timeout(), Duration::from_secs(300));
        assert!(config.device.host.is_none());
        assert_eq!(config.output.root, PathBuf::from("/var/tmp"));
        assert!(config.upload.enabled);
        assert_eq!(config.upload.url, DEFAULT_UPLOAD_URL);
        assert!(!config.upload.insecure);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::from_toml(
            r#"
[device]
host = "192.0.2.1"
username = "netops"

[upload]
enabled = false
"#,
        )
        .unwrap();

        assert_eq!(config.device.host.as_deref(), Some("192.0.2.1"));
        assert_eq!(config.device.username.as_deref(), Some("netops"));
        assert_eq!(config.device.port, 22);
        assert!(!config.upload.enabled);
        assert_eq!(config.upload.url, DEFAULT_UPLOAD_URL);
    }

    #[test]
    fn test_default_manifest_when_no_commands() {
        let config = Config::default();
        let manifest = config.manifest().unwrap();
        assert_eq!(manifest.len(), Manifest::junos_default().len());
    }

    #[test]
    fn test_commands_replace_manifest() {
        let config = Config::from_toml(
            r#"
[[commands]]
name = "version_xml"
command = "show version | display xml | no-more"

[[commands]]
name = "chassis_xml"
command = "show chassis hardware | display xml | no-more"
"#,
        )
        .unwrap();

        let manifest = config.manifest().unwrap();
        let names: Vec<&str> = manifest.iter().map(|e| e.output_name.as_str()).collect();
        assert_eq!(names, vec!["version_xml", "chassis_xml"]);
    }

    #[test]
    fn test_duplicate_command_names_rejected() {
        let config = Config::from_toml(
            r#"
[[commands]]
name = "arp_xml"
command = "show arp | display xml"

[[commands]]
name = "arp_xml"
command = "show arp no-resolve | display xml"
"#,
        )
        .unwrap();

        assert!(matches!(config.manifest(), Err(CollectorError::Manifest(_))));
    }

    #[test]
    fn test_invalid_toml() {
        let result = Config::from_toml("[device\nport = 22");
        assert!(matches!(result, Err(CollectorError::Config(_))));
    }

    #[test]
    fn test_example_config_parses() {
        let config = Config::from_toml(include_str!("../collector.example.toml")).unwrap();
        assert_eq!(config.device.host.as_deref(), Some("192.0.2.1"));
        assert!(config.commands.is_empty());
    }

    #[test]
    fn test_from_file() -> std::io::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("collector.toml");
        std::fs::write(&path, "[device]\nport = 830\n")?;

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.device.port, 830);
        Ok(())
    }
}
