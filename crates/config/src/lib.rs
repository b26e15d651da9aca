#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for hotswap
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/hotswap/config.toml)
//! - Environment variables
//! - CLI flags (applied by the binary)

pub mod constants;

use hotswap_errors::{ConfigError, Error};
use hotswap_types::{LaunchSpec, ServiceAccount, ServiceIdentity};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub update: UpdateConfig,

    #[serde(default)]
    pub platform: PlatformConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Identity and launch settings of the managed service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base registry name; versioned instances append `-<version>`
    #[serde(default = "default_service_name")]
    pub name: String,
    #[serde(default = "default_service_name")]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub instance_name: String,
    #[serde(default)]
    pub can_pause_and_continue: bool,
    #[serde(default)]
    pub can_session_changed: bool,
    #[serde(default = "default_can_shutdown")]
    pub can_shutdown: bool,
    #[serde(default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u64,
    #[serde(default)]
    pub run_as: ServiceAccount,
    /// Payload command started by the service host; empty means none
    #[serde(default)]
    pub exec: Vec<String>,
}

/// Polling updater and release feed settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateConfig {
    #[serde(default = "default_check_period_secs")]
    pub check_period_secs: u64,
    /// Install the new instance before stopping the old one
    #[serde(default)]
    pub overlapping: bool,
    #[serde(default = "default_feed_dir")]
    pub feed_dir: PathBuf,
    #[serde(default = "default_install_root")]
    pub install_root: PathBuf,
    #[serde(default = "default_executable_name")]
    pub executable_name: String,
}

/// Service manager backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(default = "default_unit_dir")]
    pub unit_dir: PathBuf,
    /// Escalate privileged commands with `sudo -n` when not root
    #[serde(default = "default_use_sudo")]
    pub use_sudo: bool,
}

/// Log sink settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub directory: PathBuf,
    /// Always write JSON logs to a file, not only in debug or service mode
    #[serde(default)]
    pub json: bool,
}

// Default implementations

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            display_name: default_service_name(),
            description: String::new(),
            instance_name: String::new(),
            can_pause_and_continue: false,
            can_session_changed: false,
            can_shutdown: default_can_shutdown(),
            stop_timeout_secs: default_stop_timeout_secs(),
            run_as: ServiceAccount::default(),
            exec: Vec::new(),
        }
    }
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            check_period_secs: default_check_period_secs(),
            overlapping: false,
            feed_dir: default_feed_dir(),
            install_root: default_install_root(),
            executable_name: default_executable_name(),
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            unit_dir: default_unit_dir(),
            use_sudo: default_use_sudo(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_log_dir(),
            json: false,
        }
    }
}

// Default value functions for serde
fn default_service_name() -> String {
    constants::DEFAULT_SERVICE_NAME.to_string()
}

fn default_can_shutdown() -> bool {
    true
}

fn default_stop_timeout_secs() -> u64 {
    30
}

fn default_check_period_secs() -> u64 {
    30
}

fn default_feed_dir() -> PathBuf {
    PathBuf::from(constants::FEED_DIR)
}

fn default_install_root() -> PathBuf {
    PathBuf::from(constants::INSTALL_ROOT)
}

fn default_executable_name() -> String {
    constants::DEFAULT_EXECUTABLE_NAME.to_string()
}

fn default_unit_dir() -> PathBuf {
    PathBuf::from(constants::UNIT_DIR)
}

fn default_use_sudo() -> bool {
    true
}

fn default_log_dir() -> PathBuf {
    PathBuf::from(constants::LOGS_DIR)
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join("hotswap").join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        // HOTSWAP_SERVICE_NAME
        if let Ok(name) = std::env::var("HOTSWAP_SERVICE_NAME") {
            if name.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "HOTSWAP_SERVICE_NAME".to_string(),
                    value: name,
                }
                .into());
            }
            self.service.name = name;
        }

        // HOTSWAP_CHECK_PERIOD
        if let Ok(period) = std::env::var("HOTSWAP_CHECK_PERIOD") {
            self.update.check_period_secs =
                period.parse().map_err(|_| ConfigError::InvalidValue {
                    field: "HOTSWAP_CHECK_PERIOD".to_string(),
                    value: period,
                })?;
        }

        // HOTSWAP_OVERLAPPING
        if let Ok(overlapping) = std::env::var("HOTSWAP_OVERLAPPING") {
            self.update.overlapping = match overlapping.as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "HOTSWAP_OVERLAPPING".to_string(),
                        value: overlapping,
                    }
                    .into())
                }
            };
        }

        // HOTSWAP_FEED_DIR
        if let Ok(feed_dir) = std::env::var("HOTSWAP_FEED_DIR") {
            self.update.feed_dir = PathBuf::from(feed_dir);
        }

        // HOTSWAP_LOG_DIR
        if let Ok(log_dir) = std::env::var("HOTSWAP_LOG_DIR") {
            self.logging.directory = PathBuf::from(log_dir);
        }

        Ok(())
    }

    /// Check cross-field constraints that serde defaults cannot express
    ///
    /// # Errors
    ///
    /// Returns an error if the service name is empty or does not start with
    /// an alphanumeric character, or if the check period is zero.
    pub fn validate(&self) -> Result<(), Error> {
        let name = self.service.name.trim();
        if name.is_empty() {
            return Err(ConfigError::MissingField {
                field: "service.name".to_string(),
            }
            .into());
        }
        if !name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
            return Err(ConfigError::InvalidValue {
                field: "service.name".to_string(),
                value: self.service.name.clone(),
            }
            .into());
        }
        if self.update.check_period_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "update.check_period_secs".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Base identity of the managed service, before any version suffix
    ///
    /// # Errors
    ///
    /// Returns an error if the configured name is empty.
    pub fn service_identity(&self) -> Result<ServiceIdentity, Error> {
        let service = &self.service;
        Ok(ServiceIdentity::new(service.name.trim())?
            .with_display_name(&service.display_name)
            .with_description(&service.description)
            .with_instance_name(Some(service.instance_name.clone()))
            .with_flags(
                service.can_pause_and_continue,
                service.can_session_changed,
                service.can_shutdown,
            )
            .with_stop_timeout(Duration::from_secs(service.stop_timeout_secs)))
    }

    /// Launch definition for a version installed under `install_root`
    ///
    /// The service manager runs `<install_root>/app-<version>/<executable> run
    /// --unattended`, so the registered instance hosts the payload and its
    /// own updater.
    #[must_use]
    pub fn launch_spec(&self, version: &str) -> LaunchSpec {
        LaunchSpec::new(
            self.app_dir(version).join(&self.update.executable_name),
            vec!["run".to_string(), "--unattended".to_string()],
            self.service.run_as.clone(),
        )
    }

    /// Directory a promoted release lives in
    #[must_use]
    pub fn app_dir(&self, version: &str) -> PathBuf {
        self.update.install_root.join(format!("app-{version}"))
    }

    /// Directory downloaded releases are staged in
    #[must_use]
    pub fn packages_dir(&self) -> PathBuf {
        self.update.install_root.join("packages")
    }

    /// Path of the release manifest in the feed
    #[must_use]
    pub fn releases_manifest(&self) -> PathBuf {
        self.update.feed_dir.join(constants::RELEASES_FILE)
    }

    #[must_use]
    pub fn check_period(&self) -> Duration {
        Duration::from_secs(self.update.check_period_secs)
    }
}
