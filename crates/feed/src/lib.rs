#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Release feeds for the polling updater
//!
//! An [`UpdateSource`] answers three questions: what is running and what
//! is the newest release, fetch these releases, and switch to them. The
//! last step relaunches the process in `updated <version>` mode, which is
//! where the service upgrade workflow takes over.

pub mod directory;
pub mod manifest;

pub use directory::DirectoryFeed;
pub use manifest::{ReleaseEntry, ReleaseManifest};

use async_trait::async_trait;
use hotswap_errors::UpdateError;
use hotswap_types::ReleaseVersion;

/// Result of asking a source for updates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateInfo {
    /// Version currently running, if known
    pub current: Option<ReleaseVersion>,
    /// Newest release the source offers, if any
    pub future: Option<ReleaseEntry>,
    /// Releases newer than `current`, oldest first
    pub releases_to_apply: Vec<ReleaseEntry>,
}

impl UpdateInfo {
    /// The installed version, `0.0.0.0` when unknown
    #[must_use]
    pub fn installed_version(&self) -> ReleaseVersion {
        self.current.clone().unwrap_or_default()
    }

    /// The version on offer, `0.0.0.0` when the source is empty
    #[must_use]
    pub fn future_version(&self) -> ReleaseVersion {
        self.future
            .as_ref()
            .map(|entry| entry.version.clone())
            .unwrap_or_default()
    }

    /// Whether the offered version is strictly newer than what is installed
    #[must_use]
    pub fn has_update(&self) -> bool {
        self.future_version() > self.installed_version()
    }
}

/// Where releases come from
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Compare the running version against the newest available release
    async fn check_for_update(&self) -> Result<UpdateInfo, UpdateError>;

    /// Fetch releases into local staging
    async fn download_releases(&self, releases: &[ReleaseEntry]) -> Result<(), UpdateError>;

    /// Switch to the newest staged release and relaunch in updated mode.
    /// Returns the version relaunched into.
    async fn apply_releases(&self, info: &UpdateInfo) -> Result<ReleaseVersion, UpdateError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn entry(version: &str) -> ReleaseEntry {
        ReleaseEntry {
            version: ReleaseVersion::parse(version).unwrap(),
            path: PathBuf::from(version),
        }
    }

    #[test]
    fn unknown_current_counts_as_zero() {
        let info = UpdateInfo {
            current: None,
            future: Some(entry("0.0.1")),
            releases_to_apply: vec![entry("0.0.1")],
        };
        assert_eq!(info.installed_version(), ReleaseVersion::zero());
        assert!(info.has_update());
    }

    #[test]
    fn equal_versions_are_not_an_update() {
        let info = UpdateInfo {
            current: Some(ReleaseVersion::parse("1.2.0").unwrap()),
            future: Some(entry("1.2.0.0")),
            releases_to_apply: Vec::new(),
        };
        assert!(!info.has_update());
    }

    #[test]
    fn empty_feed_is_not_an_update() {
        let info = UpdateInfo {
            current: None,
            future: None,
            releases_to_apply: Vec::new(),
        };
        assert!(!info.has_update());
    }
}
