//! The `releases.json` manifest

use hotswap_errors::UpdateError;
use hotswap_types::ReleaseVersion;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One release listed in a feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseEntry {
    pub version: ReleaseVersion,
    /// Release directory; relative paths are resolved against the feed
    pub path: PathBuf,
}

/// Every release a feed offers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseManifest {
    #[serde(default)]
    pub releases: Vec<ReleaseEntry>,
}

impl ReleaseManifest {
    /// Parse a manifest and resolve its paths against `feed_dir`
    ///
    /// # Errors
    ///
    /// Returns `UpdateError::InvalidFeed` if the JSON is malformed or a
    /// version does not parse.
    pub fn parse(contents: &str, feed_dir: &Path) -> Result<Self, UpdateError> {
        let mut manifest: Self =
            serde_json::from_str(contents).map_err(|e| UpdateError::InvalidFeed {
                path: feed_dir.display().to_string(),
                message: e.to_string(),
            })?;
        for release in &mut manifest.releases {
            if release.path.is_relative() {
                release.path = feed_dir.join(&release.path);
            }
        }
        manifest.releases.sort_by(|a, b| a.version.cmp(&b.version));
        Ok(manifest)
    }

    /// Newest release listed
    #[must_use]
    pub fn latest(&self) -> Option<&ReleaseEntry> {
        self.releases.last()
    }

    /// Releases strictly newer than `installed`, oldest first
    #[must_use]
    pub fn newer_than(&self, installed: &ReleaseVersion) -> Vec<ReleaseEntry> {
        self.releases
            .iter()
            .filter(|release| &release.version > installed)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "releases": [
            { "version": "1.2.0", "path": "agent-1.2.0" },
            { "version": "1.10.0", "path": "/srv/releases/agent-1.10.0" },
            { "version": "1.3.0-rc.1", "path": "agent-1.3.0-rc.1" }
        ]
    }"#;

    #[test]
    fn sorts_by_version_and_resolves_paths() {
        let manifest = ReleaseManifest::parse(MANIFEST, Path::new("/feed")).unwrap();
        let versions: Vec<String> = manifest
            .releases
            .iter()
            .map(|r| r.version.to_string())
            .collect();
        assert_eq!(versions, vec!["1.2.0", "1.3.0-rc.1", "1.10.0"]);
        assert_eq!(manifest.releases[0].path, PathBuf::from("/feed/agent-1.2.0"));
        assert_eq!(
            manifest.latest().unwrap().path,
            PathBuf::from("/srv/releases/agent-1.10.0")
        );
    }

    #[test]
    fn newer_than_excludes_installed() {
        let manifest = ReleaseManifest::parse(MANIFEST, Path::new("/feed")).unwrap();
        let newer = manifest.newer_than(&ReleaseVersion::parse("1.3.0-rc.1").unwrap());
        assert_eq!(newer.len(), 1);
        assert_eq!(newer[0].version.to_string(), "1.10.0");
    }

    #[test]
    fn malformed_manifest_is_invalid_feed() {
        let err = ReleaseManifest::parse(r#"{"releases": [{"version": "one"}]}"#, Path::new("/feed"))
            .unwrap_err();
        assert!(matches!(err, UpdateError::InvalidFeed { .. }));
    }
}
