//! A release feed backed by a local (or mounted) directory

use async_trait::async_trait;
use hotswap_errors::UpdateError;
use hotswap_events::{EventEmitter, EventSender};
use hotswap_platform::{PlatformCommand, PlatformContext, ProcessOperations};
use hotswap_types::ReleaseVersion;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::manifest::{ReleaseEntry, ReleaseManifest};
use crate::{UpdateInfo, UpdateSource};

const MANIFEST_FILE: &str = "releases.json";

/// Releases listed in `<feed_dir>/releases.json`, staged under
/// `<install_root>/packages/<version>` and promoted to
/// `<install_root>/app-<version>`.
pub struct DirectoryFeed {
    feed_dir: PathBuf,
    install_root: PathBuf,
    executable_name: String,
    current: Option<ReleaseVersion>,
    transient: Option<TransientRelaunch>,
    process: Arc<dyn ProcessOperations>,
    ctx: PlatformContext,
}

/// Relaunch through `systemd-run` instead of as a direct child
#[derive(Debug, Clone)]
struct TransientRelaunch {
    service: String,
    use_sudo: bool,
}

impl DirectoryFeed {
    #[must_use]
    pub fn new(
        feed_dir: impl Into<PathBuf>,
        install_root: impl Into<PathBuf>,
        executable_name: impl Into<String>,
        process: Arc<dyn ProcessOperations>,
        ctx: PlatformContext,
    ) -> Self {
        Self {
            feed_dir: feed_dir.into(),
            install_root: install_root.into(),
            executable_name: executable_name.into(),
            current: None,
            transient: None,
            process,
            ctx,
        }
    }

    /// Record the version the running process was built as
    #[must_use]
    pub fn with_current_version(mut self, current: Option<ReleaseVersion>) -> Self {
        self.current = current;
        self
    }

    /// Relaunch `updated` as the transient unit `relaunch-<service>-<version>`.
    ///
    /// Needed when the running process belongs to a systemd unit: stopping
    /// that unit kills its whole cgroup, including a plain child.
    #[must_use]
    pub fn with_transient_relaunch(mut self, service: impl Into<String>, use_sudo: bool) -> Self {
        self.transient = Some(TransientRelaunch {
            service: service.into(),
            use_sudo,
        });
        self
    }

    fn relaunch_command(&self, app_dir: &Path, version: &ReleaseVersion) -> PlatformCommand {
        let exe = app_dir.join(&self.executable_name);
        let mut relaunch = self.process.create_command(&exe.to_string_lossy());
        relaunch
            .args(["updated", version.to_string().as_str()])
            .current_dir(app_dir);

        match &self.transient {
            None => relaunch,
            Some(transient) => {
                let unit = format!("relaunch-{}-{version}", transient.service);
                let wrapped = relaunch.in_transient_unit(&unit);
                if transient.use_sudo {
                    wrapped.with_sudo()
                } else {
                    wrapped
                }
            }
        }
    }

    #[must_use]
    pub fn staging_dir(&self, version: &ReleaseVersion) -> PathBuf {
        self.install_root.join("packages").join(version.to_string())
    }

    #[must_use]
    pub fn app_dir(&self, version: &ReleaseVersion) -> PathBuf {
        self.install_root.join(format!("app-{version}"))
    }

    async fn read_manifest(&self) -> Result<ReleaseManifest, UpdateError> {
        let path = self.feed_dir.join(MANIFEST_FILE);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(UpdateError::FeedNotFound {
                    path: path.display().to_string(),
                })
            }
            Err(e) => {
                return Err(UpdateError::CheckFailed {
                    message: format!("{}: {e}", path.display()),
                })
            }
        };
        ReleaseManifest::parse(&contents, &self.feed_dir)
    }
}

/// Recursively copy `src` into `dst`, recreating symlinks as symlinks
fn copy_tree(src: &Path, dst: &Path) -> io::Result<u64> {
    let mut copied = 0;
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(io::Error::other)?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(io::Error::other)?;
        let target = dst.join(rel);

        let file_type = entry.file_type();
        if file_type.is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            let link = std::fs::read_link(entry.path())?;
            #[cfg(unix)]
            std::os::unix::fs::symlink(&link, &target)?;
            #[cfg(not(unix))]
            std::fs::copy(entry.path().parent().unwrap_or(src).join(&link), &target)?;
            copied += 1;
        } else {
            std::fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

async fn remove_dir_if_exists(path: &Path) -> io::Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[async_trait]
impl UpdateSource for DirectoryFeed {
    async fn check_for_update(&self) -> Result<UpdateInfo, UpdateError> {
        let manifest = self.read_manifest().await?;
        let installed = self.current.clone().unwrap_or_default();

        Ok(UpdateInfo {
            current: self.current.clone(),
            future: manifest.latest().cloned(),
            releases_to_apply: manifest.newer_than(&installed),
        })
    }

    async fn download_releases(&self, releases: &[ReleaseEntry]) -> Result<(), UpdateError> {
        for release in releases {
            let version = release.version.to_string();
            let failed = |message: String| UpdateError::DownloadFailed {
                version: version.clone(),
                message,
            };

            let staging = self.staging_dir(&release.version);
            remove_dir_if_exists(&staging)
                .await
                .map_err(|e| failed(e.to_string()))?;

            let src = release.path.clone();
            let dst = staging.clone();
            let copied = tokio::task::spawn_blocking(move || copy_tree(&src, &dst))
                .await
                .map_err(|e| failed(e.to_string()))?
                .map_err(|e| failed(format!("{}: {e}", release.path.display())))?;

            self.emit_debug(format!(
                "staged release {version} ({copied} files) in {}",
                staging.display()
            ));
        }
        Ok(())
    }

    async fn apply_releases(&self, info: &UpdateInfo) -> Result<ReleaseVersion, UpdateError> {
        // full releases, not deltas: only the newest one needs promoting
        let latest = info
            .releases_to_apply
            .last()
            .ok_or(UpdateError::NoReleases)?;
        let version = latest.version.clone();
        let failed = |message: String| UpdateError::ApplyFailed {
            version: version.to_string(),
            message,
        };

        let staging = self.staging_dir(&version);
        if !tokio::fs::try_exists(&staging).await.unwrap_or(false) {
            return Err(UpdateError::NotStaged {
                version: version.to_string(),
            });
        }

        let app_dir = self.app_dir(&version);
        remove_dir_if_exists(&app_dir)
            .await
            .map_err(|e| failed(e.to_string()))?;
        tokio::fs::rename(&staging, &app_dir)
            .await
            .map_err(|e| failed(format!("promote {}: {e}", staging.display())))?;

        for older in &info.releases_to_apply[..info.releases_to_apply.len() - 1] {
            if let Err(e) = remove_dir_if_exists(&self.staging_dir(&older.version)).await {
                self.emit_warning(format!("could not clean staged {}: {e}", older.version));
            }
        }

        let relaunch = self.relaunch_command(&app_dir, &version);
        self.process
            .spawn_detached(&self.ctx, relaunch)
            .await
            .map_err(|e| UpdateError::RelaunchFailed {
                version: version.to_string(),
                message: e.to_string(),
            })?;

        Ok(version)
    }
}

impl EventEmitter for DirectoryFeed {
    fn event_sender(&self) -> Option<&EventSender> {
        self.ctx.event_sender()
    }
}
