//! Update source error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum UpdateError {
    #[error("update check failed: {message}")]
    CheckFailed { message: String },

    #[error("release feed not found: {path}")]
    FeedNotFound { path: String },

    #[error("invalid release feed {path}: {message}")]
    InvalidFeed { path: String, message: String },

    #[error("no releases available")]
    NoReleases,

    #[error("failed to download release {version}: {message}")]
    DownloadFailed { version: String, message: String },

    #[error("failed to apply release {version}: {message}")]
    ApplyFailed { version: String, message: String },

    #[error("release {version} was not downloaded before apply")]
    NotStaged { version: String },

    #[error("failed to relaunch into {version}: {message}")]
    RelaunchFailed { version: String, message: String },
}

impl UserFacingError for UpdateError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::FeedNotFound { .. } => Some("Set `update.feed_dir` to a directory containing releases.json."),
            Self::InvalidFeed { .. } => Some("Fix releases.json; every entry needs `version` and `path`."),
            Self::NotStaged { .. } => Some("Download the release before applying it."),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::CheckFailed { .. } | Self::DownloadFailed { .. } | Self::FeedNotFound { .. }
        )
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::CheckFailed { .. } => "update.check_failed",
            Self::FeedNotFound { .. } => "update.feed_not_found",
            Self::InvalidFeed { .. } => "update.invalid_feed",
            Self::NoReleases => "update.no_releases",
            Self::DownloadFailed { .. } => "update.download_failed",
            Self::ApplyFailed { .. } => "update.apply_failed",
            Self::NotStaged { .. } => "update.not_staged",
            Self::RelaunchFailed { .. } => "update.relaunch_failed",
        };
        Some(code)
    }
}
