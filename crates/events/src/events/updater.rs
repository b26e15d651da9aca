use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::FailureContext;

/// Events emitted by the background polling updater
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UpdaterEvent {
    /// The polling loop was started
    LoopStarted {
        current_version: String,
        check_period: Duration,
    },

    /// The process is attended; no polling loop was started
    SkippedAttended { current_version: String },

    /// Checking the update source failed; the loop continues
    CheckFailed {
        current_version: String,
        failure: FailureContext,
    },

    /// The source reports nothing newer than what is installed
    UpToDate { installed: String, latest: String },

    /// A newer release is available
    UpdateFound { installed: String, latest: String },

    /// Releases were downloaded and applied; a relaunch is under way
    Applied { version: String },

    /// Downloading or applying failed; the loop continues
    ApplyFailed {
        version: String,
        failure: FailureContext,
    },
}
