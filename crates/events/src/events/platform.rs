//! Platform command execution events

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::FailureContext;

/// Descriptor of an external command run against the service manager
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessCommandDescriptor {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

/// Platform operation events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum PlatformEvent {
    /// External command started
    CommandStarted { command: ProcessCommandDescriptor },

    /// External command exited (successfully or not)
    CommandCompleted {
        command: ProcessCommandDescriptor,
        exit_code: Option<i32>,
        duration_ms: u64,
    },

    /// External command could not be run at all
    CommandFailed {
        command: ProcessCommandDescriptor,
        failure: FailureContext,
        duration_ms: u64,
    },
}
