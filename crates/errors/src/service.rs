//! Service manager error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

/// Errors raised by service-manager primitives and registry queries
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum ServiceError {
    #[error("service not installed: {name}")]
    NotInstalled { name: String },

    #[error("service already installed: {name}")]
    AlreadyInstalled { name: String },

    #[error("service already running: {name}")]
    AlreadyRunning { name: String },

    #[error("failed to start service {name}: {message}")]
    StartFailed { name: String, message: String },

    #[error("failed to stop service {name}: {message}")]
    StopFailed { name: String, message: String },

    #[error("service {name} did not stop within {timeout_secs}s")]
    StopTimedOut { name: String, timeout_secs: u64 },

    #[error("elevation required: {operation}")]
    ElevationRequired { operation: String },

    #[error("permission denied: {operation} - {message}")]
    PermissionDenied { operation: String, message: String },

    #[error("command execution failed: {command} - {message}")]
    CommandFailed { command: String, message: String },

    #[error("service query failed: {message}")]
    QueryFailed { message: String },

    #[error("failed to kill process {pid}: {message}")]
    KillFailed { pid: u32, message: String },

    #[error("invalid service identity: {message}")]
    InvalidIdentity { message: String },
}

impl UserFacingError for ServiceError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::NotInstalled { .. } => Some("Install the service first with `hotswap install <version>`."),
            Self::ElevationRequired { .. } | Self::PermissionDenied { .. } => {
                Some("Re-run as root or enable `platform.use_sudo` with passwordless sudo.")
            }
            Self::StopTimedOut { .. } | Self::StopFailed { .. } => {
                Some("Inspect the service logs; a hung service may need to be killed manually.")
            }
            Self::QueryFailed { .. } | Self::CommandFailed { .. } => {
                Some("Check that the service manager is available on this host.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StopTimedOut { .. } | Self::QueryFailed { .. } | Self::CommandFailed { .. }
        )
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::NotInstalled { .. } => "service.not_installed",
            Self::AlreadyInstalled { .. } => "service.already_installed",
            Self::AlreadyRunning { .. } => "service.already_running",
            Self::StartFailed { .. } => "service.start_failed",
            Self::StopFailed { .. } => "service.stop_failed",
            Self::StopTimedOut { .. } => "service.stop_timed_out",
            Self::ElevationRequired { .. } => "service.elevation_required",
            Self::PermissionDenied { .. } => "service.permission_denied",
            Self::CommandFailed { .. } => "service.command_failed",
            Self::QueryFailed { .. } => "service.query_failed",
            Self::KillFailed { .. } => "service.kill_failed",
            Self::InvalidIdentity { .. } => "service.invalid_identity",
        };
        Some(code)
    }
}
