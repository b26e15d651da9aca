use serde::{Deserialize, Serialize};

use crate::EventSource;
use hotswap_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    /// Stable error code (`service.not_installed`, `update.check_failed`, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    /// Optional remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether retrying the operation might succeed.
    pub retryable: bool,
}

impl FailureContext {
    #[must_use]
    pub fn new(
        code: Option<impl Into<String>>,
        message: impl Into<String>,
        hint: Option<impl Into<String>>,
        retryable: bool,
    ) -> Self {
        Self {
            code: code.map(Into::into),
            message: message.into(),
            hint: hint.map(Into::into),
            retryable,
        }
    }

    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self::new(
            error.user_code(),
            error.user_message().into_owned(),
            error.user_hint(),
            error.is_retryable(),
        )
    }
}

pub mod general;
pub mod lifecycle;
pub mod platform;
pub mod updater;
pub mod workflow;

pub use general::*;
pub use lifecycle::*;
pub use platform::*;
pub use updater::*;
pub use workflow::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// General utility events (warnings, errors, operations)
    General(GeneralEvent),

    /// Single install/uninstall/start/stop operations
    Lifecycle(LifecycleEvent),

    /// Composite workflows and their state machines
    Workflow(WorkflowEvent),

    /// Background polling updater
    Updater(UpdaterEvent),

    /// External commands run against the service manager
    Platform(PlatformEvent),
}

impl AppEvent {
    /// Identify the source domain for this event (used for metadata/logging).
    #[must_use]
    pub fn event_source(&self) -> EventSource {
        match self {
            Self::General(_) => EventSource::GENERAL,
            Self::Lifecycle(_) => EventSource::LIFECYCLE,
            Self::Workflow(_) => EventSource::WORKFLOW,
            Self::Updater(_) => EventSource::UPDATER,
            Self::Platform(_) => EventSource::PLATFORM,
        }
    }

    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            Self::General(GeneralEvent::Error { .. } | GeneralEvent::OperationFailed { .. })
            | Self::Lifecycle(LifecycleEvent::Rejected { .. })
            | Self::Workflow(WorkflowEvent::KillFailed { .. })
            | Self::Platform(PlatformEvent::CommandFailed { .. }) => Level::ERROR,

            Self::Workflow(WorkflowEvent::Completed { outcome, .. }) if !outcome.is_ok() => {
                Level::ERROR
            }

            Self::General(GeneralEvent::Warning { .. })
            | Self::Workflow(
                WorkflowEvent::StepDiscarded { .. } | WorkflowEvent::ProcessKilled { .. },
            )
            | Self::Updater(UpdaterEvent::CheckFailed { .. } | UpdaterEvent::ApplyFailed { .. }) => {
                Level::WARN
            }

            Self::General(GeneralEvent::DebugLog { .. })
            | Self::Lifecycle(LifecycleEvent::Started { .. })
            | Self::Workflow(WorkflowEvent::LookupResolved { .. } | WorkflowEvent::StepSkipped { .. })
            | Self::Updater(UpdaterEvent::UpToDate { .. } | UpdaterEvent::SkippedAttended { .. })
            | Self::Platform(PlatformEvent::CommandStarted { .. }) => Level::DEBUG,

            Self::Platform(PlatformEvent::CommandCompleted { .. }) => Level::TRACE,

            _ => Level::INFO,
        }
    }

    /// Get the log target for this event (for structured logging)
    #[must_use]
    pub fn log_target(&self) -> &'static str {
        match self {
            Self::General(_) => "hotswap::events::general",
            Self::Lifecycle(_) => "hotswap::events::lifecycle",
            Self::Workflow(_) => "hotswap::events::workflow",
            Self::Updater(_) => "hotswap::events::updater",
            Self::Platform(_) => "hotswap::events::platform",
        }
    }

    /// Workflow run this event belongs to, when it carries one
    #[must_use]
    pub fn run_id(&self) -> Option<uuid::Uuid> {
        match self {
            Self::Workflow(
                WorkflowEvent::Started { run_id, .. } | WorkflowEvent::Completed { run_id, .. },
            ) => Some(*run_id),
            _ => None,
        }
    }

    /// Registry name of the service this event is about, if any
    #[must_use]
    pub fn service(&self) -> Option<&str> {
        match self {
            Self::Lifecycle(
                LifecycleEvent::Started { service, .. }
                | LifecycleEvent::Finished { service, .. }
                | LifecycleEvent::Rejected { service, .. },
            )
            | Self::Workflow(
                WorkflowEvent::Started { service, .. }
                | WorkflowEvent::ProcessKilled { service, .. }
                | WorkflowEvent::KillFailed { service, .. },
            ) => Some(service),
            Self::Workflow(WorkflowEvent::UpdatePlanned { new_service, .. }) => Some(new_service),
            _ => None,
        }
    }

    /// Get structured fields for logging
    #[must_use]
    pub fn log_fields(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}
