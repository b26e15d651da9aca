//! Structured logging integration for events
//!
//! Converts domain events into `tracing` records at the level the event
//! classifies itself as, with the event metadata attached as fields.

use hotswap_events::{
    AppEvent, EventMessage, GeneralEvent, LifecycleEvent, PlatformEvent, UpdaterEvent,
    WorkflowEvent,
};
use tracing::Level;

/// `tracing` macros need the level at compile time
macro_rules! log_at {
    ($level:expr, $($arg:tt)+) => {
        match $level {
            Level::ERROR => tracing::error!($($arg)+),
            Level::WARN => tracing::warn!($($arg)+),
            Level::INFO => tracing::info!($($arg)+),
            Level::DEBUG => tracing::debug!($($arg)+),
            _ => tracing::trace!($($arg)+),
        }
    };
}

/// Log an event with structured fields
pub fn log_event_with_tracing(message: &EventMessage) {
    let meta = &message.meta;
    let level = meta.tracing_level();
    let source = meta.source.as_str();
    let correlation = meta.correlation_id.as_deref().unwrap_or("-");

    match &message.event {
        AppEvent::General(event) => match event {
            GeneralEvent::Warning { message, context } => {
                log_at!(level, source, context = ?context, "{message}");
            }
            GeneralEvent::Error { message, details } => {
                log_at!(level, source, details = ?details, "{message}");
            }
            GeneralEvent::DebugLog { message, context } => {
                log_at!(level, source, context = ?context, "{message}");
            }
            GeneralEvent::OperationStarted { operation } => {
                log_at!(level, source, operation = %operation, "Operation started");
            }
            GeneralEvent::OperationCompleted { operation, success } => {
                log_at!(level, source, operation = %operation, success, "Operation completed");
            }
            GeneralEvent::OperationFailed { operation, error } => {
                log_at!(level, source, operation = %operation, error = %error, "Operation failed");
            }
        },

        AppEvent::Lifecycle(event) => match event {
            LifecycleEvent::Started {
                verb,
                service,
                requires_elevation,
            } => {
                log_at!(
                    level,
                    source,
                    verb = %verb,
                    service = %service,
                    requires_elevation,
                    "Service operation started"
                );
            }
            LifecycleEvent::Finished {
                verb,
                service,
                outcome,
            } => {
                log_at!(
                    level,
                    source,
                    verb = %verb,
                    service = %service,
                    outcome = %outcome,
                    code = outcome.code(),
                    "Service operation finished"
                );
            }
            LifecycleEvent::Rejected {
                verb,
                service,
                outcome,
                failure,
            } => {
                log_at!(
                    level,
                    source,
                    verb = %verb,
                    service = %service,
                    outcome = %outcome,
                    code = ?failure.code,
                    error = %failure.message,
                    hint = ?failure.hint,
                    retryable = failure.retryable,
                    "Service manager rejected operation"
                );
            }
        },

        AppEvent::Workflow(event) => match event {
            WorkflowEvent::LookupResolved {
                pattern,
                exclude,
                resolved,
            } => {
                log_at!(
                    level,
                    source,
                    pattern = %pattern,
                    exclude = ?exclude,
                    resolved = ?resolved.as_ref().map(|s| s.name.as_str()),
                    pid = ?resolved.as_ref().and_then(|s| s.process_id),
                    "Service lookup resolved"
                );
            }
            WorkflowEvent::UpdatePlanned {
                old_service,
                new_service,
                overlapping,
            } => {
                log_at!(
                    level,
                    source,
                    old_service = ?old_service,
                    new_service = %new_service,
                    overlapping,
                    "Update planned"
                );
            }
            WorkflowEvent::Started {
                workflow, service, ..
            } => {
                log_at!(
                    level,
                    source,
                    correlation,
                    workflow = %workflow,
                    service = %service,
                    "Workflow started"
                );
            }
            WorkflowEvent::StepDiscarded { step, outcome } => {
                log_at!(
                    level,
                    source,
                    step = %step,
                    outcome = %outcome,
                    "Best-effort step outcome discarded"
                );
            }
            WorkflowEvent::StepSkipped { step, reason } => {
                log_at!(level, source, step = %step, reason = %reason, "Step skipped");
            }
            WorkflowEvent::ProcessKilled { service, pid } => {
                log_at!(level, source, service = %service, pid, "Killed unresponsive service process");
            }
            WorkflowEvent::KillFailed {
                service,
                pid,
                failure,
            } => {
                log_at!(
                    level,
                    source,
                    service = %service,
                    pid,
                    error = %failure.message,
                    "Could not kill service process"
                );
            }
            WorkflowEvent::Completed {
                workflow,
                terminal,
                outcome,
                ..
            } => {
                log_at!(
                    level,
                    source,
                    correlation,
                    workflow = %workflow,
                    terminal = %terminal,
                    outcome = %outcome,
                    code = outcome.code(),
                    "Workflow completed"
                );
            }
        },

        AppEvent::Updater(event) => match event {
            UpdaterEvent::LoopStarted {
                current_version,
                check_period,
            } => {
                log_at!(
                    level,
                    source,
                    current_version = %current_version,
                    check_period_secs = check_period.as_secs(),
                    "Update polling started"
                );
            }
            UpdaterEvent::SkippedAttended { current_version } => {
                log_at!(
                    level,
                    source,
                    current_version = %current_version,
                    "Attended process, not polling for updates"
                );
            }
            UpdaterEvent::CheckFailed {
                current_version,
                failure,
            } => {
                log_at!(
                    level,
                    source,
                    current_version = %current_version,
                    code = ?failure.code,
                    error = %failure.message,
                    "Update check failed"
                );
            }
            UpdaterEvent::UpToDate { installed, latest } => {
                log_at!(level, source, installed = %installed, latest = %latest, "Up to date");
            }
            UpdaterEvent::UpdateFound { installed, latest } => {
                log_at!(level, source, installed = %installed, latest = %latest, "Update found");
            }
            UpdaterEvent::Applied { version } => {
                log_at!(level, source, version = %version, "Update applied, relaunching");
            }
            UpdaterEvent::ApplyFailed { version, failure } => {
                log_at!(
                    level,
                    source,
                    version = %version,
                    code = ?failure.code,
                    error = %failure.message,
                    hint = ?failure.hint,
                    "Applying update failed"
                );
            }
        },

        AppEvent::Platform(event) => match event {
            PlatformEvent::CommandStarted { command } => {
                log_at!(
                    level,
                    source,
                    program = %command.program,
                    args = ?command.args,
                    "Command started"
                );
            }
            PlatformEvent::CommandCompleted {
                command,
                exit_code,
                duration_ms,
            } => {
                log_at!(
                    level,
                    source,
                    program = %command.program,
                    exit_code = ?exit_code,
                    duration_ms,
                    "Command completed"
                );
            }
            PlatformEvent::CommandFailed {
                command,
                failure,
                duration_ms,
            } => {
                log_at!(
                    level,
                    source,
                    program = %command.program,
                    args = ?command.args,
                    error = %failure.message,
                    duration_ms,
                    "Command failed"
                );
            }
        },
    }
}
