//! Event handling and user feedback

use console::style;
use hotswap_events::{AppEvent, EventMessage, GeneralEvent, LifecycleEvent, WorkflowEvent};

use crate::logging::log_event_with_tracing;

/// Drains domain events into the log and, when someone is watching, into
/// short status lines on stderr
pub struct EventHandler {
    attended: bool,
}

impl EventHandler {
    pub fn new(attended: bool) -> Self {
        Self { attended }
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        let message = EventMessage::from_event(event);
        log_event_with_tracing(&message);

        if self.attended {
            if let Some(line) = status_line(&message.event) {
                eprintln!("{line}");
            }
        }
    }
}

fn status_line(event: &AppEvent) -> Option<String> {
    match event {
        AppEvent::Lifecycle(LifecycleEvent::Finished {
            verb,
            service,
            outcome,
        }) => {
            let mark = if outcome.is_ok() {
                style("ok").green()
            } else {
                style(outcome.as_str()).red()
            };
            Some(format!("{verb} {service}: {mark}"))
        }
        AppEvent::Lifecycle(LifecycleEvent::Rejected { failure, .. }) => {
            let hint = failure
                .hint
                .as_deref()
                .map(|h| format!(" ({h})"))
                .unwrap_or_default();
            Some(format!("  {}{hint}", style(&failure.message).dim()))
        }
        AppEvent::Workflow(WorkflowEvent::StepDiscarded { step, outcome }) if !outcome.is_ok() => {
            Some(format!("{} {step} ignored: {outcome}", style("warning:").yellow()))
        }
        AppEvent::Workflow(WorkflowEvent::ProcessKilled { service, pid }) => Some(format!(
            "{} killed {service} (pid {pid})",
            style("warning:").yellow()
        )),
        AppEvent::General(GeneralEvent::Warning { message, .. }) => {
            Some(format!("{} {message}", style("warning:").yellow()))
        }
        AppEvent::General(GeneralEvent::Error { message, .. }) => {
            Some(format!("{} {message}", style("error:").red()))
        }
        _ => None,
    }
}
