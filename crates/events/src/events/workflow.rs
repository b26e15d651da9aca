use serde::{Deserialize, Serialize};
use hotswap_types::{Outcome, RegisteredService, TerminalState, WorkflowKind};
use uuid::Uuid;

use super::FailureContext;

/// Events for composite workflow construction and execution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkflowEvent {
    /// Registry lookup performed while building a workflow
    LookupResolved {
        pattern: String,
        exclude: Option<String>,
        resolved: Option<RegisteredService>,
    },

    /// Update plan fixed at construction time
    UpdatePlanned {
        old_service: Option<String>,
        new_service: String,
        overlapping: bool,
    },

    /// A workflow run began
    Started {
        run_id: Uuid,
        workflow: WorkflowKind,
        service: String,
    },

    /// A best-effort step ran and its outcome was deliberately ignored
    StepDiscarded { step: String, outcome: Outcome },

    /// A step was skipped because there is nothing for it to act on
    StepSkipped { step: String, reason: String },

    /// A hung service's process was killed directly
    ProcessKilled { service: String, pid: u32 },

    /// Forced termination failed
    KillFailed {
        service: String,
        pid: u32,
        failure: FailureContext,
    },

    /// A workflow reached a terminal state
    Completed {
        run_id: Uuid,
        workflow: WorkflowKind,
        terminal: TerminalState,
        outcome: Outcome,
    },
}
