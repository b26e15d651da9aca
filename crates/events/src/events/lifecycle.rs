use serde::{Deserialize, Serialize};
use hotswap_types::{LifecycleVerb, Outcome};

use super::FailureContext;

/// Events for single service-registry operations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LifecycleEvent {
    /// A verb is about to be sent to the service manager
    Started {
        verb: LifecycleVerb,
        service: String,
        requires_elevation: bool,
    },

    /// The verb returned; `outcome` is what the workflow will branch on
    Finished {
        verb: LifecycleVerb,
        service: String,
        outcome: Outcome,
    },

    /// The service manager rejected the verb; carries the detail that the
    /// outcome code cannot
    Rejected {
        verb: LifecycleVerb,
        service: String,
        outcome: Outcome,
        failure: FailureContext,
    },
}
