//! Operations context for dependency injection

use hotswap_errors::{Error, OpsError};
use hotswap_events::{EventEmitter, EventSender};
use hotswap_platform::{ProcessOperations, ServiceManager, TokioProcessOperations};
use std::sync::Arc;

/// Operations context providing access to the service manager and the
/// event channel
#[derive(Clone)]
pub struct OpsCtx {
    /// Service-manager primitives
    pub manager: Arc<dyn ServiceManager>,
    /// Process execution for the hosted payload
    pub process: Arc<dyn ProcessOperations>,
    /// Event sender for progress reporting
    pub tx: EventSender,
}

impl EventEmitter for OpsCtx {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(&self.tx)
    }
}

/// Builder for the operations context
pub struct OpsContextBuilder {
    manager: Option<Arc<dyn ServiceManager>>,
    process: Option<Arc<dyn ProcessOperations>>,
    tx: Option<EventSender>,
}

impl OpsContextBuilder {
    /// Create new context builder
    #[must_use]
    pub fn new() -> Self {
        Self {
            manager: None,
            process: None,
            tx: None,
        }
    }

    /// Set the service manager
    #[must_use]
    pub fn with_service_manager(mut self, manager: Arc<dyn ServiceManager>) -> Self {
        self.manager = Some(manager);
        self
    }

    /// Set process operations; defaults to running commands locally
    #[must_use]
    pub fn with_process_operations(mut self, process: Arc<dyn ProcessOperations>) -> Self {
        self.process = Some(process);
        self
    }

    /// Set event sender
    #[must_use]
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Build the context
    ///
    /// # Errors
    ///
    /// Returns an error if the service manager or event sender is missing.
    pub fn build(self) -> Result<OpsCtx, Error> {
        let manager = self.manager.ok_or_else(|| OpsError::MissingComponent {
            component: "service_manager".to_string(),
        })?;

        let tx = self.tx.ok_or_else(|| OpsError::MissingComponent {
            component: "event_sender".to_string(),
        })?;

        let process = self
            .process
            .unwrap_or_else(|| Arc::new(TokioProcessOperations::new()));

        Ok(OpsCtx {
            manager,
            process,
            tx,
        })
    }
}

impl Default for OpsContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
