//! Composite workflows
//!
//! A [`Workflow`] is built once from the registry state observed at
//! construction time and then run. It is plain data until run, so two
//! workflows built from the same observations compare equal.

use hotswap_events::{AppEvent, EventEmitter, FailureContext, WorkflowEvent};
use hotswap_types::{Outcome, TerminalState, WorkflowKind};
use uuid::Uuid;

use crate::lifecycle::LifecycleOperation;
use crate::OpsCtx;

/// The closed set of runnable workflows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Workflow {
    Operation(LifecycleOperation),
    InstallAndStart(InstallAndStart),
    StopAndUninstall(StopAndUninstall),
    Update(Update),
}

impl Workflow {
    #[must_use]
    pub fn kind(&self) -> WorkflowKind {
        match self {
            Self::Operation(_) => WorkflowKind::Operation,
            Self::InstallAndStart(_) => WorkflowKind::InstallAndStart,
            Self::StopAndUninstall(_) => WorkflowKind::StopAndUninstall,
            Self::Update(_) => WorkflowKind::Update,
        }
    }

    /// Registry name of the service the workflow targets
    #[must_use]
    pub fn service(&self) -> &str {
        match self {
            Self::Operation(op) => op.identity().name(),
            Self::InstallAndStart(w) => w.service(),
            Self::StopAndUninstall(w) => w.service(),
            Self::Update(w) => w.install_new.service(),
        }
    }

    /// Run to a terminal state and report exactly one outcome
    pub async fn run(&self, ctx: &OpsCtx) -> Outcome {
        let run_id = Uuid::new_v4();
        let workflow = self.kind();
        ctx.emit(AppEvent::Workflow(WorkflowEvent::Started {
            run_id,
            workflow,
            service: self.service().to_string(),
        }));

        let (terminal, outcome) = match self {
            Self::Operation(op) => settle(op.run(ctx).await),
            Self::InstallAndStart(w) => settle(w.execute(ctx).await),
            Self::StopAndUninstall(w) => settle(w.execute(ctx).await),
            Self::Update(w) => {
                let termination = w.execute(ctx).await;
                (termination.terminal(), termination.outcome())
            }
        };

        ctx.emit(AppEvent::Workflow(WorkflowEvent::Completed {
            run_id,
            workflow,
            terminal,
            outcome,
        }));
        outcome
    }
}

fn settle(outcome: Outcome) -> (TerminalState, Outcome) {
    let terminal = if outcome.is_ok() {
        TerminalState::Done
    } else {
        TerminalState::Failed
    };
    (terminal, outcome)
}

/// Record a step whose outcome is deliberately ignored
fn discard(ctx: &OpsCtx, step: &str, outcome: Outcome) {
    ctx.emit(AppEvent::Workflow(WorkflowEvent::StepDiscarded {
        step: step.to_string(),
        outcome,
    }));
}

/// Install a versioned instance, then start it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallAndStart {
    pub(crate) install: LifecycleOperation,
    pub(crate) start: LifecycleOperation,
}

impl InstallAndStart {
    #[must_use]
    pub fn service(&self) -> &str {
        self.install.identity().name()
    }

    /// Install then start; the first non-`Ok` outcome is returned
    pub async fn execute(&self, ctx: &OpsCtx) -> Outcome {
        let installed = self.install.run(ctx).await;
        if !installed.is_ok() {
            return installed;
        }
        self.start.run(ctx).await
    }
}

/// Stop a service and remove it, killing it if it will not stop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopAndUninstall {
    pub(crate) stop: LifecycleOperation,
    pub(crate) uninstall: LifecycleOperation,
    /// Pid observed at construction time
    pub(crate) process_id: Option<u32>,
}

impl StopAndUninstall {
    #[must_use]
    pub fn service(&self) -> &str {
        self.stop.identity().name()
    }

    #[must_use]
    pub fn process_id(&self) -> Option<u32> {
        self.process_id
    }

    pub async fn execute(&self, ctx: &OpsCtx) -> Outcome {
        match self.stop.run(ctx).await {
            Outcome::Ok => self.uninstall.run(ctx).await,
            Outcome::ServiceNotInstalled => {
                ctx.emit(AppEvent::Workflow(WorkflowEvent::StepSkipped {
                    step: "uninstall".to_string(),
                    reason: format!("{} is not installed", self.service()),
                }));
                Outcome::Ok
            }
            Outcome::StopServiceFailed => self.kill_then_uninstall(ctx).await,
            other => other,
        }
    }

    async fn kill_then_uninstall(&self, ctx: &OpsCtx) -> Outcome {
        let service = self.service().to_string();
        let Some(pid) = self.process_id else {
            ctx.emit(AppEvent::Workflow(WorkflowEvent::StepSkipped {
                step: "kill".to_string(),
                reason: format!("no process id known for {service}"),
            }));
            return Outcome::StopServiceFailed;
        };

        match ctx.manager.kill_process(pid).await {
            Ok(()) => {
                ctx.emit(AppEvent::Workflow(WorkflowEvent::ProcessKilled { service, pid }));
                self.uninstall.run(ctx).await
            }
            Err(error) => {
                ctx.emit(AppEvent::Workflow(WorkflowEvent::KillFailed {
                    service,
                    pid,
                    failure: FailureContext::from_error(&error),
                }));
                Outcome::Failed
            }
        }
    }
}

/// Steps acting on the instance being replaced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviousInstance {
    pub(crate) stop: LifecycleOperation,
    pub(crate) start: LifecycleOperation,
    pub(crate) uninstall: LifecycleOperation,
}

impl PreviousInstance {
    #[must_use]
    pub fn service(&self) -> &str {
        self.stop.identity().name()
    }
}

/// Where an update ended and with which outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateTermination {
    /// New instance is live; the outcome is the old instance's uninstall.
    /// `Done` with a non-`Ok` outcome means the old one was not cleaned up.
    Done(Outcome),
    /// Stopping the old instance failed; nothing was changed
    Failed(Outcome),
    /// The new instance failed; the outcome is its failure
    RolledBack(Outcome),
}

impl UpdateTermination {
    #[must_use]
    pub fn outcome(self) -> Outcome {
        match self {
            Self::Done(o) | Self::Failed(o) | Self::RolledBack(o) => o,
        }
    }

    #[must_use]
    pub fn terminal(self) -> TerminalState {
        match self {
            Self::Done(_) => TerminalState::Done,
            Self::Failed(_) => TerminalState::Failed,
            Self::RolledBack(_) => TerminalState::RolledBack,
        }
    }
}

/// Replace the previous instance with a new version, rolling back on failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub(crate) previous: Option<PreviousInstance>,
    pub(crate) install_new: InstallAndStart,
    pub(crate) remove_new: StopAndUninstall,
    pub(crate) overlapping: bool,
}

impl Update {
    #[must_use]
    pub fn previous(&self) -> Option<&PreviousInstance> {
        self.previous.as_ref()
    }

    #[must_use]
    pub fn overlapping(&self) -> bool {
        self.overlapping
    }

    pub async fn execute(&self, ctx: &OpsCtx) -> UpdateTermination {
        if !self.overlapping {
            let stopped = self.stop_old(ctx).await;
            if !stopped.is_ok() {
                return UpdateTermination::Failed(stopped);
            }
        }

        let installed = self.install_new.execute(ctx).await;
        if installed.is_ok() {
            if self.overlapping {
                discard(ctx, "stop_old", self.stop_old(ctx).await);
            }
            return UpdateTermination::Done(self.uninstall_old(ctx).await);
        }

        if !self.overlapping {
            discard(ctx, "start_old", self.start_old(ctx).await);
        }
        discard(ctx, "stop_and_uninstall_new", self.remove_new.execute(ctx).await);
        UpdateTermination::RolledBack(installed)
    }

    async fn stop_old(&self, ctx: &OpsCtx) -> Outcome {
        match &self.previous {
            Some(previous) => previous.stop.run(ctx).await,
            None => skip_old(ctx, "stop_old"),
        }
    }

    async fn start_old(&self, ctx: &OpsCtx) -> Outcome {
        match &self.previous {
            Some(previous) => previous.start.run(ctx).await,
            None => skip_old(ctx, "start_old"),
        }
    }

    async fn uninstall_old(&self, ctx: &OpsCtx) -> Outcome {
        match &self.previous {
            Some(previous) => previous.uninstall.run(ctx).await,
            None => skip_old(ctx, "uninstall_old"),
        }
    }
}

fn skip_old(ctx: &OpsCtx, step: &str) -> Outcome {
    ctx.emit(AppEvent::Workflow(WorkflowEvent::StepSkipped {
        step: step.to_string(),
        reason: "no previous instance is registered".to_string(),
    }));
    Outcome::Ok
}
