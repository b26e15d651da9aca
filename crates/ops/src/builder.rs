//! Workflow construction
//!
//! Builders resolve the concrete identities a workflow acts on before any
//! step runs. Only `stop_and_uninstall` and `update` consult the registry;
//! `install_and_start` is pure.

use hotswap_errors::Error;
use hotswap_events::{AppEvent, EventEmitter, WorkflowEvent};
use hotswap_platform::lookup;
use hotswap_types::{LaunchSpec, RegisteredService, ServiceIdentity};
use std::time::Duration;

use crate::lifecycle::LifecycleOperation;
use crate::workflow::{InstallAndStart, PreviousInstance, StopAndUninstall, Update, Workflow};
use crate::OpsCtx;

/// Upper bound on how long StopAndUninstall waits for a stop
pub const STOP_AND_UNINSTALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Builds workflows for one base service identity
pub struct WorkflowBuilder<'a> {
    ctx: &'a OpsCtx,
    base: ServiceIdentity,
    requires_elevation: bool,
}

impl<'a> WorkflowBuilder<'a> {
    /// `base` is the unversioned identity; install and uninstall steps
    /// declare elevation unless told otherwise.
    #[must_use]
    pub fn new(ctx: &'a OpsCtx, base: ServiceIdentity) -> Self {
        Self {
            ctx,
            base,
            requires_elevation: true,
        }
    }

    #[must_use]
    pub fn with_elevation(mut self, requires_elevation: bool) -> Self {
        self.requires_elevation = requires_elevation;
        self
    }

    /// Install `<base>-<version>` and start it. Does not touch the OS.
    #[must_use]
    pub fn install_and_start(&self, version: &str, launch: LaunchSpec) -> Workflow {
        Workflow::InstallAndStart(self.install_and_start_parts(version, launch))
    }

    fn install_and_start_parts(&self, version: &str, launch: LaunchSpec) -> InstallAndStart {
        let identity = self.base.versioned(version);
        InstallAndStart {
            install: LifecycleOperation::install(identity.clone(), launch, self.requires_elevation),
            start: LifecycleOperation::start(identity),
        }
    }

    /// Stop and remove the registered instance of `<base>`, or of
    /// `<base>-<version>` when a version is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be queried.
    pub async fn stop_and_uninstall(&self, version: Option<&str>) -> Result<Workflow, Error> {
        let pattern = match version {
            Some(version) => self.base.versioned(version).name().to_string(),
            None => self.base.name().to_string(),
        };
        let resolved = self.resolve(&pattern, None).await?;
        let parts = self.stop_and_uninstall_parts(&pattern, resolved)?;
        Ok(Workflow::StopAndUninstall(parts))
    }

    fn stop_and_uninstall_parts(
        &self,
        requested: &str,
        resolved: Option<RegisteredService>,
    ) -> Result<StopAndUninstall, Error> {
        let (name, process_id) = match resolved {
            Some(service) => (service.name, service.process_id),
            None => (requested.to_string(), None),
        };
        let timeout = self.base.stop_timeout().min(STOP_AND_UNINSTALL_TIMEOUT);
        let identity = self.base.retarget(name)?.with_stop_timeout(timeout);

        Ok(StopAndUninstall {
            stop: LifecycleOperation::stop(identity.clone()),
            uninstall: LifecycleOperation::uninstall(identity, self.requires_elevation),
            process_id,
        })
    }

    /// Replace whatever instance of `<base>` is registered with
    /// `<base>-<version>`.
    ///
    /// With `overlapping` the new instance is installed and started before
    /// the old one is stopped.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be queried.
    pub async fn update(
        &self,
        version: &str,
        launch: LaunchSpec,
        overlapping: bool,
    ) -> Result<Workflow, Error> {
        let install_new = self.install_and_start_parts(version, launch);
        let new_name = install_new.service().to_string();

        let previous = match self.resolve(self.base.name(), Some(&new_name)).await? {
            Some(old) => {
                let identity = self.base.retarget(old.name)?;
                Some(PreviousInstance {
                    stop: LifecycleOperation::stop(identity.clone()),
                    start: LifecycleOperation::start(identity.clone()),
                    uninstall: LifecycleOperation::uninstall(identity, self.requires_elevation),
                })
            }
            None => None,
        };

        // the new instance is not registered yet, so it has no pid to kill
        let remove_new = self.stop_and_uninstall_parts(&new_name, None)?;

        self.ctx.emit(AppEvent::Workflow(WorkflowEvent::UpdatePlanned {
            old_service: previous.as_ref().map(|p| p.service().to_string()),
            new_service: new_name,
            overlapping,
        }));

        Ok(Workflow::Update(Update {
            previous,
            install_new,
            remove_new,
            overlapping,
        }))
    }

    async fn resolve(
        &self,
        pattern: &str,
        exclude: Option<&str>,
    ) -> Result<Option<RegisteredService>, Error> {
        let resolved = lookup(self.ctx.manager.as_ref(), pattern, exclude).await?;
        self.ctx.emit(AppEvent::Workflow(WorkflowEvent::LookupResolved {
            pattern: pattern.to_string(),
            exclude: exclude.map(str::to_string),
            resolved: resolved.clone(),
        }));
        Ok(resolved)
    }
}
