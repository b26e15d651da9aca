//! Single service-registry operations

use hotswap_errors::ServiceError;
use hotswap_events::{AppEvent, EventEmitter, FailureContext, LifecycleEvent};
use hotswap_types::{LaunchSpec, LifecycleVerb, Outcome, ServiceIdentity};

use crate::OpsCtx;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    Install(LaunchSpec),
    Uninstall,
    Start,
    Stop,
}

/// One verb bound to one service identity.
///
/// Install and uninstall declare whether they may escalate privileges;
/// the operation itself never escalates, it only passes the flag on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleOperation {
    action: Action,
    identity: ServiceIdentity,
    requires_elevation: bool,
}

impl LifecycleOperation {
    #[must_use]
    pub fn install(identity: ServiceIdentity, launch: LaunchSpec, requires_elevation: bool) -> Self {
        Self {
            action: Action::Install(launch),
            identity,
            requires_elevation,
        }
    }

    #[must_use]
    pub fn uninstall(identity: ServiceIdentity, requires_elevation: bool) -> Self {
        Self {
            action: Action::Uninstall,
            identity,
            requires_elevation,
        }
    }

    #[must_use]
    pub fn start(identity: ServiceIdentity) -> Self {
        Self {
            action: Action::Start,
            identity,
            requires_elevation: false,
        }
    }

    /// Stop, waiting at most the identity's stop timeout
    #[must_use]
    pub fn stop(identity: ServiceIdentity) -> Self {
        Self {
            action: Action::Stop,
            identity,
            requires_elevation: false,
        }
    }

    #[must_use]
    pub fn verb(&self) -> LifecycleVerb {
        match self.action {
            Action::Install(_) => LifecycleVerb::Install,
            Action::Uninstall => LifecycleVerb::Uninstall,
            Action::Start => LifecycleVerb::Start,
            Action::Stop => LifecycleVerb::Stop,
        }
    }

    #[must_use]
    pub fn identity(&self) -> &ServiceIdentity {
        &self.identity
    }

    #[must_use]
    pub fn requires_elevation(&self) -> bool {
        self.requires_elevation
    }

    /// Run the verb against the service manager. Never retries.
    pub async fn run(&self, ctx: &OpsCtx) -> Outcome {
        let verb = self.verb();
        let service = self.identity.name().to_string();
        ctx.emit(AppEvent::Lifecycle(LifecycleEvent::Started {
            verb,
            service: service.clone(),
            requires_elevation: self.requires_elevation,
        }));

        let result = match &self.action {
            Action::Install(launch) => {
                ctx.manager
                    .install(&self.identity, launch, self.requires_elevation)
                    .await
            }
            Action::Uninstall => {
                ctx.manager
                    .uninstall(&self.identity, self.requires_elevation)
                    .await
            }
            Action::Start => ctx.manager.start(&self.identity).await,
            Action::Stop => {
                ctx.manager
                    .stop(&self.identity, self.identity.stop_timeout())
                    .await
            }
        };

        let outcome = match result {
            Ok(()) => Outcome::Ok,
            Err(error) => {
                let outcome = outcome_for(&error);
                ctx.emit(AppEvent::Lifecycle(LifecycleEvent::Rejected {
                    verb,
                    service: service.clone(),
                    outcome,
                    failure: FailureContext::from_error(&error),
                }));
                outcome
            }
        };

        ctx.emit(AppEvent::Lifecycle(LifecycleEvent::Finished {
            verb,
            service,
            outcome,
        }));
        outcome
    }
}

/// Map a service-manager rejection onto the outcome workflows branch on
#[must_use]
pub fn outcome_for(error: &ServiceError) -> Outcome {
    match error {
        ServiceError::NotInstalled { .. } => Outcome::ServiceNotInstalled,
        ServiceError::AlreadyInstalled { .. } => Outcome::ServiceAlreadyInstalled,
        ServiceError::AlreadyRunning { .. } => Outcome::ServiceAlreadyRunning,
        ServiceError::StartFailed { .. } => Outcome::StartServiceFailed,
        ServiceError::StopFailed { .. } | ServiceError::StopTimedOut { .. } => {
            Outcome::StopServiceFailed
        }
        ServiceError::ElevationRequired { .. } => Outcome::ElevationRequired,
        _ => Outcome::Failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_map_to_outcomes() {
        let name = || "agent".to_string();
        let cases = [
            (ServiceError::NotInstalled { name: name() }, Outcome::ServiceNotInstalled),
            (ServiceError::AlreadyInstalled { name: name() }, Outcome::ServiceAlreadyInstalled),
            (
                ServiceError::StartFailed { name: name(), message: String::new() },
                Outcome::StartServiceFailed,
            ),
            (
                ServiceError::StopTimedOut { name: name(), timeout_secs: 5 },
                Outcome::StopServiceFailed,
            ),
            (
                ServiceError::ElevationRequired { operation: "install".to_string() },
                Outcome::ElevationRequired,
            ),
            (
                ServiceError::PermissionDenied {
                    operation: "install".to_string(),
                    message: "sudo: a password is required".to_string(),
                },
                Outcome::Failed,
            ),
            (ServiceError::QueryFailed { message: String::new() }, Outcome::Failed),
        ];
        for (error, expected) in cases {
            assert_eq!(outcome_for(&error), expected, "{error}");
        }
    }

    #[test]
    fn only_install_and_uninstall_carry_elevation() {
        let identity = ServiceIdentity::new("agent").unwrap();
        assert!(LifecycleOperation::uninstall(identity.clone(), true).requires_elevation());
        assert!(!LifecycleOperation::start(identity.clone()).requires_elevation());
        assert_eq!(LifecycleOperation::stop(identity).verb(), LifecycleVerb::Stop);
    }
}
