//! Service-manager primitives

pub mod lookup;

use async_trait::async_trait;
use hotswap_errors::ServiceError;
use hotswap_types::{LaunchSpec, ServiceEntry, ServiceIdentity};
use std::time::Duration;

/// The native operations of an OS service manager.
///
/// Implementations report expected conditions as typed `ServiceError`
/// kinds (`NotInstalled`, `AlreadyInstalled`, `StopTimedOut`,
/// `ElevationRequired`, ...) so that callers can map them to outcomes.
/// They never retry.
#[async_trait]
pub trait ServiceManager: Send + Sync {
    /// Every registered service with its start mode
    async fn list_services(&self) -> Result<Vec<ServiceEntry>, ServiceError>;

    /// Process id backing a running service, `None` when stopped
    async fn process_id(&self, name: &str) -> Result<Option<u32>, ServiceError>;

    /// Register a new service. `elevate` permits privilege escalation.
    async fn install(
        &self,
        identity: &ServiceIdentity,
        launch: &LaunchSpec,
        elevate: bool,
    ) -> Result<(), ServiceError>;

    /// Remove a registered service. `elevate` permits privilege escalation.
    async fn uninstall(&self, identity: &ServiceIdentity, elevate: bool)
        -> Result<(), ServiceError>;

    /// Start a registered service; already running is success
    async fn start(&self, identity: &ServiceIdentity) -> Result<(), ServiceError>;

    /// Stop a registered service, giving up after `timeout`; already
    /// stopped is success
    async fn stop(&self, identity: &ServiceIdentity, timeout: Duration)
        -> Result<(), ServiceError>;

    /// Forcefully terminate a process
    async fn kill_process(&self, pid: u32) -> Result<(), ServiceError>;
}
