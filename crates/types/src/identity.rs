//! Service identity and launch definitions

use hotswap_errors::ServiceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default time a stop request may take before it is considered failed.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(30);

/// Immutable description of one registered service instance.
///
/// Identities compare and hash by `name` only; every other field is
/// registration metadata that the registry does not key on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceIdentity {
    name: String,
    display_name: String,
    description: String,
    instance_name: Option<String>,
    can_pause_and_continue: bool,
    can_session_changed: bool,
    can_shutdown: bool,
    stop_timeout: Duration,
}

impl ServiceIdentity {
    /// Create an identity with the given registry name and default settings.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidIdentity` if `name` is empty or blank.
    pub fn new(name: impl Into<String>) -> Result<Self, ServiceError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ServiceError::InvalidIdentity {
                message: "service name must not be empty".to_string(),
            });
        }
        Ok(Self {
            display_name: name.clone(),
            name,
            description: String::new(),
            instance_name: None,
            can_pause_and_continue: false,
            can_session_changed: false,
            can_shutdown: false,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        })
    }

    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the instance name; blank values clear it.
    #[must_use]
    pub fn with_instance_name(mut self, instance_name: Option<String>) -> Self {
        self.instance_name = instance_name.filter(|s| !s.trim().is_empty());
        self
    }

    #[must_use]
    pub fn with_flags(
        mut self,
        can_pause_and_continue: bool,
        can_session_changed: bool,
        can_shutdown: bool,
    ) -> Self {
        self.can_pause_and_continue = can_pause_and_continue;
        self.can_session_changed = can_session_changed;
        self.can_shutdown = can_shutdown;
        self
    }

    #[must_use]
    pub fn with_stop_timeout(mut self, stop_timeout: Duration) -> Self {
        self.stop_timeout = stop_timeout;
        self
    }

    /// Derive the identity of a specific version of this service.
    ///
    /// The registry name becomes `<name>-<version>` and the display name
    /// `<display_name> (<version>)` so that two versions can be registered
    /// side by side while an update is in flight.
    #[must_use]
    pub fn versioned(&self, version: &str) -> Self {
        Self {
            name: format!("{}-{version}", self.name),
            display_name: format!("{} ({version})", self.display_name),
            ..self.clone()
        }
    }

    /// Point this identity at a different registered name, keeping every
    /// other setting.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidIdentity` if `name` is empty or blank.
    pub fn retarget(&self, name: impl Into<String>) -> Result<Self, ServiceError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ServiceError::InvalidIdentity {
                message: "service name must not be empty".to_string(),
            });
        }
        Ok(Self {
            name,
            ..self.clone()
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn instance_name(&self) -> Option<&str> {
        self.instance_name.as_deref()
    }

    #[must_use]
    pub fn can_pause_and_continue(&self) -> bool {
        self.can_pause_and_continue
    }

    #[must_use]
    pub fn can_session_changed(&self) -> bool {
        self.can_session_changed
    }

    #[must_use]
    pub fn can_shutdown(&self) -> bool {
        self.can_shutdown
    }

    #[must_use]
    pub fn stop_timeout(&self) -> Duration {
        self.stop_timeout
    }
}

impl PartialEq for ServiceIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ServiceIdentity {}

impl Hash for ServiceIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for ServiceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Account a newly installed service runs under
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ServiceAccount {
    /// The service manager's privileged default account
    #[default]
    LocalSystem,
    /// A named local or domain user
    User(String),
}

impl FromStr for ServiceAccount {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err(ServiceError::InvalidIdentity {
                message: "run-as account must not be empty".to_string(),
            }),
            "local-system" | "localsystem" | "root" => Ok(Self::LocalSystem),
            user => Ok(Self::User(user.to_string())),
        }
    }
}

impl TryFrom<String> for ServiceAccount {
    type Error = ServiceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ServiceAccount> for String {
    fn from(account: ServiceAccount) -> Self {
        account.to_string()
    }
}

impl fmt::Display for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocalSystem => f.write_str("local-system"),
            Self::User(name) => f.write_str(name),
        }
    }
}

/// What a service manager needs to register a service: the program to
/// launch, its arguments and the account to run it as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub account: ServiceAccount,
}

impl LaunchSpec {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, account: ServiceAccount) -> Self {
        Self {
            program: program.into(),
            args,
            account,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_is_rejected() {
        assert!(ServiceIdentity::new("").is_err());
        assert!(ServiceIdentity::new("   ").is_err());
    }

    #[test]
    fn versioned_identity_suffixes_name_and_display_name() {
        let base = ServiceIdentity::new("agent")
            .unwrap()
            .with_display_name("Agent")
            .with_description("does things")
            .with_flags(true, false, true);
        let v = base.versioned("1.4.0");

        assert_eq!(v.name(), "agent-1.4.0");
        assert_eq!(v.display_name(), "Agent (1.4.0)");
        assert_eq!(v.description(), "does things");
        assert!(v.can_pause_and_continue());
        assert!(v.can_shutdown());
    }

    #[test]
    fn retarget_keeps_settings() {
        let base = ServiceIdentity::new("agent")
            .unwrap()
            .with_stop_timeout(Duration::from_secs(12));
        let old = base.retarget("agent-0.9.0").unwrap();
        assert_eq!(old.name(), "agent-0.9.0");
        assert_eq!(old.stop_timeout(), Duration::from_secs(12));
        assert!(base.retarget(" ").is_err());
    }

    #[test]
    fn identities_compare_by_name_only() {
        let a = ServiceIdentity::new("agent").unwrap().with_description("a");
        let b = ServiceIdentity::new("agent")
            .unwrap()
            .with_stop_timeout(Duration::from_secs(5));
        assert_eq!(a, b);
    }

    #[test]
    fn account_parsing() {
        assert_eq!(
            "local-system".parse::<ServiceAccount>().unwrap(),
            ServiceAccount::LocalSystem
        );
        assert_eq!(
            "svc-user".parse::<ServiceAccount>().unwrap(),
            ServiceAccount::User("svc-user".to_string())
        );
        assert!("".parse::<ServiceAccount>().is_err());
    }
}
