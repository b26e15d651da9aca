//! Result codes for lifecycle operations and workflows

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of running a lifecycle operation or workflow.
///
/// `Ok` is the only success value. Every other variant is a failure kind
/// with no payload; composite workflows branch on the kind alone. The
/// numeric encoding doubles as the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Ok,
    Failed,
    ElevationRequired,
    ServiceAlreadyInstalled,
    ServiceNotInstalled,
    StartServiceFailed,
    StopServiceFailed,
    ServiceAlreadyRunning,
}

impl Outcome {
    /// Every outcome, in code order.
    pub const ALL: [Outcome; 8] = [
        Self::Ok,
        Self::Failed,
        Self::ElevationRequired,
        Self::ServiceAlreadyInstalled,
        Self::ServiceNotInstalled,
        Self::StartServiceFailed,
        Self::StopServiceFailed,
        Self::ServiceAlreadyRunning,
    ];

    /// Numeric encoding, used as the process exit code
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Failed => 1,
            Self::ElevationRequired => 2,
            Self::ServiceAlreadyInstalled => 3,
            Self::ServiceNotInstalled => 4,
            Self::StartServiceFailed => 5,
            Self::StopServiceFailed => 6,
            Self::ServiceAlreadyRunning => 7,
        }
    }

    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|o| o.code() == code)
    }

    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Failed => "failed",
            Self::ElevationRequired => "elevation_required",
            Self::ServiceAlreadyInstalled => "service_already_installed",
            Self::ServiceNotInstalled => "service_not_installed",
            Self::StartServiceFailed => "start_service_failed",
            Self::StopServiceFailed => "stop_service_failed",
            Self::ServiceAlreadyRunning => "service_already_running",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_unique_and_round_trip() {
        for outcome in Outcome::ALL {
            assert_eq!(Outcome::from_code(outcome.code()), Some(outcome));
        }
        assert_eq!(Outcome::from_code(42), None);
    }

    #[test]
    fn only_ok_is_success() {
        let successes: Vec<_> = Outcome::ALL.into_iter().filter(|o| o.is_ok()).collect();
        assert_eq!(successes, vec![Outcome::Ok]);
        assert_eq!(Outcome::Ok.code(), 0);
    }
}
