//! Registry snapshots returned by service lookup

use serde::{Deserialize, Serialize};

/// How the service manager launches a registered service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartMode {
    Auto,
    Manual,
    Disabled,
}

/// One row of the service registry as listed by the service manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub name: String,
    pub start_mode: StartMode,
}

/// A service resolved by lookup: its real registered name and, when it is
/// running, the process id backing it.
///
/// Snapshots are point-in-time facts and are never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredService {
    pub name: String,
    pub process_id: Option<u32>,
}
