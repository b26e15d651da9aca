//! Linux implementation: tokio process execution and a systemd backend

pub mod process;
pub mod systemd;
pub mod unit;

pub use process::TokioProcessOperations;
pub use systemd::{running_under_systemd, SystemdServiceManager};
