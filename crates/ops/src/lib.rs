#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Service lifecycle orchestration for hotswap
//!
//! This crate sits between the CLI and the platform layer. It turns the
//! four registry verbs into [`LifecycleOperation`]s, composes them into
//! [`Workflow`]s (install-and-start, stop-and-uninstall, update with
//! rollback), and hosts the running service together with the
//! [`PollingUpdater`] that triggers self-updates.

mod builder;
mod context;
mod host;
mod lifecycle;
mod updater;
mod workflow;

pub use builder::{WorkflowBuilder, STOP_AND_UNINSTALL_TIMEOUT};
pub use context::{OpsContextBuilder, OpsCtx};
pub use host::ServiceHost;
pub use lifecycle::{outcome_for, LifecycleOperation};
pub use updater::{PollingUpdater, TickOutcome, DEFAULT_CHECK_PERIOD};
pub use workflow::{
    InstallAndStart, PreviousInstance, StopAndUninstall, Update, UpdateTermination, Workflow,
};
