#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Platform abstraction layer for service-manager operations.
//!
//! This crate provides:
//! - The [`ServiceManager`] primitives the lifecycle operations drive
//!   (install, uninstall, start, stop, kill, registry listing)
//! - Service lookup by name pattern over the registry listing
//! - Process execution with event emission, used by the systemd backend
//!   and by the release feed to relaunch the updated binary

pub mod core;
pub mod implementations;
pub mod process;
pub mod service;

pub use core::PlatformContext;
pub use implementations::linux::{running_under_systemd, SystemdServiceManager, TokioProcessOperations};
pub use process::{CommandOutput, PlatformCommand, ProcessOperations};
pub use service::lookup::{lookup, matches_pattern};
pub use service::ServiceManager;
