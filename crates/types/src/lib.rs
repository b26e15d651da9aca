#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for the hotswap service upgrade engine
//!
//! This crate provides the value types shared by every layer: service
//! identities, lifecycle outcomes, release versions and registry snapshots.

pub mod identity;
pub mod outcome;
pub mod service;
pub mod version;
pub mod workflow;

// Re-export commonly used types
pub use identity::{LaunchSpec, ServiceAccount, ServiceIdentity};
pub use outcome::Outcome;
pub use service::{RegisteredService, ServiceEntry, StartMode};
pub use version::ReleaseVersion;
pub use workflow::{LifecycleVerb, TerminalState, WorkflowKind};
