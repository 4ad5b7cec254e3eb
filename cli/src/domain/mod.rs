//! Domain layer — pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod artifact;
pub mod config;
pub mod error;
pub mod shell;

pub use artifact::{ChecksumStatus, ReleaseArtifacts, UpdateManifest};
pub use config::{ContainerRuntime, DeployConfig, Destination, Platform, RawConfig, SshOption};
pub use error::{ArtifactError, ConfigError, DeployError, Interrupt};
