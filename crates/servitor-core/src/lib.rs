// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # servitor-core
//!
//! Install and remove long-running programs as boot-time services.
//!
//! This crate turns a [`ServiceDescriptor`] into whatever the host's init
//! system understands and registers it:
//!
//! - [`ServiceManager`] probes the host and runs install or remove
//! - [`ServiceBackend`] is implemented once per registration mechanism
//! - [`template`] renders systemd units and init scripts
//! - [`NativeServiceCapability`] is the seam to an OS service manager
//!
//! ## Backends
//!
//! | Backend | Artifact | Registrar |
//! |---------|----------|-----------|
//! | native | none | OS service manager |
//! | systemd | `<unit_dir>/<name>.service` | `systemctl enable` |
//! | sysv-chkconfig | `<init_dir>/<name>` | `chkconfig --add` |
//! | sysv-update-rc.d | `<init_dir>/<name>` | `update-rc.d defaults` |
//! | sysv-direct | `<init_dir>/<name>` | none |
//!
//! ## Example
//!
//! ```rust,no_run
//! use servitor_core::{ServiceDescriptor, ServiceManager};
//!
//! # async fn example() -> servitor_core::Result<()> {
//! let descriptor = ServiceDescriptor::new("demo-svc", "/opt/demo/run.js")
//!     .with_executable("/usr/bin/node")
//!     .with_dependency("network-online.target");
//!
//! ServiceManager::new().install(&descriptor).await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod artifact;
pub mod backend;
pub mod backends;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod manager;
pub mod native;
pub mod probe;
pub mod template;
#[cfg(test)]
pub mod tests;
pub mod tool;

pub use artifact::ControlArtifact;
pub use backend::{Backend, HostContext, ServiceBackend};
pub use backends::{DirectBackend, NativeBackend, Registrar, SysVBackend, SystemdBackend};
pub use config::ManagerConfig;
pub use descriptor::ServiceDescriptor;
pub use error::{Result, ServiceError};
pub use manager::ServiceManager;
pub use native::{NativeServiceCapability, platform_capability};
pub use probe::{BackendProber, PathLocator, ProbeResult, ToolFailure, ToolLocator};
pub use template::TemplateFamily;
pub use tool::{ProcessRunner, ToolOutput, ToolRunner};
