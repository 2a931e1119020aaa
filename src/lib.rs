//! Servitor: Cross-Platform Service Lifecycle Manager
//!
//! Install a program as a boot-time service on systemd, SysV init or the
//! Windows service manager, and supervise it once it runs.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use servitor::prelude::*;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let descriptor = ServiceDescriptor::new("demo-svc", "/opt/demo/run.js")
//!     .with_executable("/usr/bin/node");
//! ServiceManager::new().install(&descriptor).await?;
//! # Ok(())
//! # }
//! ```

pub use servitor_core as core;
pub use servitor_supervisor as supervisor;

/// Prelude module for common imports.
pub mod prelude {
    pub use servitor_core::{
        Backend, ControlArtifact, ManagerConfig, ServiceDescriptor, ServiceError, ServiceManager,
    };
    pub use servitor_supervisor::{OutputSinks, StopChannel, Supervisor, SupervisorError};
}
