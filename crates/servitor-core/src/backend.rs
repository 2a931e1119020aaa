//! Backend abstraction for service registration.
//!
//! Every registration mechanism follows the same contract, so the manager
//! only asks "which backend" and then calls `install` or `remove` on it.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::artifact::ControlArtifact;
use crate::config::ManagerConfig;
use crate::descriptor::ServiceDescriptor;
use crate::error::Result;
use crate::tool::ToolRunner;

/// Registration mechanism selected for one install or remove call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Backend {
    /// The platform's own service manager (Windows SCM).
    NativeServiceManager,
    /// A systemd unit enabled with `systemctl`.
    SystemdUnit,
    /// An LSB init script registered with `chkconfig`.
    SysVInitWithChkconfig,
    /// An LSB init script registered with `update-rc.d`.
    SysVInitWithUpdateRcD,
    /// A `start-stop-daemon` init script with no registrar.
    SysVInitDirect,
}

impl Backend {
    /// Returns the backend name as a static string.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NativeServiceManager => "native",
            Self::SystemdUnit => "systemd",
            Self::SysVInitWithChkconfig => "sysv-chkconfig",
            Self::SysVInitWithUpdateRcD => "sysv-update-rc.d",
            Self::SysVInitDirect => "sysv-direct",
        }
    }

    /// Returns true if this backend writes a control artifact to disk.
    #[must_use]
    pub const fn writes_artifact(&self) -> bool {
        !matches!(self, Self::NativeServiceManager)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Host resources a backend acts on.
#[derive(Clone)]
pub struct HostContext {
    /// Artifact layout and file mode.
    pub config: ManagerConfig,
    /// Runs registration tools.
    pub runner: Arc<dyn ToolRunner>,
}

impl fmt::Debug for HostContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// One registration mechanism.
///
/// Implementations run their steps strictly in sequence and stop at the
/// first failure without undoing earlier steps.
#[async_trait]
pub trait ServiceBackend: Send + Sync {
    /// Which backend this is.
    fn kind(&self) -> Backend;

    /// Renders the artifact this backend would write, if any.
    fn render(
        &self,
        descriptor: &ServiceDescriptor,
        ctx: &HostContext,
    ) -> Result<Option<ControlArtifact>>;

    /// Registers the service.
    async fn install(&self, descriptor: &ServiceDescriptor, ctx: &HostContext) -> Result<()>;

    /// Deregisters the service and deletes its artifact.
    async fn remove(&self, name: &str, ctx: &HostContext) -> Result<()>;
}
