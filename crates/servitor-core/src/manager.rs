//! Service Manager - orchestrates install and remove.
//!
//! # Toyota Way: Jidoka (自働化)
//! Every step runs in sequence and the first failure stops the line. Nothing
//! already done is undone; the error names the step so an operator can finish
//! or clean up by hand.
//!
//! # Flow
//! ```text
//! install: probe ─▶ render ─▶ write artifact ─▶ register
//! remove:  probe ─▶ deregister ─▶ delete artifacts
//! ```
//!
//! The host is probed on every call. Nothing about an earlier install is
//! remembered; removal derives the artifact paths from the name alone.

use std::sync::Arc;

use crate::artifact::ControlArtifact;
use crate::backend::{Backend, HostContext, ServiceBackend};
use crate::backends::for_backend;
use crate::config::ManagerConfig;
use crate::descriptor::ServiceDescriptor;
use crate::error::Result;
use crate::native::{NativeServiceCapability, platform_capability};
use crate::probe::{BackendProber, PathLocator, ToolLocator};
use crate::tool::{ProcessRunner, ToolRunner};

// =============================================================================
// ServiceManager
// =============================================================================

/// Installs and removes services on the current host.
///
/// # Example
///
/// ```rust,no_run
/// use servitor_core::{ServiceDescriptor, ServiceManager};
///
/// # async fn example() -> servitor_core::Result<()> {
/// let manager = ServiceManager::new();
/// let descriptor = ServiceDescriptor::new("demo-svc", "/opt/demo/run.js")
///     .with_executable("/usr/bin/node");
/// manager.install(&descriptor).await?;
/// # Ok(())
/// # }
/// ```
pub struct ServiceManager {
    config: ManagerConfig,
    runner: Arc<dyn ToolRunner>,
    locator: Arc<dyn ToolLocator>,
    native: Option<Arc<dyn NativeServiceCapability>>,
}

impl Default for ServiceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ServiceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceManager")
            .field("config", &self.config)
            .field("native", &self.native.is_some())
            .finish_non_exhaustive()
    }
}

impl ServiceManager {
    /// Creates a manager for this host with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ManagerConfig::default())
    }

    /// Creates a manager with `config`.
    #[must_use]
    pub fn with_config(config: ManagerConfig) -> Self {
        Self {
            config,
            runner: Arc::new(ProcessRunner),
            locator: Arc::new(PathLocator::new()),
            native: platform_capability(),
        }
    }

    /// Replaces the tool runner.
    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn ToolRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Replaces the tool locator used while probing.
    #[must_use]
    pub fn with_locator(mut self, locator: Arc<dyn ToolLocator>) -> Self {
        self.locator = locator;
        self
    }

    /// Replaces the native capability (`None` disables it).
    #[must_use]
    pub fn with_native(mut self, native: Option<Arc<dyn NativeServiceCapability>>) -> Self {
        self.native = native;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ManagerConfig {
        &self.config
    }

    fn host(&self) -> HostContext {
        HostContext {
            config: self.config.clone(),
            runner: Arc::clone(&self.runner),
        }
    }

    /// Probes the host and returns the backend install and remove would use.
    ///
    /// A configured override is confirmed instead of probed. The
    /// configuration is validated first.
    pub async fn select_backend(&self) -> Result<Backend> {
        self.config.validate()?;

        let prober = BackendProber::new(
            &self.config.unit_dir,
            self.locator.as_ref(),
            self.native.is_some(),
        );

        let backend = match self.config.backend {
            Some(requested) => prober.confirm(requested).await?,
            None => prober.probe().await?,
        };

        tracing::debug!(backend = %backend, "selected backend");
        Ok(backend)
    }

    async fn backend(&self) -> Result<Box<dyn ServiceBackend>> {
        let backend = self.select_backend().await?;
        for_backend(backend, self.native.as_ref())
    }

    /// Registers `descriptor` with the host so it starts at boot.
    ///
    /// # Errors
    ///
    /// Returns the first failing step: probing, rendering, writing the
    /// artifact, or running the registrar. An artifact written before a
    /// registrar failure stays on disk.
    pub async fn install(&self, descriptor: &ServiceDescriptor) -> Result<()> {
        let backend = self.backend().await?;
        tracing::info!(service = %descriptor.name, backend = %backend.kind(), "installing service");

        backend.install(descriptor, &self.host()).await?;

        tracing::info!(service = %descriptor.name, backend = %backend.kind(), "installed service");
        Ok(())
    }

    /// Deregisters `name` and deletes its artifacts.
    ///
    /// Removing a service whose artifact is already gone succeeds as long as
    /// the registrar does.
    pub async fn remove(&self, name: &str) -> Result<()> {
        let backend = self.backend().await?;
        tracing::info!(service = %name, backend = %backend.kind(), "removing service");

        backend.remove(name, &self.host()).await?;

        tracing::info!(service = %name, backend = %backend.kind(), "removed service");
        Ok(())
    }

    /// Renders the artifact `install` would write, without writing it.
    ///
    /// Returns `None` on the native platform, which has no artifact.
    pub async fn render(&self, descriptor: &ServiceDescriptor) -> Result<Option<ControlArtifact>> {
        let backend = self.backend().await?;
        backend.render(descriptor, &self.host())
    }
}
