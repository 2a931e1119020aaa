//! SysV init backend with a runlevel registrar.
//!
//! Writes an LSB init script to `<init_dir>/<name>` and hands it to
//! `chkconfig` (Red Hat family) or `update-rc.d` (Debian family). When
//! `chkconfig` turns out to be absent at spawn time, `update-rc.d` is tried
//! instead. Any other `chkconfig` failure ends the operation.

use async_trait::async_trait;

use super::remove_artifacts;
use crate::artifact::ControlArtifact;
use crate::backend::{Backend, HostContext, ServiceBackend};
use crate::descriptor::ServiceDescriptor;
use crate::error::Result;
use crate::probe::{CHKCONFIG, UPDATE_RC_D};
use crate::template::{self, TemplateFamily};
use crate::tool::{ToolRunner, invoke};

/// Tool that links an init script into the runlevels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registrar {
    /// `chkconfig --add` / `--del`, falling back to `update-rc.d`.
    Chkconfig,
    /// `update-rc.d defaults` / `remove`.
    UpdateRcD,
}

/// LSB init script plus a runlevel registrar.
#[derive(Debug, Clone, Copy)]
pub struct SysVBackend {
    registrar: Registrar,
}

impl SysVBackend {
    /// Creates the backend for `registrar`.
    #[must_use]
    pub const fn new(registrar: Registrar) -> Self {
        Self { registrar }
    }

    /// The registrar in use.
    #[must_use]
    pub const fn registrar(&self) -> Registrar {
        self.registrar
    }

    async fn register(&self, runner: &dyn ToolRunner, name: &str) -> Result<()> {
        if self.registrar == Registrar::Chkconfig {
            match invoke(runner, CHKCONFIG, &["--add", name]).await {
                Err(e) if e.is_fallback() => {
                    tracing::info!(service = %name, "chkconfig not found, falling back to update-rc.d");
                }
                other => return other,
            }
        }
        invoke(runner, UPDATE_RC_D, &[name, "defaults"]).await
    }

    async fn deregister(&self, runner: &dyn ToolRunner, name: &str) -> Result<()> {
        if self.registrar == Registrar::Chkconfig {
            match invoke(runner, CHKCONFIG, &["--del", name]).await {
                Err(e) if e.is_fallback() => {
                    tracing::info!(service = %name, "chkconfig not found, falling back to update-rc.d");
                }
                other => return other,
            }
        }
        invoke(runner, UPDATE_RC_D, &[name, "remove"]).await
    }
}

#[async_trait]
impl ServiceBackend for SysVBackend {
    fn kind(&self) -> Backend {
        match self.registrar {
            Registrar::Chkconfig => Backend::SysVInitWithChkconfig,
            Registrar::UpdateRcD => Backend::SysVInitWithUpdateRcD,
        }
    }

    fn render(
        &self,
        descriptor: &ServiceDescriptor,
        ctx: &HostContext,
    ) -> Result<Option<ControlArtifact>> {
        let contents = template::render(descriptor, TemplateFamily::LsbInitScript)?;
        Ok(Some(ControlArtifact::new(
            ctx.config.init_script_path(&descriptor.name),
            contents,
            ctx.config.file_mode,
        )))
    }

    async fn install(&self, descriptor: &ServiceDescriptor, ctx: &HostContext) -> Result<()> {
        if let Some(artifact) = self.render(descriptor, ctx)? {
            artifact.write().await?;
        }

        tracing::info!(service = %descriptor.name, registrar = ?self.registrar, "registering init script");
        self.register(ctx.runner.as_ref(), &descriptor.name).await
    }

    async fn remove(&self, name: &str, ctx: &HostContext) -> Result<()> {
        tracing::info!(service = %name, registrar = ?self.registrar, "deregistering init script");
        self.deregister(ctx.runner.as_ref(), name).await?;
        remove_artifacts(name, ctx).await
    }
}
