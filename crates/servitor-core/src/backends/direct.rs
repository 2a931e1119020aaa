//! Init script without a registrar.
//!
//! The script delegates to `start-stop-daemon`; linking it into runlevels
//! is left to the operator.

use async_trait::async_trait;

use super::remove_artifacts;
use crate::artifact::ControlArtifact;
use crate::backend::{Backend, HostContext, ServiceBackend};
use crate::descriptor::ServiceDescriptor;
use crate::error::Result;
use crate::template::{self, TemplateFamily};

/// `start-stop-daemon` init script, written only.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectBackend;

#[async_trait]
impl ServiceBackend for DirectBackend {
    fn kind(&self) -> Backend {
        Backend::SysVInitDirect
    }

    fn render(
        &self,
        descriptor: &ServiceDescriptor,
        ctx: &HostContext,
    ) -> Result<Option<ControlArtifact>> {
        let contents = template::render(descriptor, TemplateFamily::MinimalInitScript)?;
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
        tracing::info!(service = %descriptor.name, "init script written, no registrar");
        Ok(())
    }

    async fn remove(&self, name: &str, ctx: &HostContext) -> Result<()> {
        remove_artifacts(name, ctx).await
    }
}
