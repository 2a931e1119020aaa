//! systemd backend.
//!
//! Writes `<unit_dir>/<name>.service` and enables it with `systemctl`.

use async_trait::async_trait;

use super::remove_artifacts;
use crate::artifact::ControlArtifact;
use crate::backend::{Backend, HostContext, ServiceBackend};
use crate::descriptor::ServiceDescriptor;
use crate::error::Result;
use crate::probe::SYSTEMCTL;
use crate::template::{self, TemplateFamily};
use crate::tool::invoke;

/// Unit file plus `systemctl enable`/`disable`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemdBackend;

#[async_trait]
impl ServiceBackend for SystemdBackend {
    fn kind(&self) -> Backend {
        Backend::SystemdUnit
    }

    fn render(
        &self,
        descriptor: &ServiceDescriptor,
        ctx: &HostContext,
    ) -> Result<Option<ControlArtifact>> {
        let contents = template::render(descriptor, TemplateFamily::SystemdUnit)?;
        Ok(Some(ControlArtifact::new(
            ctx.config.unit_path(&descriptor.name),
            contents,
            ctx.config.file_mode,
        )))
    }

    async fn install(&self, descriptor: &ServiceDescriptor, ctx: &HostContext) -> Result<()> {
        if let Some(artifact) = self.render(descriptor, ctx)? {
            artifact.write().await?;
        }

        tracing::info!(service = %descriptor.name, "enabling systemd unit");
        invoke(ctx.runner.as_ref(), SYSTEMCTL, &["enable", &descriptor.name]).await
    }

    async fn remove(&self, name: &str, ctx: &HostContext) -> Result<()> {
        tracing::info!(service = %name, "disabling systemd unit");
        invoke(ctx.runner.as_ref(), SYSTEMCTL, &["disable", name]).await?;
        remove_artifacts(name, ctx).await
    }
}
