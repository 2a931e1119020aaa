//! Native service manager backend.

use std::sync::Arc;

use async_trait::async_trait;

use crate::artifact::ControlArtifact;
use crate::backend::{Backend, HostContext, ServiceBackend};
use crate::descriptor::ServiceDescriptor;
use crate::error::{Result, ServiceError};
use crate::native::NativeServiceCapability;

/// Hands install and remove to the platform service manager.
///
/// Nothing is written to disk and capability errors pass through unchanged.
pub struct NativeBackend {
    capability: Arc<dyn NativeServiceCapability>,
}

impl NativeBackend {
    /// Wraps `capability`.
    #[must_use]
    pub fn new(capability: Arc<dyn NativeServiceCapability>) -> Self {
        Self { capability }
    }
}

impl std::fmt::Debug for NativeBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeBackend").finish_non_exhaustive()
    }
}

fn join_error(e: &tokio::task::JoinError) -> ServiceError {
    ServiceError::capability(format!("native service call aborted: {e}"))
}

#[async_trait]
impl ServiceBackend for NativeBackend {
    fn kind(&self) -> Backend {
        Backend::NativeServiceManager
    }

    fn render(
        &self,
        _descriptor: &ServiceDescriptor,
        _ctx: &HostContext,
    ) -> Result<Option<ControlArtifact>> {
        Ok(None)
    }

    async fn install(&self, descriptor: &ServiceDescriptor, _ctx: &HostContext) -> Result<()> {
        let capability = Arc::clone(&self.capability);
        let descriptor = descriptor.clone();
        tokio::task::spawn_blocking(move || capability.add(&descriptor))
            .await
            .map_err(|e| join_error(&e))?
    }

    async fn remove(&self, name: &str, _ctx: &HostContext) -> Result<()> {
        let capability = Arc::clone(&self.capability);
        let name = name.to_string();
        tokio::task::spawn_blocking(move || capability.remove(&name))
            .await
            .map_err(|e| join_error(&e))?
    }
}
