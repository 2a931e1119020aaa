//! Service backend implementations.
//!
//! Each backend implements [`ServiceBackend`] for one registration mechanism.
//!
//! # Available Backends
//!
//! - [`SystemdBackend`]: unit file plus `systemctl enable`/`disable`
//! - [`SysVBackend`]: LSB init script plus `chkconfig` or `update-rc.d`
//! - [`DirectBackend`]: `start-stop-daemon` init script, no registrar
//! - [`NativeBackend`]: delegates to the platform service manager

mod direct;
mod native;
mod systemd;
mod sysv;

use std::sync::Arc;

pub use direct::DirectBackend;
pub use native::NativeBackend;
pub use systemd::SystemdBackend;
pub use sysv::{Registrar, SysVBackend};

use crate::artifact::remove_if_present;
use crate::backend::{Backend, HostContext, ServiceBackend};
use crate::error::{Result, ServiceError};
use crate::native::NativeServiceCapability;

/// Builds the backend implementation for `backend`.
///
/// # Errors
///
/// Returns [`ServiceError::Capability`] if the native backend is requested
/// without a capability.
pub fn for_backend(
    backend: Backend,
    native: Option<&Arc<dyn NativeServiceCapability>>,
) -> Result<Box<dyn ServiceBackend>> {
    Ok(match backend {
        Backend::NativeServiceManager => {
            let capability = native.ok_or_else(|| {
                ServiceError::capability("native service manager is not available on this platform")
            })?;
            Box::new(NativeBackend::new(Arc::clone(capability)))
        }
        Backend::SystemdUnit => Box::new(SystemdBackend),
        Backend::SysVInitWithChkconfig => Box::new(SysVBackend::new(Registrar::Chkconfig)),
        Backend::SysVInitWithUpdateRcD => Box::new(SysVBackend::new(Registrar::UpdateRcD)),
        Backend::SysVInitDirect => Box::new(DirectBackend),
    })
}

/// Deletes every known artifact location for `name`.
///
/// The unit path goes first, then the init script path. A missing file is
/// not an error, so removal stays idempotent whichever backend wrote it.
pub(crate) async fn remove_artifacts(name: &str, ctx: &HostContext) -> Result<()> {
    for path in [ctx.config.unit_path(name), ctx.config.init_script_path(name)] {
        remove_if_present(&path).await?;
    }
    Ok(())
}
