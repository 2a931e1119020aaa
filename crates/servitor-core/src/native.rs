//! Native service capability.
//!
//! On platforms whose OS ships its own service manager (Windows SCM), the
//! whole lifecycle goes through that manager. This module only defines the
//! contract; the platform implementation lives behind `cfg`.

use std::sync::Arc;

use crate::descriptor::ServiceDescriptor;
use crate::error::Result;

// `define_windows_service!` expands to the FFI entry point.
#[cfg(windows)]
#[allow(unsafe_code)]
mod windows;

#[cfg(windows)]
pub use self::windows::WindowsServiceCapability;

/// The platform's own service manager.
///
/// Calls are blocking; async callers move them off the runtime.
pub trait NativeServiceCapability: Send + Sync {
    /// Registers the service.
    fn add(&self, descriptor: &ServiceDescriptor) -> Result<()>;

    /// Deregisters the service.
    fn remove(&self, name: &str) -> Result<()>;

    /// Connects the running process to the service manager.
    ///
    /// Not being launched by the service manager is not an error; the
    /// process then behaves like a console program.
    fn run(&self) -> Result<()>;

    /// Reports the service stopped with `exit_code` and releases the handle.
    fn stop(&self, exit_code: i32);

    /// Returns true once per stop request received from the service manager.
    fn is_stop_requested(&self) -> bool;
}

/// Returns the native capability for this platform, if it has one.
#[must_use]
pub fn platform_capability() -> Option<Arc<dyn NativeServiceCapability>> {
    #[cfg(windows)]
    {
        Some(Arc::new(WindowsServiceCapability::new()))
    }

    #[cfg(not(windows))]
    {
        None
    }
}
