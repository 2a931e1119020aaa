//! Windows Service Control Manager capability.

use std::ffi::OsString;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::Duration;

use parking_lot::{Mutex, const_mutex};
use windows_service::define_windows_service;
use windows_service::service::{
    ServiceAccess, ServiceControl, ServiceControlAccept, ServiceDependency, ServiceErrorControl,
    ServiceExitCode, ServiceInfo, ServiceStartType, ServiceState, ServiceStatus, ServiceType,
};
use windows_service::service_control_handler::{
    self, ServiceControlHandlerResult, ServiceStatusHandle,
};
use windows_service::service_dispatcher;
use windows_service::service_manager::{ServiceManager, ServiceManagerAccess};

use super::NativeServiceCapability;
use crate::descriptor::ServiceDescriptor;
use crate::error::{Result, ServiceError};

// The SCM calls back into plain functions, so dispatcher state is static.
static STOP_REQUESTED: AtomicBool = AtomicBool::new(false);
static STATUS_HANDLE: Mutex<Option<ServiceStatusHandle>> = const_mutex(None);
static RELEASE: Mutex<Option<mpsc::Sender<()>>> = const_mutex(None);

define_windows_service!(ffi_service_main, service_main);

fn service_main(_arguments: Vec<OsString>) {
    let event_handler = |control| match control {
        ServiceControl::Stop | ServiceControl::Shutdown => {
            set_status(ServiceState::StopPending, 0);
            STOP_REQUESTED.store(true, Ordering::SeqCst);
            ServiceControlHandlerResult::NoError
        }
        ServiceControl::Interrogate => ServiceControlHandlerResult::NoError,
        _ => ServiceControlHandlerResult::NotImplemented,
    };

    let handle = match service_control_handler::register("", event_handler) {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!(error = %e, "RegisterServiceCtrlHandler() failed");
            return;
        }
    };

    let (release_tx, release_rx) = mpsc::channel();
    *STATUS_HANDLE.lock() = Some(handle);
    *RELEASE.lock() = Some(release_tx);

    set_status(ServiceState::Running, 0);

    // Returning from service_main ends the dispatcher; hold it until stop().
    let _ = release_rx.recv();
}

fn set_status(state: ServiceState, exit_code: u32) {
    let slot = STATUS_HANDLE.lock();
    let Some(handle) = slot.as_ref() else {
        return;
    };

    let controls_accepted = if state == ServiceState::Running {
        ServiceControlAccept::STOP | ServiceControlAccept::SHUTDOWN
    } else {
        ServiceControlAccept::empty()
    };
    let exit_code = if exit_code == 0 {
        ServiceExitCode::Win32(0)
    } else {
        ServiceExitCode::ServiceSpecific(exit_code)
    };

    let status = ServiceStatus {
        service_type: ServiceType::OWN_PROCESS,
        current_state: state,
        controls_accepted,
        exit_code,
        checkpoint: 0,
        wait_hint: Duration::from_secs(10),
        process_id: None,
    };

    if let Err(e) = handle.set_service_status(status) {
        tracing::warn!(error = %e, "SetServiceStatus() failed");
    }
}

/// Service registration and control through the Windows SCM.
#[derive(Debug, Default)]
pub struct WindowsServiceCapability {
    _private: (),
}

impl WindowsServiceCapability {
    /// Creates the capability.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    fn open_manager(access: ServiceManagerAccess) -> Result<ServiceManager> {
        ServiceManager::local_computer(None::<&str>, access)
            .map_err(|e| ServiceError::capability(format!("OpenSCManager() failed: {e}")))
    }
}

impl NativeServiceCapability for WindowsServiceCapability {
    fn add(&self, descriptor: &ServiceDescriptor) -> Result<()> {
        let manager =
            Self::open_manager(ServiceManagerAccess::CONNECT | ServiceManagerAccess::CREATE_SERVICE)?;

        let mut launch_arguments: Vec<OsString> =
            descriptor.executable_args.iter().map(OsString::from).collect();
        launch_arguments.push(descriptor.program_path.clone().into_os_string());
        launch_arguments.extend(descriptor.program_args.iter().map(OsString::from));

        let info = ServiceInfo {
            name: OsString::from(&descriptor.name),
            display_name: OsString::from(descriptor.display_name()),
            service_type: ServiceType::OWN_PROCESS,
            start_type: ServiceStartType::AutoStart,
            error_control: ServiceErrorControl::Normal,
            executable_path: descriptor.executable_path.clone(),
            launch_arguments,
            dependencies: descriptor
                .dependencies
                .iter()
                .map(|d| ServiceDependency::Service(OsString::from(d)))
                .collect(),
            account_name: descriptor.username.as_ref().map(OsString::from),
            account_password: descriptor.password.as_ref().map(OsString::from),
        };

        manager
            .create_service(&info, ServiceAccess::QUERY_STATUS)
            .map_err(|e| ServiceError::capability(format!("CreateService() failed: {e}")))?;
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        let manager = Self::open_manager(ServiceManagerAccess::CONNECT)?;
        let service = manager
            .open_service(name, ServiceAccess::DELETE)
            .map_err(|e| ServiceError::capability(format!("OpenService() failed: {e}")))?;
        service
            .delete()
            .map_err(|e| ServiceError::capability(format!("DeleteService() failed: {e}")))
    }

    fn run(&self) -> Result<()> {
        std::thread::Builder::new()
            .name("servitor-scm".to_string())
            .spawn(|| {
                if let Err(e) = service_dispatcher::start("", ffi_service_main) {
                    tracing::debug!(error = %e, "not started by the service control manager");
                }
            })
            .map_err(|e| ServiceError::capability(format!("dispatcher thread failed: {e}")))?;
        Ok(())
    }

    fn stop(&self, exit_code: i32) {
        set_status(ServiceState::Stopped, exit_code.unsigned_abs());
        if let Some(release) = RELEASE.lock().take() {
            let _ = release.send(());
        }
    }

    fn is_stop_requested(&self) -> bool {
        STOP_REQUESTED.swap(false, Ordering::SeqCst)
    }
}
