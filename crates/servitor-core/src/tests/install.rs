//! Category A: Install falsification tests (F001-F020).
//!
//! Each test states a property of `ServiceManager::install` and tries to
//! break it against a scripted host.

use std::sync::Arc;

use crate::backend::Backend;
use crate::error::ServiceError;
use crate::native::NativeServiceCapability;
use crate::probe::{CHKCONFIG, START_STOP_DAEMON, SYSTEMCTL, UPDATE_RC_D};
use crate::tests::mocks::{MockCapability, MockHost, MockLocator, MockRunner, Outcome, demo_descriptor};

/// F001: systemd host writes the unit, then enables it
#[tokio::test]
async fn f001_systemd_install_writes_unit_then_enables() {
    let host = MockHost::systemd();

    host.manager().install(&demo_descriptor()).await.unwrap();

    let unit = std::fs::read_to_string(host.unit_path("demo-svc")).unwrap();
    assert!(
        unit.contains("ExecStart=/usr/bin/node  /opt/demo/run.js"),
        "FALSIFIED: ExecStart must list the executable then the program:\n{unit}"
    );
    assert_eq!(host.runner.command_lines(), vec!["systemctl enable demo-svc"]);
    assert!(
        host.locator.lookups().is_empty(),
        "FALSIFIED: registrars must not be probed once systemd is found"
    );
}

/// F002: chkconfig host writes an executable LSB script, then registers it
#[tokio::test]
async fn f002_chkconfig_install_writes_lsb_script() {
    let host = MockHost::sysv(MockLocator::new().with_tool(CHKCONFIG));

    host.manager().install(&demo_descriptor()).await.unwrap();

    let path = host.init_path("demo-svc");
    let script = std::fs::read_to_string(&path).unwrap();
    assert!(script.starts_with("#!/bin/bash\n"));
    assert!(script.contains("# Provides:          demo-svc\n"));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755, "FALSIFIED: init script must be 0755");
    }

    assert_eq!(host.runner.command_lines(), vec!["chkconfig --add demo-svc"]);
    assert!(!host.unit_path("demo-svc").exists());
}

/// F003: chkconfig vanishing at spawn time falls back to update-rc.d
#[tokio::test]
async fn f003_chkconfig_spawn_not_found_falls_back() {
    let host = MockHost::sysv(MockLocator::new().with_tool(CHKCONFIG))
        .with_runner(MockRunner::new().with(CHKCONFIG, Outcome::Missing));

    host.manager().install(&demo_descriptor()).await.unwrap();

    assert_eq!(
        host.runner.command_lines(),
        vec!["chkconfig --add demo-svc", "update-rc.d demo-svc defaults"]
    );
}

/// F004: chkconfig exiting nonzero is fatal and never falls back
#[tokio::test]
async fn f004_chkconfig_nonzero_exit_is_fatal() {
    let host = MockHost::sysv(MockLocator::new().with_tool(CHKCONFIG)).with_runner(
        MockRunner::new().with(CHKCONFIG, Outcome::Exit(1, "service demo-svc does not support chkconfig".into())),
    );

    let err = host.manager().install(&demo_descriptor()).await.unwrap_err();

    assert!(matches!(err, ServiceError::ToolExecution { code: Some(1), .. }));
    assert!(err.to_string().starts_with("chkconfig --add demo-svc failed: 1"));
    assert_eq!(
        host.runner.command_lines(),
        vec!["chkconfig --add demo-svc"],
        "FALSIFIED: a nonzero chkconfig exit must not try update-rc.d"
    );
}

/// F005: a registrar failure leaves the written script in place
#[tokio::test]
async fn f005_registrar_failure_leaves_artifact() {
    let host = MockHost::sysv(MockLocator::new().with_tool(CHKCONFIG))
        .with_runner(MockRunner::new().with(CHKCONFIG, Outcome::Exit(2, String::new())));

    let err = host.manager().install(&demo_descriptor()).await.unwrap_err();

    assert!(err.may_leave_partial_state());
    assert!(
        host.init_path("demo-svc").exists(),
        "FALSIFIED: install must not roll back the written script"
    );
}

/// F006: update-rc.d host registers with defaults
#[tokio::test]
async fn f006_update_rc_d_install() {
    let host = MockHost::sysv(MockLocator::new().with_tool(UPDATE_RC_D));

    host.manager().install(&demo_descriptor()).await.unwrap();

    assert!(host.init_path("demo-svc").exists());
    assert_eq!(host.runner.command_lines(), vec!["update-rc.d demo-svc defaults"]);
}

/// F007: a host with no usable backend fails before writing anything
#[tokio::test]
async fn f007_no_backend_writes_nothing() {
    let host = MockHost::sysv(MockLocator::new());

    let err = host.manager().install(&demo_descriptor()).await.unwrap_err();

    assert!(matches!(err, ServiceError::ToolNotFound { ref tool } if tool == UPDATE_RC_D));
    assert!(!host.init_path("demo-svc").exists());
    assert!(host.runner.calls().is_empty());
}

/// F008: a write failure stops before the registrar runs
#[tokio::test]
async fn f008_write_failure_skips_registrar() {
    let host = MockHost::sysv(MockLocator::new().with_tool(CHKCONFIG));
    std::fs::remove_dir(&host.init_dir).unwrap();

    let err = host.manager().install(&demo_descriptor()).await.unwrap_err();

    assert!(matches!(err, ServiceError::FileWrite { .. }));
    assert!(err.to_string().contains("demo-svc"));
    assert!(
        host.runner.calls().is_empty(),
        "FALSIFIED: registrar ran after the artifact write failed"
    );
}

/// F009: systemctl failing after the unit was written is reported
#[tokio::test]
async fn f009_systemctl_failure_is_reported() {
    let host = MockHost::systemd()
        .with_runner(MockRunner::new().with(SYSTEMCTL, Outcome::Exit(1, "Access denied".into())));

    let err = host.manager().install(&demo_descriptor()).await.unwrap_err();

    assert_eq!(err.to_string(), "systemctl enable demo-svc failed: 1 (Access denied)");
    assert!(host.unit_path("demo-svc").exists());
}

/// F010: a registrar that exists but cannot start is not a fallback
#[tokio::test]
async fn f010_registrar_spawn_denied_is_fatal() {
    let host = MockHost::sysv(MockLocator::new().with_tool(CHKCONFIG))
        .with_runner(MockRunner::new().with(CHKCONFIG, Outcome::Denied));

    let err = host.manager().install(&demo_descriptor()).await.unwrap_err();

    assert!(matches!(err, ServiceError::ToolSpawn { .. }));
    assert_eq!(host.runner.calls().len(), 1);
}

/// F011: the direct backend is used only when configured, and registers nothing
#[tokio::test]
async fn f011_direct_backend_override() {
    let host = MockHost::sysv(MockLocator::new().with_tool(START_STOP_DAEMON));
    let manager = host.manager_with(host.config().with_backend(Backend::SysVInitDirect));

    manager.install(&demo_descriptor()).await.unwrap();

    let script = std::fs::read_to_string(host.init_path("demo-svc")).unwrap();
    assert!(script.starts_with("#!/bin/sh\n"));
    assert!(script.contains("--make-pidfile"));
    assert!(host.runner.calls().is_empty());
}

/// F012: the direct backend requires start-stop-daemon
#[tokio::test]
async fn f012_direct_backend_requires_start_stop_daemon() {
    let host = MockHost::sysv(MockLocator::new());
    let manager = host.manager_with(host.config().with_backend(Backend::SysVInitDirect));

    let err = manager.install(&demo_descriptor()).await.unwrap_err();

    assert!(matches!(err, ServiceError::ToolNotFound { ref tool } if tool == START_STOP_DAEMON));
    assert!(!host.init_path("demo-svc").exists());
}

/// F013: the native platform delegates the whole install
#[tokio::test]
async fn f013_native_install_delegates() {
    let host = MockHost::systemd();
    let capability = Arc::new(MockCapability::new());
    let manager = host
        .manager()
        .with_native(Some(Arc::clone(&capability) as Arc<dyn NativeServiceCapability>));

    let descriptor = demo_descriptor()
        .with_display_name("Demo Service")
        .with_credentials("svc-user", Some("secret".to_string()))
        .with_dependency("Tcpip");
    manager.install(&descriptor).await.unwrap();

    let added = capability.added();
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].display_name(), "Demo Service");
    assert_eq!(added[0].username.as_deref(), Some("svc-user"));
    assert!(added[0].dependencies.contains("Tcpip"));
    assert!(
        !host.unit_path("demo-svc").exists(),
        "FALSIFIED: native install must not write artifacts"
    );
    assert!(host.runner.calls().is_empty());
}

/// F014: native errors surface verbatim
#[tokio::test]
async fn f014_native_error_is_verbatim() {
    let host = MockHost::systemd();
    let capability = Arc::new(MockCapability::new().failing("CreateService() failed: access denied"));
    let manager = host
        .manager()
        .with_native(Some(capability as Arc<dyn NativeServiceCapability>));

    let err = manager.install(&demo_descriptor()).await.unwrap_err();

    assert_eq!(err.to_string(), "CreateService() failed: access denied");
}

/// F015: dry-run rendering writes nothing and runs nothing
#[tokio::test]
async fn f015_render_is_dry_run() {
    let host = MockHost::systemd();

    let artifact = host
        .manager()
        .render(&demo_descriptor())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(artifact.path(), host.unit_path("demo-svc"));
    assert!(artifact.contents().starts_with("[Unit]\n"));
    assert!(!host.unit_path("demo-svc").exists());
    assert!(host.runner.calls().is_empty());
}

/// F016: a name that would break the artifact is rejected before any write
#[tokio::test]
async fn f016_line_break_in_name_is_rejected() {
    let host = MockHost::systemd();
    let mut descriptor = demo_descriptor();
    descriptor.name = "demo\nExecStartPre=/bin/evil".to_string();

    let err = host.manager().install(&descriptor).await.unwrap_err();

    assert!(matches!(err, ServiceError::Render(_)));
    assert!(std::fs::read_dir(&host.unit_dir).unwrap().next().is_none());
    assert!(host.runner.calls().is_empty());
}

/// F017: the configured file mode is applied regardless of umask
#[cfg(unix)]
#[tokio::test]
async fn f017_configured_file_mode() {
    use std::os::unix::fs::PermissionsExt;

    let host = MockHost::systemd();
    let mut config = host.config();
    config.file_mode = 0o750;

    host.manager_with(config).install(&demo_descriptor()).await.unwrap();

    let mode = std::fs::metadata(host.unit_path("demo-svc")).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o750);
}

/// F018: reinstalling replaces the previous artifact
#[tokio::test]
async fn f018_reinstall_overwrites() {
    let host = MockHost::systemd();
    let manager = host.manager();

    manager.install(&demo_descriptor()).await.unwrap();
    let updated = demo_descriptor().with_systemd_target("graphical.target");
    manager.install(&updated).await.unwrap();

    let unit = std::fs::read_to_string(host.unit_path("demo-svc")).unwrap();
    assert!(unit.contains("WantedBy=graphical.target\n"));
    assert!(!unit.contains("multi-user.target"));
}

/// F019: a world-writable file mode set in code is refused before any write
#[tokio::test]
async fn f019_world_writable_mode_is_refused() {
    let host = MockHost::systemd();
    let mut config = host.config();
    config.file_mode = 0o777;

    let err = host.manager_with(config).install(&demo_descriptor()).await.unwrap_err();

    assert!(
        matches!(err, ServiceError::Config(_)),
        "FALSIFIED: mode 0777 must be rejected, got {err:?}"
    );
    assert!(!host.unit_path("demo-svc").exists());
    assert!(host.runner.calls().is_empty());
}

/// F020: a program path that is not UTF-8 is rejected, not mangled
#[cfg(unix)]
#[tokio::test]
async fn f020_non_utf8_program_path_is_rejected() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let host = MockHost::systemd();
    let mut descriptor = demo_descriptor();
    descriptor.program_path = OsStr::from_bytes(b"/opt/d\xffemo/run.js").into();

    let err = host.manager().install(&descriptor).await.unwrap_err();

    assert!(matches!(err, ServiceError::Render(_)));
    assert!(!host.unit_path("demo-svc").exists());
    assert!(host.runner.calls().is_empty());
}
