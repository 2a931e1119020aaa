//! Backend probing.
//!
//! Probing is capability-based: it looks for the systemd unit directory and
//! for the registration tools themselves, never at distribution names or
//! versions. Nothing is cached; every install and remove probes again.
//!
//! # Probe Order
//! 1. Native service capability (Windows SCM)
//! 2. systemd unit directory
//! 3. `chkconfig`
//! 4. `update-rc.d`
//!
//! A tool that is present but unusable stops the chain. Only "not found"
//! moves on to the next candidate.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::backend::Backend;
use crate::error::{Result, ServiceError};
use crate::tool::ToolOutput;

/// The `chkconfig` registrar.
pub const CHKCONFIG: &str = "chkconfig";
/// The `update-rc.d` registrar.
pub const UPDATE_RC_D: &str = "update-rc.d";
/// The `start-stop-daemon` supervisor.
pub const START_STOP_DAEMON: &str = "start-stop-daemon";
/// The systemd control tool.
pub const SYSTEMCTL: &str = "systemctl";

/// Directories searched after `PATH`; registrars usually live in `sbin`.
pub(crate) const SBIN_DIRS: &[&str] = &["/usr/local/sbin", "/usr/sbin", "/sbin"];

/// Why a tool that exists cannot be used.
#[derive(Debug)]
pub enum ToolFailure {
    /// The file exists but is not executable.
    NotExecutable(PathBuf),
    /// Starting the tool failed for a reason other than "not found".
    Spawn(std::io::Error),
    /// The tool ran and exited nonzero.
    Exit {
        /// Exit code, `None` if terminated by a signal.
        code: Option<i32>,
        /// Captured standard error.
        stderr: String,
    },
}

impl ToolFailure {
    /// Converts the failure into the error reported for `tool` run with `args`.
    #[must_use]
    pub fn into_error(self, tool: &str, args: &[&str]) -> ServiceError {
        match self {
            Self::NotExecutable(path) => ServiceError::ToolSpawn {
                tool: tool.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    format!("{} is not executable", path.display()),
                ),
            },
            Self::Spawn(source) => ServiceError::ToolSpawn {
                tool: tool.to_string(),
                source,
            },
            Self::Exit { code, stderr } => ServiceError::ToolExecution {
                tool: tool.to_string(),
                args: args.iter().map(|a| (*a).to_string()).collect(),
                code,
                stderr,
            },
        }
    }
}

/// Result of looking for, or running, one tool.
#[derive(Debug)]
pub enum ProbeResult {
    /// The tool is present (and, when run, succeeded).
    Found(PathBuf),
    /// The tool is absent. The only outcome that triggers a fallback.
    NotFound,
    /// The tool is present but failed. Never a fallback trigger.
    FoundButFailed(ToolFailure),
}

impl ProbeResult {
    /// Classifies the outcome of running `program`.
    #[must_use]
    pub fn from_spawn(program: &str, outcome: std::io::Result<ToolOutput>) -> Self {
        match outcome {
            Ok(output) if output.is_success() => Self::Found(PathBuf::from(program)),
            Ok(ToolOutput { code, stderr }) => Self::FoundButFailed(ToolFailure::Exit { code, stderr }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::NotFound,
            Err(e) => Self::FoundButFailed(ToolFailure::Spawn(e)),
        }
    }

    /// Returns true for [`ProbeResult::Found`].
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Returns true for [`ProbeResult::NotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Finds tools on the host.
#[async_trait]
pub trait ToolLocator: Send + Sync {
    /// Looks up `tool`.
    async fn locate(&self, tool: &str) -> ProbeResult;
}

/// Looks tools up on `PATH` plus the usual `sbin` directories.
#[derive(Debug, Clone)]
pub struct PathLocator {
    dirs: Vec<PathBuf>,
    search_env_path: bool,
}

impl Default for PathLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl PathLocator {
    /// Creates a locator that searches `PATH` and the `sbin` directories.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dirs: SBIN_DIRS.iter().map(PathBuf::from).collect(),
            search_env_path: true,
        }
    }

    /// Creates a locator that searches only `dirs`.
    #[must_use]
    pub fn with_dirs(dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            dirs: dirs.into_iter().collect(),
            search_env_path: false,
        }
    }

    fn search_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = if self.search_env_path {
            std::env::var_os("PATH")
                .map(|p| std::env::split_paths(&p).collect())
                .unwrap_or_default()
        } else {
            Vec::new()
        };
        for dir in &self.dirs {
            if !dirs.contains(dir) {
                dirs.push(dir.clone());
            }
        }
        dirs
    }

    fn check_candidate(path: &Path) -> Option<ProbeResult> {
        let metadata = std::fs::metadata(path).ok()?;
        if !metadata.is_file() {
            return None;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if metadata.permissions().mode() & 0o111 == 0 {
                return Some(ProbeResult::FoundButFailed(ToolFailure::NotExecutable(
                    path.to_path_buf(),
                )));
            }
        }

        Some(ProbeResult::Found(path.to_path_buf()))
    }
}

#[async_trait]
impl ToolLocator for PathLocator {
    async fn locate(&self, tool: &str) -> ProbeResult {
        let mut not_executable = None;

        for dir in self.search_dirs() {
            match Self::check_candidate(&dir.join(tool)) {
                Some(found @ ProbeResult::Found(_)) => return found,
                Some(failed) => {
                    not_executable.get_or_insert(failed);
                }
                None => {}
            }
        }

        not_executable.unwrap_or(ProbeResult::NotFound)
    }
}

/// Selects the backend for one install or remove call.
pub struct BackendProber<'a> {
    unit_dir: &'a Path,
    locator: &'a dyn ToolLocator,
    native_available: bool,
}

impl<'a> BackendProber<'a> {
    /// Creates a prober.
    #[must_use]
    pub fn new(unit_dir: &'a Path, locator: &'a dyn ToolLocator, native_available: bool) -> Self {
        Self {
            unit_dir,
            locator,
            native_available,
        }
    }

    /// Probes the host and returns the single backend to use.
    pub async fn probe(&self) -> Result<Backend> {
        if self.native_available {
            tracing::debug!("native service capability available");
            return Ok(Backend::NativeServiceManager);
        }

        match tokio::fs::metadata(self.unit_dir).await {
            Ok(_) => {
                tracing::debug!(unit_dir = %self.unit_dir.display(), "systemd unit directory present");
                return Ok(Backend::SystemdUnit);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(ServiceError::Probe {
                    path: self.unit_dir.to_path_buf(),
                    source,
                });
            }
        }

        match self.locator.locate(CHKCONFIG).await {
            ProbeResult::Found(path) => {
                tracing::debug!(path = %path.display(), "chkconfig found");
                return Ok(Backend::SysVInitWithChkconfig);
            }
            ProbeResult::NotFound => {
                tracing::debug!("chkconfig not found, trying update-rc.d");
            }
            ProbeResult::FoundButFailed(failure) => return Err(failure.into_error(CHKCONFIG, &[])),
        }

        match self.locator.locate(UPDATE_RC_D).await {
            ProbeResult::Found(path) => {
                tracing::debug!(path = %path.display(), "update-rc.d found");
                Ok(Backend::SysVInitWithUpdateRcD)
            }
            ProbeResult::NotFound => Err(ServiceError::tool_not_found(UPDATE_RC_D)),
            ProbeResult::FoundButFailed(failure) => Err(failure.into_error(UPDATE_RC_D, &[])),
        }
    }

    /// Confirms that an explicitly requested backend is usable.
    pub async fn confirm(&self, backend: Backend) -> Result<Backend> {
        let tool = match backend {
            Backend::NativeServiceManager => {
                if self.native_available {
                    return Ok(backend);
                }
                return Err(ServiceError::capability(
                    "native service manager is not available on this platform",
                ));
            }
            Backend::SystemdUnit => return Ok(backend),
            Backend::SysVInitWithChkconfig => CHKCONFIG,
            Backend::SysVInitWithUpdateRcD => UPDATE_RC_D,
            Backend::SysVInitDirect => START_STOP_DAEMON,
        };

        match self.locator.locate(tool).await {
            ProbeResult::Found(_) => Ok(backend),
            ProbeResult::NotFound => Err(ServiceError::tool_not_found(tool)),
            ProbeResult::FoundButFailed(failure) => Err(failure.into_error(tool, &[])),
        }
    }
}
