//! Service descriptor: what gets installed.
//!
//! A descriptor is a plain value. It is built once by the caller (in code or
//! from a TOML file) and handed by reference to the manager, which never
//! mutates it.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

/// Description of a service to register with the host.
///
/// `name` is used verbatim as the unit name and as the init script file name.
/// It is not validated here; rendering rejects values that would break the
/// generated artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    /// Unique service identifier.
    pub name: String,

    /// Human-readable name (native service manager only). Defaults to `name`.
    #[serde(default)]
    pub display_name: Option<String>,

    /// Executable that hosts the program. Defaults to the current executable.
    #[serde(default = "default_executable_path")]
    pub executable_path: PathBuf,

    /// Arguments passed to the executable before the program path.
    #[serde(default)]
    pub executable_args: Vec<String>,

    /// Program handed to the executable.
    pub program_path: PathBuf,

    /// Arguments passed after the program path.
    #[serde(default)]
    pub program_args: Vec<String>,

    /// Account to run the service as (forwarded verbatim).
    #[serde(default)]
    pub username: Option<String>,

    /// Password for `username` (forwarded verbatim, never stored).
    #[serde(default)]
    pub password: Option<String>,

    /// Services that must start before this one.
    #[serde(default)]
    pub dependencies: BTreeSet<String>,

    /// Legacy init runlevels the service starts in.
    #[serde(default = "default_run_levels")]
    pub run_levels: Vec<u8>,

    /// systemd target that wants this unit.
    #[serde(default = "default_systemd_target")]
    pub systemd_target: String,
}

fn default_executable_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .or_else(|| std::env::args_os().next().map(PathBuf::from))
        .unwrap_or_default()
}

fn default_run_levels() -> Vec<u8> {
    vec![2, 3, 4, 5]
}

fn default_systemd_target() -> String {
    "multi-user.target".to_string()
}

impl ServiceDescriptor {
    /// Creates a descriptor with required fields; everything else defaulted.
    #[must_use]
    pub fn new(name: impl Into<String>, program_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            executable_path: default_executable_path(),
            executable_args: vec![],
            program_path: program_path.into(),
            program_args: vec![],
            username: None,
            password: None,
            dependencies: BTreeSet::new(),
            run_levels: default_run_levels(),
            systemd_target: default_systemd_target(),
        }
    }

    /// Sets the executable path.
    #[must_use]
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable_path = path.into();
        self
    }

    /// Sets the executable arguments.
    #[must_use]
    pub fn with_executable_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.executable_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the program arguments.
    #[must_use]
    pub fn with_program_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.program_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Sets the account credentials.
    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: Option<String>) -> Self {
        self.username = Some(username.into());
        self.password = password;
        self
    }

    /// Adds a dependency.
    #[must_use]
    pub fn with_dependency(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.insert(dependency.into());
        self
    }

    /// Sets the legacy runlevels.
    #[must_use]
    pub fn with_run_levels(mut self, run_levels: impl Into<Vec<u8>>) -> Self {
        self.run_levels = run_levels.into();
        self
    }

    /// Sets the systemd target.
    #[must_use]
    pub fn with_systemd_target(mut self, target: impl Into<String>) -> Self {
        self.systemd_target = target.into();
        self
    }

    /// Returns the display name, falling back to `name`.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// Loads a descriptor from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ServiceError::config(format!("failed to read descriptor: {e}")))?;
        toml::from_str(&content)
            .map_err(|e| ServiceError::config(format!("failed to parse descriptor: {e}")))
    }
}
