//! Manager configuration.
//!
//! Where control artifacts live and how they are written. Defaults match a
//! stock Linux host; tests and unusual layouts point the directories
//! elsewhere.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::backend::Backend;
use crate::error::{Result, ServiceError};

/// Default directory for systemd unit files.
pub const DEFAULT_UNIT_DIR: &str = "/usr/lib/systemd/system";

/// Default directory for SysV init scripts.
pub const DEFAULT_INIT_DIR: &str = "/etc/init.d";

/// Default artifact mode: rwxr-xr-x.
pub const DEFAULT_FILE_MODE: u32 = 0o755;

/// Configuration for [`ServiceManager`](crate::manager::ServiceManager).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// systemd unit directory; its presence selects the systemd backend.
    #[serde(default = "default_unit_dir")]
    pub unit_dir: PathBuf,

    /// SysV init script directory.
    #[serde(default = "default_init_dir")]
    pub init_dir: PathBuf,

    /// Mode applied to every written artifact.
    #[serde(default = "default_file_mode")]
    pub file_mode: u32,

    /// Skips probing and always uses this backend.
    #[serde(default)]
    pub backend: Option<Backend>,
}

fn default_unit_dir() -> PathBuf {
    PathBuf::from(DEFAULT_UNIT_DIR)
}

fn default_init_dir() -> PathBuf {
    PathBuf::from(DEFAULT_INIT_DIR)
}

const fn default_file_mode() -> u32 {
    DEFAULT_FILE_MODE
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            unit_dir: default_unit_dir(),
            init_dir: default_init_dir(),
            file_mode: DEFAULT_FILE_MODE,
            backend: None,
        }
    }
}

impl ManagerConfig {
    /// Creates a configuration rooted at custom directories.
    #[must_use]
    pub fn with_dirs(unit_dir: impl Into<PathBuf>, init_dir: impl Into<PathBuf>) -> Self {
        Self {
            unit_dir: unit_dir.into(),
            init_dir: init_dir.into(),
            ..Self::default()
        }
    }

    /// Forces a backend instead of probing.
    #[must_use]
    pub const fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Path of the systemd unit for `name`.
    ///
    /// Install and remove both derive the path here; nothing else records it.
    #[must_use]
    pub fn unit_path(&self, name: &str) -> PathBuf {
        self.unit_dir.join(format!("{name}.service"))
    }

    /// Path of the init script for `name`.
    #[must_use]
    pub fn init_script_path(&self, name: &str) -> PathBuf {
        self.init_dir.join(name)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.file_mode & 0o002 != 0 {
            return Err(ServiceError::config(format!(
                "file_mode {:o} is world-writable",
                self.file_mode
            )));
        }
        if self.file_mode & 0o100 == 0 {
            return Err(ServiceError::config(format!(
                "file_mode {:o} is not executable by owner",
                self.file_mode
            )));
        }
        if self.file_mode > 0o7777 {
            return Err(ServiceError::config(format!(
                "file_mode {:o} is not a permission mode",
                self.file_mode
            )));
        }
        Ok(())
    }

    /// Loads a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ServiceError::config(format!("failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| ServiceError::config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}
