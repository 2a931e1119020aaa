//! Error types for servitor-core.
//!
//! Every failure names the step that failed and the path or command involved,
//! so an operator can tell a half-installed service apart from a missing tool.

use std::path::PathBuf;

/// Result type alias for service lifecycle operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Error type for install, remove and probe operations.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The control artifact could not be written (permissions, missing directory).
    #[error("writeFile({}) failed: {source}", path.display())]
    FileWrite {
        /// Target path of the artifact.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The control artifact exists but could not be deleted.
    #[error("unlink({}) failed: {source}", path.display())]
    FileRemove {
        /// Path of the artifact.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A registration or deregistration tool is absent.
    #[error("{tool} not found")]
    ToolNotFound {
        /// The tool that was looked up or spawned.
        tool: String,
    },

    /// The tool exists but could not be started.
    #[error("{tool} could not be started: {source}")]
    ToolSpawn {
        /// The tool that failed to start.
        tool: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The tool ran and exited nonzero.
    #[error("{} failed: {}{}", command_line(tool, args), exit_code_display(*code), stderr_suffix(stderr))]
    ToolExecution {
        /// The tool that failed.
        tool: String,
        /// Arguments the tool was run with.
        args: Vec<String>,
        /// Exit code, `None` if terminated by a signal.
        code: Option<i32>,
        /// Captured standard error.
        stderr: String,
    },

    /// The native service capability reported a failure.
    #[error("{0}")]
    Capability(String),

    /// Inspecting the host for init tooling failed.
    #[error("stat({}) failed: {source}", path.display())]
    Probe {
        /// The path that was inspected.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A descriptor value cannot be substituted into a control artifact.
    #[error("render failed: {0}")]
    Render(String),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

fn command_line(tool: &str, args: &[String]) -> String {
    std::iter::once(tool)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

fn exit_code_display(code: Option<i32>) -> String {
    code.map_or_else(|| "terminated by signal".to_string(), |c| c.to_string())
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(" ({trimmed})")
    }
}

impl ServiceError {
    /// Creates a "tool not found" error.
    #[must_use]
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    /// Creates a capability error.
    #[must_use]
    pub fn capability(msg: impl Into<String>) -> Self {
        Self::Capability(msg.into())
    }

    /// Creates a render error.
    #[must_use]
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Returns true if this error should move a fallback chain to its next tool.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::ToolNotFound { .. })
    }

    /// Returns true if this error ends the operation outright.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_fallback()
    }

    /// Returns true if this error may leave a control artifact behind on disk.
    #[must_use]
    pub const fn may_leave_partial_state(&self) -> bool {
        matches!(
            self,
            Self::ToolNotFound { .. } | Self::ToolSpawn { .. } | Self::ToolExecution { .. }
        )
    }
}
