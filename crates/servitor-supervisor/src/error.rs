//! Error types for servitor-supervisor.

use std::fmt;

/// Result type alias for supervisor operations.
pub type Result<T> = std::result::Result<T, SupervisorError>;

/// Standard stream being redirected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => write!(f, "stdout"),
            Self::Stderr => write!(f, "stderr"),
        }
    }
}

/// Error type for arming the supervisor.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    /// `run` was called outside a tokio runtime.
    #[error("no tokio runtime: the supervisor must be armed from within a runtime")]
    NoRuntime,

    /// Installing the stop-signal listeners failed.
    #[error("signal registration failed: {0}")]
    Signal(#[source] std::io::Error),

    /// A standard stream could not be pointed at its sink.
    #[error("redirecting {stream} failed: {source}")]
    Redirect {
        /// The stream being redirected.
        stream: Stream,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The native service capability refused to connect.
    #[error("{0}")]
    Capability(String),
}

impl From<servitor_core::ServiceError> for SupervisorError {
    fn from(err: servitor_core::ServiceError) -> Self {
        Self::Capability(err.to_string())
    }
}
