//! Running registration tools.
//!
//! Tool invocations are the only subprocesses the manager starts. They run
//! to completion with no timeout; a hung tool hangs the calling operation.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{Result, ServiceError};
use crate::probe::{ProbeResult, SBIN_DIRS};

/// Outcome of a tool that was started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` if terminated by a signal.
    pub code: Option<i32>,
    /// Captured standard error.
    pub stderr: String,
}

impl ToolOutput {
    /// Output of a tool that exited 0.
    #[must_use]
    pub fn success() -> Self {
        Self {
            code: Some(0),
            stderr: String::new(),
        }
    }

    /// Output of a tool that exited with `code`.
    #[must_use]
    pub fn exited(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stderr: stderr.into(),
        }
    }

    /// Returns true if the tool exited 0.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.code, Some(0))
    }
}

/// Starts external tools and waits for them.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Runs `program` with `args`.
    ///
    /// A spawn failure is returned as the raw I/O error so callers can tell
    /// "not installed" from every other failure.
    async fn run(&self, program: &str, args: &[&str]) -> std::io::Result<ToolOutput>;
}

/// Runs tools as child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[&str]) -> std::io::Result<ToolOutput> {
        let output = match spawn_output(Path::new(program), args).await {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Registrars often live in sbin, which a non-root PATH omits.
                match sbin_fallback(program) {
                    Some(path) => spawn_output(&path, args).await?,
                    None => return Err(e),
                }
            }
            other => other?,
        };

        Ok(ToolOutput {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

async fn spawn_output(program: &Path, args: &[&str]) -> std::io::Result<std::process::Output> {
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
}

fn sbin_fallback(program: &str) -> Option<PathBuf> {
    if program.contains(std::path::MAIN_SEPARATOR) {
        return None;
    }
    SBIN_DIRS
        .iter()
        .map(|dir| Path::new(dir).join(program))
        .find(|candidate| candidate.is_file())
}

/// Runs a tool and converts every failure into a [`ServiceError`].
///
/// `NotFound` becomes [`ServiceError::ToolNotFound`] so fallback chains can
/// move on; a nonzero exit is always [`ServiceError::ToolExecution`].
pub async fn invoke(runner: &dyn ToolRunner, program: &str, args: &[&str]) -> Result<()> {
    tracing::debug!(tool = program, args = ?args, "invoking tool");

    match ProbeResult::from_spawn(program, runner.run(program, args).await) {
        ProbeResult::Found(_) => Ok(()),
        ProbeResult::NotFound => Err(ServiceError::tool_not_found(program)),
        ProbeResult::FoundButFailed(failure) => Err(failure.into_error(program, args)),
    }
}
