//! Output sinks and stream redirection.
//!
//! A supervised service usually has no terminal. Its standard streams are
//! pointed at files once, when the supervisor is armed, and stay that way
//! for the rest of the process.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::Stream;

/// Files that become the process-wide stdout and stderr.
#[derive(Debug, Default)]
pub struct OutputSinks {
    /// Target for standard output.
    pub stdout: Option<File>,
    /// Target for standard error.
    pub stderr: Option<File>,
}

impl OutputSinks {
    /// Leaves both streams where they are.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            stdout: None,
            stderr: None,
        }
    }

    /// Separate targets for each stream.
    #[must_use]
    pub const fn split(stdout: Option<File>, stderr: Option<File>) -> Self {
        Self { stdout, stderr }
    }

    /// One file for both streams.
    pub fn combined(file: File) -> std::io::Result<Self> {
        let stderr = file.try_clone()?;
        Ok(Self {
            stdout: Some(file),
            stderr: Some(stderr),
        })
    }

    /// Opens `path` for appending and uses it for both streams.
    pub fn append_to(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Self::combined(file)
    }

    /// Returns true if neither stream is redirected.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.stdout.is_none() && self.stderr.is_none()
    }

    /// The sinks paired with their streams, stdout first.
    pub fn targets(&self) -> impl Iterator<Item = (Stream, &File)> {
        [
            (Stream::Stdout, self.stdout.as_ref()),
            (Stream::Stderr, self.stderr.as_ref()),
        ]
        .into_iter()
        .filter_map(|(stream, file)| file.map(|f| (stream, f)))
    }
}

/// Points a standard stream at a file.
pub trait Redirector: Send + Sync {
    /// Makes `stream` write to `sink` from now on.
    fn redirect(&self, stream: Stream, sink: &File) -> std::io::Result<()>;

    /// Duplicates whatever `stream` writes to now, so a later redirect can
    /// be undone by redirecting back to it. `None` if it cannot be captured.
    fn capture(&self, _stream: Stream) -> std::io::Result<Option<File>> {
        Ok(None)
    }
}

/// Redirects at the file-descriptor level, so child processes and native
/// code writing to fd 1 and 2 follow too.
#[derive(Debug, Clone, Copy, Default)]
pub struct FdRedirector;

impl Redirector for FdRedirector {
    #[cfg(unix)]
    fn redirect(&self, stream: Stream, sink: &File) -> std::io::Result<()> {
        use std::os::unix::io::AsRawFd;

        let target = match stream {
            Stream::Stdout => {
                std::io::stdout().flush()?;
                libc::STDOUT_FILENO
            }
            Stream::Stderr => {
                std::io::stderr().flush()?;
                libc::STDERR_FILENO
            }
        };

        nix::unistd::dup2(sink.as_raw_fd(), target)?;
        Ok(())
    }

    #[cfg(unix)]
    fn capture(&self, stream: Stream) -> std::io::Result<Option<File>> {
        use std::os::fd::AsFd;

        let owned = match stream {
            Stream::Stdout => std::io::stdout().as_fd().try_clone_to_owned()?,
            Stream::Stderr => std::io::stderr().as_fd().try_clone_to_owned()?,
        };
        Ok(Some(File::from(owned)))
    }

    #[cfg(not(unix))]
    fn redirect(&self, stream: Stream, _sink: &File) -> std::io::Result<()> {
        match stream {
            Stream::Stdout => std::io::stdout().flush()?,
            Stream::Stderr => std::io::stderr().flush()?,
        }
        tracing::warn!(stream = %stream, "stream redirection is not supported on this platform");
        Ok(())
    }
}
