//! Test infrastructure for falsification testing.
//!
//! | Category | ID Range | Description |
//! |----------|----------|-------------|
//! | D | F061-F080 | Supervisor lifecycle |


use std::fs::File;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use servitor_core::descriptor::ServiceDescriptor;
use servitor_core::native::NativeServiceCapability;

use crate::error::Stream;
use crate::sinks::Redirector;

/// Native capability that records what the supervisor asks of it.
#[derive(Debug, Default)]
pub struct RecordingCapability {
    runs: Mutex<u32>,
    stops: Mutex<Vec<i32>>,
    stop_requested: AtomicBool,
}

impl RecordingCapability {
    /// Simulates a stop request from the service manager.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    /// Number of `run` calls.
    pub fn runs(&self) -> u32 {
        *self.runs.lock()
    }

    /// Exit codes passed to `stop`.
    pub fn stops(&self) -> Vec<i32> {
        self.stops.lock().clone()
    }
}

impl NativeServiceCapability for RecordingCapability {
    fn add(&self, _descriptor: &ServiceDescriptor) -> servitor_core::Result<()> {
        Ok(())
    }

    fn remove(&self, _name: &str) -> servitor_core::Result<()> {
        Ok(())
    }

    fn run(&self) -> servitor_core::Result<()> {
        *self.runs.lock() += 1;
        Ok(())
    }

    fn stop(&self, exit_code: i32) {
        self.stops.lock().push(exit_code);
    }

    fn is_stop_requested(&self) -> bool {
        self.stop_requested.swap(false, Ordering::SeqCst)
    }
}

/// Redirector that records streams instead of touching file descriptors.
#[derive(Debug, Default)]
pub struct RecordingRedirector {
    record: Arc<Mutex<Vec<Stream>>>,
    fail_all: bool,
    fail_on: Option<Stream>,
}

impl RecordingRedirector {
    /// A redirector whose every call fails.
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    /// A redirector that fails only for `stream`.
    pub fn failing_on(stream: Stream) -> Self {
        Self {
            fail_on: Some(stream),
            ..Self::default()
        }
    }

    /// Shared view of the redirected streams.
    pub fn record(&self) -> Arc<Mutex<Vec<Stream>>> {
        Arc::clone(&self.record)
    }
}

impl Redirector for RecordingRedirector {
    fn redirect(&self, stream: Stream, _sink: &File) -> std::io::Result<()> {
        if self.fail_all || self.fail_on == Some(stream) {
            return Err(std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        }
        self.record.lock().push(stream);
        Ok(())
    }

    fn capture(&self, _stream: Stream) -> std::io::Result<Option<File>> {
        tempfile::tempfile().map(Some)
    }
}

/// Polls `condition` for up to two seconds.
pub async fn wait_until(condition: impl Fn() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
