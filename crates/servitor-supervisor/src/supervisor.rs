//! Supervisor - delivers one stop request to a running service.
//!
//! # Toyota Way: Poka-Yoke (ポカヨケ)
//! The stop callback is stored once and taken once. However many signals or
//! service-manager polls arrive, it can only ever run a single time.
//!
//! # Phases
//! ```text
//! Idle ──run()──▶ Armed ──stop──▶ StopRequested ──request_shutdown()──▶ Terminated
//! ```
//!
//! Arming happens once per supervisor. Later `run` calls are accepted and
//! ignored, including their callbacks and sinks.

use std::fs::File;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::Mutex;
use servitor_core::native::{NativeServiceCapability, platform_capability};
use tokio::runtime::Handle;

use crate::error::{Result, Stream, SupervisorError};
use crate::sinks::{FdRedirector, OutputSinks, Redirector};

/// How often the native service manager is asked for a stop request.
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

type StopCallback = Box<dyn FnOnce() + Send>;

// =============================================================================
// Phase / StopChannel
// =============================================================================

/// Where a supervisor is in its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Created, not yet armed.
    Idle,
    /// Listening for a stop request.
    Armed,
    /// A stop request arrived and the callback was handed it.
    StopRequested,
    /// Shutdown was requested.
    Terminated,
}

/// Source of stop requests.
#[derive(Clone)]
pub enum StopChannel {
    /// `SIGINT` and `SIGTERM` (Ctrl-C where there are no Unix signals).
    Signals,
    /// Periodic queries to the native service manager.
    Poll {
        /// The service manager to query.
        capability: Arc<dyn NativeServiceCapability>,
        /// Time between queries.
        interval: Duration,
    },
}

impl StopChannel {
    /// The channel this platform uses: polling where a native service
    /// manager exists, signals elsewhere.
    #[must_use]
    pub fn for_platform() -> Self {
        platform_capability().map_or(Self::Signals, Self::poll)
    }

    /// Polls `capability` every [`POLL_INTERVAL`].
    #[must_use]
    pub fn poll(capability: Arc<dyn NativeServiceCapability>) -> Self {
        Self::Poll {
            capability,
            interval: POLL_INTERVAL,
        }
    }

    fn capability(&self) -> Option<&Arc<dyn NativeServiceCapability>> {
        match self {
            Self::Signals => None,
            Self::Poll { capability, .. } => Some(capability),
        }
    }
}

impl std::fmt::Debug for StopChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Signals => write!(f, "Signals"),
            Self::Poll { interval, .. } => f
                .debug_struct("Poll")
                .field("interval", interval)
                .finish_non_exhaustive(),
        }
    }
}

// =============================================================================
// Supervisor
// =============================================================================

struct Shared {
    phase: Mutex<Phase>,
    callback: Mutex<Option<StopCallback>>,
}

impl Shared {
    fn deliver_stop(&self) -> bool {
        {
            let mut phase = self.phase.lock();
            if *phase == Phase::Armed {
                *phase = Phase::StopRequested;
            }
        }

        // Taken outside the lock: the callback may block or never return.
        let callback = self.callback.lock().take();
        match callback {
            Some(callback) => {
                tracing::info!("delivering stop request");
                callback();
                true
            }
            None => false,
        }
    }
}

/// Arms stop handling for the current process.
///
/// Use [`Supervisor::global`] in services; construct one with
/// [`Supervisor::new`] to inject a channel in tests.
pub struct Supervisor {
    channel: StopChannel,
    redirector: Box<dyn Redirector>,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("channel", &self.channel)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

impl Supervisor {
    /// Creates an idle supervisor listening on `channel`.
    #[must_use]
    pub fn new(channel: StopChannel) -> Self {
        Self {
            channel,
            redirector: Box::new(FdRedirector),
            shared: Arc::new(Shared {
                phase: Mutex::new(Phase::Idle),
                callback: Mutex::new(None),
            }),
        }
    }

    /// The process-wide supervisor.
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<Supervisor> = OnceLock::new();
        GLOBAL.get_or_init(|| Self::new(StopChannel::for_platform()))
    }

    /// Replaces how streams are redirected.
    #[must_use]
    pub fn with_redirector(mut self, redirector: Box<dyn Redirector>) -> Self {
        self.redirector = redirector;
        self
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        *self.shared.phase.lock()
    }

    /// Redirects output and starts listening for a stop request.
    ///
    /// `on_stop` runs at most once, on a runtime task, when the first stop
    /// request arrives. Only the first successful call arms the supervisor.
    ///
    /// # Errors
    ///
    /// Fails if called outside a tokio runtime, if a stream cannot be
    /// redirected, or if the stop listener cannot be installed. A failed
    /// call leaves the supervisor idle and puts back any stream it had
    /// already redirected.
    pub fn run(&self, sinks: OutputSinks, on_stop: impl FnOnce() + Send + 'static) -> Result<()> {
        let mut phase = self.shared.phase.lock();
        if *phase != Phase::Idle {
            tracing::debug!(phase = ?*phase, "supervisor already armed, ignoring run");
            return Ok(());
        }

        let runtime = Handle::try_current().map_err(|_| SupervisorError::NoRuntime)?;

        let mut originals = Vec::new();
        for (stream, sink) in sinks.targets() {
            let redirected = self.redirector.capture(stream).and_then(|original| {
                self.redirector.redirect(stream, sink)?;
                Ok(original)
            });
            match redirected {
                Ok(original) => originals.push((stream, original)),
                Err(source) => {
                    self.restore(originals);
                    return Err(SupervisorError::Redirect { stream, source });
                }
            }
        }

        *self.shared.callback.lock() = Some(Box::new(on_stop));

        let armed = match &self.channel {
            StopChannel::Signals => self.arm_signals(&runtime),
            StopChannel::Poll {
                capability,
                interval,
            } => self.arm_poll(&runtime, Arc::clone(capability), *interval),
        };
        if let Err(e) = armed {
            self.shared.callback.lock().take();
            self.restore(originals);
            return Err(e);
        }

        *phase = Phase::Armed;
        tracing::info!(channel = ?self.channel, "supervisor armed");
        Ok(())
    }

    fn restore(&self, originals: Vec<(Stream, Option<File>)>) {
        for (stream, original) in originals.into_iter().rev() {
            let Some(original) = original else {
                tracing::warn!(stream = %stream, "original stream was not captured, leaving it redirected");
                continue;
            };
            if let Err(e) = self.redirector.redirect(stream, &original) {
                tracing::warn!(stream = %stream, error = %e, "failed to restore stream");
            }
        }
    }

    #[cfg(unix)]
    fn arm_signals(&self, runtime: &Handle) -> Result<()> {
        use tokio::signal::unix::{SignalKind, signal};

        let _guard = runtime.enter();
        let mut sigint = signal(SignalKind::interrupt()).map_err(SupervisorError::Signal)?;
        let mut sigterm = signal(SignalKind::terminate()).map_err(SupervisorError::Signal)?;

        let shared = Arc::clone(&self.shared);
        runtime.spawn(async move {
            // Keeps listening after delivery so repeated signals are absorbed.
            loop {
                let name = tokio::select! {
                    received = sigint.recv() => match received {
                        Some(()) => "SIGINT",
                        None => break,
                    },
                    received = sigterm.recv() => match received {
                        Some(()) => "SIGTERM",
                        None => break,
                    },
                };
                tracing::info!(signal = name, "stop signal received");
                shared.deliver_stop();
            }
        });
        Ok(())
    }

    #[cfg(not(unix))]
    fn arm_signals(&self, runtime: &Handle) -> Result<()> {
        let shared = Arc::clone(&self.shared);
        runtime.spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!(signal = "ctrl-c", "stop signal received");
                shared.deliver_stop();
            }
        });
        Ok(())
    }

    fn arm_poll(
        &self,
        runtime: &Handle,
        capability: Arc<dyn NativeServiceCapability>,
        interval: Duration,
    ) -> Result<()> {
        capability.run()?;

        let shared = Arc::clone(&self.shared);
        runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if capability.is_stop_requested() {
                    tracing::info!("stop requested by service manager");
                    shared.deliver_stop();
                    break;
                }
            }
        });
        Ok(())
    }

    /// Delivers a stop request as if one had arrived on the channel.
    ///
    /// Returns true if this call ran the callback.
    pub fn notify_stop(&self) -> bool {
        self.shared.deliver_stop()
    }

    /// Asks the native service manager whether a stop was requested.
    ///
    /// Always false where stop requests arrive as signals.
    #[must_use]
    pub fn is_stop_requested(&self) -> bool {
        self.channel
            .capability()
            .is_some_and(|capability| capability.is_stop_requested())
    }

    /// Marks the supervisor terminated and reports `exit_code` to the
    /// native service manager, without exiting.
    pub fn finish(&self, exit_code: i32) {
        *self.shared.phase.lock() = Phase::Terminated;
        if let Some(capability) = self.channel.capability() {
            capability.stop(exit_code);
        }
        tracing::info!(exit_code, "service terminating");
    }

    /// Reports `exit_code` to the service manager and exits the process.
    pub fn request_shutdown(&self, exit_code: i32) -> ! {
        self.finish(exit_code);
        std::process::exit(exit_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{RecordingCapability, RecordingRedirector, wait_until};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn poll_supervisor(capability: &Arc<RecordingCapability>) -> Supervisor {
        Supervisor::new(StopChannel::Poll {
            capability: Arc::clone(capability) as Arc<dyn NativeServiceCapability>,
            interval: Duration::from_millis(10),
        })
        .with_redirector(Box::new(RecordingRedirector::default()))
    }

    #[test]
    fn test_new_is_idle() {
        assert_eq!(Supervisor::new(StopChannel::Signals).phase(), Phase::Idle);
    }

    #[test]
    fn test_run_outside_runtime() {
        let supervisor = Supervisor::new(StopChannel::Signals);
        let err = supervisor.run(OutputSinks::none(), || {}).unwrap_err();
        assert!(matches!(err, SupervisorError::NoRuntime));
        assert_eq!(supervisor.phase(), Phase::Idle);
    }

    #[test]
    fn test_global_is_shared() {
        assert!(std::ptr::eq(Supervisor::global(), Supervisor::global()));
    }

    #[test]
    fn test_signals_channel_never_reports_stop() {
        assert!(!Supervisor::new(StopChannel::Signals).is_stop_requested());
    }

    #[tokio::test]
    async fn test_poll_connects_to_service_manager() {
        let capability = Arc::new(RecordingCapability::default());
        let supervisor = poll_supervisor(&capability);

        tokio_test::assert_ok!(supervisor.run(OutputSinks::none(), || {}));

        assert_eq!(capability.runs(), 1);
        assert_eq!(supervisor.phase(), Phase::Armed);
    }

    #[tokio::test]
    async fn test_notify_stop_runs_callback_once() {
        let capability = Arc::new(RecordingCapability::default());
        let supervisor = poll_supervisor(&capability);
        let count = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&count);

        supervisor
            .run(OutputSinks::none(), move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        assert!(supervisor.notify_stop());
        assert!(!supervisor.notify_stop());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(supervisor.phase(), Phase::StopRequested);
    }

    #[tokio::test]
    async fn test_finish_reports_exit_code() {
        let capability = Arc::new(RecordingCapability::default());
        let supervisor = poll_supervisor(&capability);
        supervisor.run(OutputSinks::none(), || {}).unwrap();

        supervisor.finish(3);

        assert_eq!(capability.stops(), vec![3]);
        assert_eq!(supervisor.phase(), Phase::Terminated);
    }

    #[tokio::test]
    async fn test_redirects_each_sink() {
        let redirector = RecordingRedirector::default();
        let record = redirector.record();
        let supervisor =
            Supervisor::new(StopChannel::Signals).with_redirector(Box::new(redirector));

        let sinks = OutputSinks::combined(tempfile::tempfile().unwrap()).unwrap();
        supervisor.run(sinks, || {}).unwrap();

        assert_eq!(*record.lock(), vec![Stream::Stdout, Stream::Stderr]);
    }

    #[tokio::test]
    async fn test_redirect_failure_leaves_idle() {
        let supervisor = Supervisor::new(StopChannel::Signals)
            .with_redirector(Box::new(RecordingRedirector::failing()));

        let sinks = OutputSinks::split(None, Some(tempfile::tempfile().unwrap()));
        let err = supervisor.run(sinks, || {}).unwrap_err();

        assert!(matches!(
            err,
            SupervisorError::Redirect {
                stream: Stream::Stderr,
                ..
            }
        ));
        assert_eq!(supervisor.phase(), Phase::Idle);
        assert!(!supervisor.notify_stop());
    }

    #[tokio::test]
    async fn test_partial_redirect_is_undone() {
        let redirector = RecordingRedirector::failing_on(Stream::Stderr);
        let record = redirector.record();
        let supervisor =
            Supervisor::new(StopChannel::Signals).with_redirector(Box::new(redirector));

        let sinks = OutputSinks::combined(tempfile::tempfile().unwrap()).unwrap();
        let err = supervisor.run(sinks, || {}).unwrap_err();

        assert!(matches!(
            err,
            SupervisorError::Redirect {
                stream: Stream::Stderr,
                ..
            }
        ));
        // stdout was pointed at the sink, then back at its original target
        assert_eq!(*record.lock(), vec![Stream::Stdout, Stream::Stdout]);
        assert_eq!(supervisor.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_poll_delivers_stop_request() {
        let capability = Arc::new(RecordingCapability::default());
        let supervisor = poll_supervisor(&capability);
        let count = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&count);

        supervisor
            .run(OutputSinks::none(), move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        capability.request_stop();

        assert!(wait_until(|| count.load(Ordering::SeqCst) == 1).await);
        assert_eq!(supervisor.phase(), Phase::StopRequested);
    }
}
