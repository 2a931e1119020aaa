//! Real signal delivery against the signal stop channel.
//!
//! Runs in its own test binary so the process-wide handlers cannot leak into
//! other tests.

#![cfg(unix)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use servitor_supervisor::{OutputSinks, Phase, StopChannel, Supervisor};

async fn wait_for(count: &AtomicU32, expected: u32) -> bool {
    for _ in 0..200 {
        if count.load(Ordering::SeqCst) == expected {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sigterm_then_sigint_invokes_callback_once() {
    let supervisor = Supervisor::new(StopChannel::Signals);
    let count = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&count);

    supervisor
        .run(OutputSinks::none(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    assert_eq!(supervisor.phase(), Phase::Armed);

    kill(Pid::this(), Signal::SIGTERM).unwrap();
    assert!(wait_for(&count, 1).await, "SIGTERM did not reach the callback");
    assert_eq!(supervisor.phase(), Phase::StopRequested);

    // The process survives further signals and the callback stays spent.
    kill(Pid::this(), Signal::SIGINT).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(count.load(Ordering::SeqCst), 1);
}
