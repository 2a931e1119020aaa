// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # servitor-supervisor
//!
//! In-process half of a servitor service: once the program is running under
//! an init system or service manager, the supervisor turns stop requests into
//! a single callback and points stdout/stderr at log files.
//!
//! - [`Supervisor`] arms stop handling once per process
//! - [`StopChannel`] selects signals or native service-manager polling
//! - [`OutputSinks`] names the files standard streams are redirected to
//!
//! ## Example
//!
//! ```rust,no_run
//! use servitor_supervisor::{OutputSinks, Supervisor};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let supervisor = Supervisor::global();
//! supervisor.run(OutputSinks::append_to("/var/log/demo.log")?, || {
//!     Supervisor::global().request_shutdown(0);
//! })?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod sinks;
pub mod supervisor;
#[cfg(test)]
pub mod tests;

pub use error::{Result, Stream, SupervisorError};
pub use sinks::{FdRedirector, OutputSinks, Redirector};
pub use supervisor::{POLL_INTERVAL, Phase, StopChannel, Supervisor};
