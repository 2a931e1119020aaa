//! Test infrastructure for falsification testing.
//!
//! Scenario suites run the full install/remove flow against a temporary
//! directory tree and scripted tools:
//!
//! | Category | ID Range | Description |
//! |----------|----------|-------------|
//! | A | F001-F020 | Install |
//! | B | F021-F040 | Remove |
//! | C | F041-F060 | Backend probing |

pub mod install;

pub use mocks::{MockCapability, MockHost, MockLocator, MockRunner};
