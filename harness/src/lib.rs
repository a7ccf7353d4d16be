//! STS Harness
//!
//! Loads a harness configuration, brings up the controllers it names and
//! tears every one of them down again when the run ends.

pub mod config;
pub mod supervisor;

pub use config::HarnessConfig;
pub use supervisor::{Supervisor, shutdown_signal};
