// flock_agent/src/lib.rs

// This prelude is for convenience for binaries and tests using this crate.
pub mod prelude;

pub mod agent;
pub mod cli;
pub mod config;
pub mod logging;
pub mod sim;
pub mod transport;
