// flock_core/src/lib.rs

// This file defines the public modules of the library.
pub mod angles;
pub mod codec;
pub mod consensus;
pub mod control;
pub mod membership;
pub mod messages;
pub mod neighborhood;
pub mod prelude;
pub mod roster;
pub mod types;
pub mod watchdog;
