// flock_agent/src/agent/mod.rs

//! One swarm agent: its state ([`AgentContext`]) and the event loop that
//! drives it ([`run_agent`]).

mod context;
mod event_loop;

pub use context::AgentContext;
pub use event_loop::{inbox, run_agent, spawn_agent, AgentHandle, AgentInputs, Inbox};
