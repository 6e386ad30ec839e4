// flock_agent/src/prelude.rs

// Re-export the pure consensus/control types.
pub use flock_core::prelude::*;

pub use crate::agent::{inbox, run_agent, spawn_agent, AgentContext, AgentHandle, AgentInputs, Inbox};
pub use crate::config::{AgentSettings, ConfigError, FlockConfig};
pub use crate::sim::{AgentReport, SimError, SimulationReport, SwarmSimulation};
pub use crate::transport::{
    LoopbackTransport, Outbound, RecordingTransport, StdioTransport, SwarmBus, Transport,
    TransportError,
};
