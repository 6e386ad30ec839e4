// flock_agent/src/cli.rs

use clap::Parser;
use std::path::PathBuf;

/// Flock: a swarm agent that steers toward its neighbors.
///
/// By default runs one agent bridged over stdin/stdout. With `--simulate`
/// runs the whole configured swarm in-process instead.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration. Falls back to `flock.toml` if present.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override `agent.name`.
    #[arg(short, long)]
    pub name: Option<String>,

    /// Run the whole swarm in-process instead of a single bridged agent.
    #[arg(long, default_value_t = false)]
    pub simulate: bool,

    /// Simulated seconds to run; overrides `simulation.duration_secs`.
    #[arg(long)]
    pub duration: Option<f64>,

    /// Seed for the simulator's random number generator.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print the effective configuration as TOML and exit.
    #[arg(long, default_value_t = false)]
    pub print_config: bool,
}
