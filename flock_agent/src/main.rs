// flock_agent/src/main.rs

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};

use flock_agent::agent::{inbox, run_agent, AgentContext};
use flock_agent::cli::Cli;
use flock_agent::config::FlockConfig;
use flock_agent::logging::init_logging;
use flock_agent::sim::SwarmSimulation;
use flock_agent::transport::{spawn_stdin_reader, StdioTransport};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let mut config = FlockConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(name) = cli.name {
        config.agent.name = name;
    }
    if let Some(seed) = cli.seed {
        config.simulation.seed = Some(seed);
    }
    if let Some(duration) = cli.duration {
        config.simulation.duration_secs = duration;
    }

    if cli.print_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    if cli.simulate {
        simulate(config).await
    } else {
        run_single(config).await
    }
}

async fn simulate(config: FlockConfig) -> Result<()> {
    let secs = config.simulation.duration_secs;
    anyhow::ensure!(
        secs.is_finite() && secs > 0.0,
        "simulation duration must be positive, got {}",
        secs
    );
    let report = SwarmSimulation::new(config)?
        .run(Duration::from_secs_f64(secs))
        .await?;

    for agent in &report.agents {
        println!(
            "{:<10} x={:>8.3} y={:>8.3} theta={:>7.3}  global={:>7.3} local={:>7.3} neighbors={} watchdog={}",
            agent.name,
            agent.pose.x,
            agent.pose.y,
            agent.pose.theta,
            agent.global_heading,
            agent.local_heading,
            agent.neighbors,
            agent.watchdog_fired
        );
    }
    println!(
        "spread {:.3}, alignment {:.3} after {:.1}s",
        report.spread(),
        report.alignment(),
        report.elapsed.as_secs_f64()
    );
    Ok(())
}

async fn run_single(config: FlockConfig) -> Result<()> {
    let settings = config.settings()?;
    let name = settings.name.clone();
    let ctx = AgentContext::new(settings, std::time::Instant::now());

    let (transport, writer) = StdioTransport::spawn(&name);
    let (inputs, inbox) = inbox();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let stdin_closed = spawn_stdin_reader(inputs).context("Failed to start the stdin bridge")?;
    let agent = tokio::spawn(run_agent(ctx, inbox, transport, shutdown_rx));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("Failed to listen for ctrl-c: {}", e);
            }
            info!("Shutting down");
        }
        _ = stdin_closed => {
            info!("stdin closed; shutting down");
        }
    }

    let _ = shutdown_tx.send(true);
    let ctx = agent.await?;
    // The transport was dropped with the agent, so the writer drains and exits.
    writer.await?;
    info!(
        agent = %ctx.name(),
        "Stopped after {} watchdog stops and {} dropped broadcasts",
        ctx.watchdog_fired(),
        ctx.parse_failures()
    );
    Ok(())
}
