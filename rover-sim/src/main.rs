//! rover-sim - simulator daemon
//!
//! Runs the stand-in rover and serves the bridge protocol on TCP.
//!
//! ```bash
//! rover-sim                                # bridge mode, ./rover-sim.toml if present
//! rover-sim --config sim.toml --mode reflex
//! rover-sim --bind 127.0.0.1:6000 --seed 42
//! ```
//!
//! ## Threads
//!
//! - **sim-tick**: advances physics every tick (runs the reflex controller
//!   in reflex mode)
//! - **main**: bridge accept loop, one `bridge-<addr>` thread per client

use clap::Parser;
use rover_bridge::BridgeServer;
use rover_sim::{ControlMode, MockRover, SimConfig, SimError, Simulation};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

const DEFAULT_CONFIG: &str = "rover-sim.toml";

#[derive(Parser, Debug)]
#[command(name = "rover-sim")]
#[command(about = "Rover simulator with TCP bridge and onboard reflex controller")]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Control mode: bridge or reflex
    #[arg(short, long)]
    mode: Option<ControlMode>,

    /// TCP bind address, overrides [network].bind_address
    #[arg(short, long)]
    bind: Option<String>,

    /// Rock scatter seed (0 = random)
    #[arg(short, long)]
    seed: Option<u64>,
}

fn load_config(args: &Args) -> rover_sim::Result<SimConfig> {
    let mut config = match &args.config {
        Some(path) => SimConfig::load(path)?,
        None if Path::new(DEFAULT_CONFIG).exists() => SimConfig::load(Path::new(DEFAULT_CONFIG))?,
        None => SimConfig::default(),
    };

    if let Some(mode) = args.mode {
        config.simulation.mode = mode;
    }
    if let Some(bind) = &args.bind {
        config.network.bind_address = bind.clone();
    }
    if let Some(seed) = args.seed {
        config.simulation.seed = seed;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> rover_sim::Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("rover-sim v{} starting...", env!("CARGO_PKG_VERSION"));
    match &args.config {
        Some(path) => log::info!("Using config: {}", path.display()),
        None => log::info!("Using default configuration"),
    }
    log::info!(
        "Mode: {}, camera {}x{} ({}° fov), {} rocks",
        config.simulation.mode,
        config.camera.width,
        config.camera.height,
        config.camera.fov,
        config.simulation.scatter.rock_count
    );

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| SimError::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let rover = Arc::new(Mutex::new(MockRover::new(&config)?));

    let mut simulation = Simulation::new(Arc::clone(&rover), &config)?;
    let sim_running = Arc::clone(&running);
    let sim_handle = thread::Builder::new()
        .name("sim-tick".to_string())
        .spawn(move || simulation.run(&sim_running))
        .map_err(|e| SimError::Other(format!("Failed to spawn simulation thread: {}", e)))?;

    let server = match BridgeServer::bind(
        config.network.bind_address.as_str(),
        rover,
        Arc::clone(&running),
    ) {
        Ok(server) => server,
        Err(e) => {
            running.store(false, Ordering::Relaxed);
            let _ = sim_handle.join();
            return Err(e.into());
        }
    };
    log::info!("rover-sim running. Press Ctrl-C to stop.");
    let served = server.run();

    running.store(false, Ordering::Relaxed);
    if sim_handle.join().is_err() {
        log::error!("Simulation thread panicked");
    }

    served?;
    log::info!("rover-sim stopped");
    Ok(())
}
