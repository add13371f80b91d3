//! rover-rollout - random-policy episodes
//!
//! Smoke test for the training loop: runs a uniformly random policy for a
//! few episodes and reports returns, lengths and collisions.
//!
//! ```bash
//! rover-rollout --episodes 5 --max-steps 200 --seed 7
//! ```

use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rover_gym::{ActionMode, EnvConfig, RoverEnv};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Parser, Debug)]
#[command(name = "rover-rollout")]
#[command(about = "Run random-policy episodes against the simulator")]
struct Args {
    /// Environment configuration (TOML); defaults to ROVER_* / FRAME_* env vars
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of episodes
    #[arg(short, long, default_value_t = 3)]
    episodes: u32,

    /// Step cap per episode, overrides [termination].max_episode_steps
    #[arg(short, long)]
    max_steps: Option<u32>,

    /// Action encoding, overrides action_mode
    #[arg(short, long)]
    action_mode: Option<ActionMode>,

    /// Policy seed (0 = random)
    #[arg(short, long, default_value_t = 0)]
    seed: u64,
}

struct EpisodeSummary {
    total_reward: f32,
    steps: u32,
    collisions: u32,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => EnvConfig::load(path)?,
        None => EnvConfig::from_env()?,
    };
    if let Some(mode) = args.action_mode {
        config.action_mode = mode;
    }
    // An uncapped random walk never ends
    config.termination.max_episode_steps = match args.max_steps {
        Some(steps) => steps,
        None if config.termination.max_episode_steps == 0 => 200,
        None => config.termination.max_episode_steps,
    };

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        r.store(false, Ordering::Relaxed);
    })?;

    let mut rng = if args.seed == 0 {
        StdRng::from_os_rng()
    } else {
        StdRng::seed_from_u64(args.seed)
    };

    let mut env = RoverEnv::new(&config)?;
    let space = env.action_space();
    log::info!(
        "Rolling out {} episodes ({} actions, cap {} steps)",
        args.episodes,
        space.mode(),
        config.termination.max_episode_steps
    );

    let mut summaries = Vec::new();
    for episode in 1..=args.episodes {
        if !running.load(Ordering::Relaxed) {
            break;
        }
        env.reset()?;

        let mut summary = EpisodeSummary {
            total_reward: 0.0,
            steps: 0,
            collisions: 0,
        };
        while running.load(Ordering::Relaxed) {
            let step = env.step(&space.sample(&mut rng))?;
            summary.total_reward += step.reward;
            summary.steps = step.info.steps;
            summary.collisions += u32::from(step.info.collision);
            if step.terminated || step.truncated {
                break;
            }
        }

        log::info!(
            "Episode {}: return {:.2} over {} steps, {} collision steps",
            episode,
            summary.total_reward,
            summary.steps,
            summary.collisions
        );
        summaries.push(summary);
    }
    env.close();

    if !summaries.is_empty() {
        let n = summaries.len() as f32;
        let mean_return = summaries.iter().map(|s| s.total_reward).sum::<f32>() / n;
        let mean_steps = summaries.iter().map(|s| s.steps as f32).sum::<f32>() / n;
        println!(
            "{} episodes: mean return {:.2}, mean length {:.1}",
            summaries.len(),
            mean_return,
            mean_steps
        );
    }
    Ok(())
}
