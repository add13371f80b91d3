//! rover-hud - live risk readout
//!
//! Polls the simulator camera and prints the left/center/right edge
//! density as bars. Pair it with `rover-teleop` to see what the
//! environment's risk estimator sees while driving.
//!
//! ```bash
//! rover-hud --interval-ms 50
//! rover-hud --snapshot last.png --edges last-edges.png
//! ```

use clap::Parser;
use rover_bridge::{ClientConfig, Connection, Frame};
use rover_gym::EnvConfig;
use rover_perception::{EdgeRiskEstimator, ObstacleRisk, RiskTriple, to_gray};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

const BAR_WIDTH: usize = 20;

#[derive(Parser, Debug)]
#[command(name = "rover-hud")]
#[command(about = "Show the obstacle risk of the simulator camera feed")]
struct Args {
    /// Environment configuration (TOML) for bridge and risk settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Poll period in milliseconds
    #[arg(short, long, default_value_t = 50)]
    interval_ms: u64,

    /// Save the last frame as PNG on exit
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Save the last edge map as PNG on exit
    #[arg(long)]
    edges: Option<PathBuf>,
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
    let config = match &args.config {
        Some(path) => EnvConfig::load(path)?,
        None => EnvConfig::from_env()?,
    };
    let estimator = EdgeRiskEstimator::new(config.risk.clone())?;

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        r.store(false, Ordering::Relaxed);
    })?;

    let mut conn = connect(&config.bridge)?;
    let interval = Duration::from_millis(args.interval_ms.max(1));
    let mut last_frame: Option<Frame> = None;
    let mut frames = 0u64;

    while running.load(Ordering::Relaxed) {
        let started = Instant::now();

        let frame = conn.get_frame()?;
        let risk = estimator.risk(&frame);
        println!("{}", render_bars(&risk));
        frames += 1;
        last_frame = Some(frame);

        if let Some(remaining) = interval.checked_sub(started.elapsed()) {
            thread::sleep(remaining);
        }
    }
    log::info!("HUD stopped after {} frames", frames);

    if let Some(frame) = &last_frame {
        if let Some(path) = &args.snapshot {
            save_frame(frame, path)?;
            log::info!("Saved frame to {}", path.display());
        }
        if let Some(path) = &args.edges {
            estimator.edge_map(frame).save(path)?;
            log::info!("Saved edge map to {}", path.display());
        }
    }
    Ok(())
}

fn connect(config: &ClientConfig) -> rover_bridge::Result<Connection> {
    log::info!("Connecting to simulator at {}", config.address());
    Connection::from_config(config)
}

/// One line of `L [####      ] 0.40  C [...] ...`
fn render_bars(risk: &RiskTriple) -> String {
    [("L", risk.left), ("C", risk.center), ("R", risk.right)]
        .iter()
        .map(|(label, value)| {
            let filled = ((value.clamp(0.0, 1.0) * BAR_WIDTH as f32).round() as usize).min(BAR_WIDTH);
            format!(
                "{} [{}{}] {:.2}",
                label,
                "#".repeat(filled),
                " ".repeat(BAR_WIDTH - filled),
                value
            )
        })
        .collect::<Vec<_>>()
        .join("  ")
}

/// Write a BGR frame as an RGB PNG; frames with fewer channels go out as gray
fn save_frame(frame: &Frame, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let channels = frame.channels() as usize;
    if channels < 3 {
        to_gray(frame).save(path)?;
        return Ok(());
    }

    let rgb: Vec<u8> = frame
        .data()
        .chunks_exact(channels)
        .flat_map(|px| [px[2], px[1], px[0]])
        .collect();
    let image = image::RgbImage::from_raw(frame.width(), frame.height(), rgb)
        .ok_or("frame buffer does not match its dimensions")?;
    image.save(path)?;
    Ok(())
}
