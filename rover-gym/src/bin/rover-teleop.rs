//! rover-teleop - keyboard driving over the bridge
//!
//! Reads keys from stdin (line buffered; type keys and press Enter) and
//! streams the selected wheel velocities at 20 Hz.
//!
//! ```bash
//! rover-teleop --host 127.0.0.1 --port 5555
//! ```
//!
//! ```text
//!   q  w  e        hard-left  forward  hard-right
//!   a  s  d        left       stop     right
//!   space: stop    x: quit
//! ```

use clap::Parser;
use crossbeam_channel::{Receiver, TryRecvError, bounded};
use rover_bridge::{ClientConfig, Connection};
use rover_gym::teleop::{Drive, KeyAction, parse_line};
use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

const SEND_PERIOD: Duration = Duration::from_millis(50);

#[derive(Parser, Debug)]
#[command(name = "rover-teleop")]
#[command(about = "Drive the simulated rover from the keyboard")]
struct Args {
    /// Simulator host (defaults to ROVER_HOST or 127.0.0.1)
    #[arg(long)]
    host: Option<String>,

    /// Simulator port (defaults to ROVER_PORT or 5555)
    #[arg(short, long)]
    port: Option<u16>,
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
    let mut config = ClientConfig::from_env()?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        r.store(false, Ordering::Relaxed);
    })?;

    let mut conn = Connection::from_config(&config)?;
    log::info!("Connected to {}", config.address());
    println!("keys: w forward, a left, d right, q/e hard turns, s or space stop, x quit");

    let keys = spawn_key_reader()?;
    let mut drive = Drive::Stop;

    while running.load(Ordering::Relaxed) {
        let started = Instant::now();

        match drain_keys(&keys, &mut drive) {
            Some(KeyAction::Quit) => break,
            Some(KeyAction::Drive(_)) | None => {}
        }

        let command = drive.command();
        conn.set_velocity(command.left, command.right)?;

        if let Some(remaining) = SEND_PERIOD.checked_sub(started.elapsed()) {
            thread::sleep(remaining);
        }
    }

    // Leave the rover stopped
    conn.set_velocity(0.0, 0.0)?;
    log::info!("Teleop stopped");
    Ok(())
}

/// Apply all pending keys; returns the last action seen (Quit wins)
fn drain_keys(keys: &Receiver<KeyAction>, drive: &mut Drive) -> Option<KeyAction> {
    let mut last = None;
    loop {
        match keys.try_recv() {
            Ok(KeyAction::Quit) => return Some(KeyAction::Quit),
            Ok(KeyAction::Drive(next)) => {
                if next != *drive {
                    log::info!("{:?} -> {:?}", drive, next);
                }
                *drive = next;
                last = Some(KeyAction::Drive(next));
            }
            Err(TryRecvError::Empty) => return last,
            // Stdin closed
            Err(TryRecvError::Disconnected) => return Some(KeyAction::Quit),
        }
    }
}

fn spawn_key_reader() -> std::io::Result<Receiver<KeyAction>> {
    let (tx, rx) = bounded(64);
    thread::Builder::new()
        .name("teleop-keys".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                for action in parse_line(&line) {
                    if tx.send(action).is_err() {
                        return;
                    }
                }
            }
        })?;
    Ok(rx)
}
