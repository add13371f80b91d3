//! Fixed-period simulation loop
//!
//! Every tick advances the rover by `tick_ms` of simulated time. The wall
//! clock interval is `tick_ms / speed_factor`, so a speed factor of 2.0 runs
//! twice as fast as real time with identical physics.
//!
//! The rover sits behind the same mutex the bridge server uses, so a tick
//! and a bridge request never interleave.

use crate::config::{ControlMode, SimConfig};
use crate::error::Result;
use crate::mock::MockRover;
use crate::reflex::{ReflexController, TickReport};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

/// Drives the shared rover forward in time
pub struct Simulation {
    rover: Arc<Mutex<MockRover>>,
    reflex: Option<ReflexController>,
    tick: Duration,
    speed_factor: f32,
    ticks: u64,
}

impl Simulation {
    /// Create the loop; reflex mode attaches the onboard controller
    pub fn new(rover: Arc<Mutex<MockRover>>, config: &SimConfig) -> Result<Self> {
        let reflex = match config.simulation.mode {
            ControlMode::Reflex => Some(ReflexController::new(
                config.reflex.params.clone(),
                config.reflex.hazard.clone(),
            )?),
            ControlMode::Bridge => None,
        };

        Ok(Self {
            rover,
            reflex,
            tick: config.simulation.tick(),
            speed_factor: config.simulation.speed_factor,
            ticks: 0,
        })
    }

    pub fn rover(&self) -> &Arc<Mutex<MockRover>> {
        &self.rover
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Wall-clock time between ticks
    pub fn wall_interval(&self) -> Duration {
        self.tick.div_f32(self.speed_factor)
    }

    /// Run one tick. Returns the controller report in reflex mode.
    pub fn step(&mut self) -> Option<TickReport> {
        let mut rover = lock(&self.rover);
        let report = self
            .reflex
            .as_mut()
            .map(|reflex| reflex.tick(&mut *rover));
        rover.advance(self.tick);
        self.ticks += 1;
        report
    }

    /// Tick until the running flag is cleared
    pub fn run(&mut self, running: &AtomicBool) {
        let interval = self.wall_interval();
        log::info!(
            "Simulation loop started: mode={}, tick={:?}, speed_factor={}, interval={:?}",
            if self.reflex.is_some() { "reflex" } else { "bridge" },
            self.tick,
            self.speed_factor,
            interval
        );

        while running.load(Ordering::Relaxed) {
            let loop_start = Instant::now();
            self.step();

            let elapsed = loop_start.elapsed();
            if elapsed < interval {
                thread::sleep(interval - elapsed);
            } else if self.ticks % 100 == 0 {
                log::debug!("Tick overran: {:?} > {:?}", elapsed, interval);
            }
        }

        let rover = lock(&self.rover);
        log::info!(
            "Simulation loop stopped after {} ticks ({:.1}s simulated, {} collisions)",
            self.ticks,
            rover.sim_time().as_secs_f32(),
            rover.collisions()
        );
    }
}

fn lock(rover: &Mutex<MockRover>) -> MutexGuard<'_, MockRover> {
    rover.lock().unwrap_or_else(|e| e.into_inner())
}
