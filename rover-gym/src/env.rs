//! Reset/step training environment
//!
//! # States
//!
//! ```text
//!              reset()                    reset()
//! Unconnected ─────────▶ Connected ─────────────▶ EpisodeActive ──┐
//!      ▲          (lazy connect)                       │  ▲       │ step()
//!      │                                               │  └───────┘
//!      └────────────── transport error ────────────────┘
//! ```
//!
//! # Step
//!
//! ```text
//! action ─▶ SET_V vl vr ─▶ GET_FRAME ─▶ risk(L, C, R) ─▶ reward, info
//! ```
//!
//! A transport or protocol error drops the connection and the episode. The
//! environment never reconnects on its own; the next `reset()` does.

use crate::action::{Action, ActionSpace, ObservationSpace};
use crate::config::EnvConfig;
use crate::episode::{EpisodeState, TerminationPolicy};
use crate::error::{EnvError, Result};
use crate::reward::RewardWeights;
use rover_bridge::{ClientConfig, Connection, Frame, WheelCommand};
use rover_perception::{EdgeRiskEstimator, ObstacleRisk, RiskTriple};
use std::io::{Read, Write};
use std::net::TcpStream;

/// Opens bridge connections for the environment
pub trait Connector {
    type Stream: Read + Write;

    fn connect(&mut self) -> rover_bridge::Result<Connection<Self::Stream>>;
}

/// TCP connector using a [`ClientConfig`]
#[derive(Debug, Clone)]
pub struct TcpConnector {
    config: ClientConfig,
}

impl TcpConnector {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    fn connect(&mut self) -> rover_bridge::Result<Connection<TcpStream>> {
        log::info!("Connecting to simulator at {}", self.config.address());
        Connection::from_config(&self.config)
    }
}

/// Diagnostics returned with every step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepInfo {
    pub risk: RiskTriple,
    pub progress_delta: f32,
    /// Collision detected on this step
    pub collision: bool,
    /// Any collision so far this episode
    pub collided: bool,
    /// Wheel velocities sent this step
    pub command: WheelCommand,
    pub cumulative_energy: f32,
    pub steps: u32,
}

/// Result of one `step()`
#[derive(Debug, Clone)]
pub struct Step {
    pub observation: Frame,
    pub reward: f32,
    pub terminated: bool,
    pub truncated: bool,
    pub info: StepInfo,
}

/// Training environment over the rover bridge
pub struct RoverEnv<C: Connector = TcpConnector, R: ObstacleRisk = EdgeRiskEstimator> {
    connector: C,
    risk: R,
    connection: Option<Connection<C::Stream>>,
    episode: Option<EpisodeState>,
    actions: ActionSpace,
    observations: ObservationSpace,
    weights: RewardWeights,
    collision_threshold: f32,
    progress_floor: f32,
    termination: TerminationPolicy,
}

impl RoverEnv {
    /// TCP environment with the edge-density risk estimator
    pub fn new(config: &EnvConfig) -> Result<Self> {
        config.validate()?;
        let risk = EdgeRiskEstimator::new(config.risk.clone())?;
        Ok(Self::with_parts(
            config,
            TcpConnector::new(config.bridge.clone()),
            risk,
        ))
    }
}

impl<C: Connector, R: ObstacleRisk> RoverEnv<C, R> {
    /// Build from explicit connector and risk model
    pub fn with_parts(config: &EnvConfig, connector: C, risk: R) -> Self {
        Self {
            connector,
            risk,
            connection: None,
            episode: None,
            actions: ActionSpace::new(config.action_mode),
            observations: ObservationSpace::new(config.frame_height, config.frame_width),
            weights: config.reward.clone(),
            collision_threshold: config.collision_threshold,
            progress_floor: config.progress_floor,
            termination: config.termination.clone(),
        }
    }

    pub fn action_space(&self) -> ActionSpace {
        self.actions
    }

    pub fn observation_space(&self) -> ObservationSpace {
        self.observations
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Current episode, if `reset()` has succeeded since the last failure
    pub fn episode(&self) -> Option<&EpisodeState> {
        self.episode.as_ref()
    }

    /// Start a new episode and return the first observation.
    ///
    /// Connects on first use.
    pub fn reset(&mut self) -> Result<Frame> {
        self.episode = None;
        if self.connection.is_none() {
            self.connection = Some(self.connector.connect()?);
        }

        let frame = self.exchange(|conn| conn.reset())?;
        self.observations.check(&frame)?;
        self.episode = Some(EpisodeState::new());
        log::debug!("Episode reset");
        Ok(frame)
    }

    /// Apply one action and observe the outcome
    pub fn step(&mut self, action: &Action) -> Result<Step> {
        if self.episode.is_none() {
            return Err(EnvError::EpisodeNotStarted);
        }
        let command = self.actions.to_command(action)?;

        let frame = self.exchange(|conn| {
            conn.set_velocity(command.left, command.right)?;
            conn.get_frame()
        })?;
        self.observations.check(&frame)?;
        let risk = self.risk.risk(&frame);

        let episode = self.episode.as_mut().ok_or(EnvError::EpisodeNotStarted)?;
        let progress_delta = episode.advance_progress(risk.center, self.progress_floor);
        let effort = command.effort();
        let collision = risk.center > self.collision_threshold;
        episode.record_step(effort, collision);

        let reward = self.weights.reward(progress_delta, effort, collision);
        let terminated = self.termination.is_terminated(episode);
        let truncated = self.termination.is_truncated(episode);
        if collision {
            log::debug!(
                "Collision at step {} (center risk {:.2})",
                episode.steps,
                risk.center
            );
        }

        Ok(Step {
            observation: frame,
            reward,
            terminated,
            truncated,
            info: StepInfo {
                risk,
                progress_delta,
                collision,
                collided: episode.collided,
                command,
                cumulative_energy: episode.cumulative_energy,
                steps: episode.steps,
            },
        })
    }

    /// Drop the connection and any active episode
    pub fn close(&mut self) {
        if self.connection.take().is_some() {
            log::info!("Disconnected from simulator");
        }
        self.episode = None;
    }

    /// Run a request on the open connection; any failure drops it
    fn exchange<F>(&mut self, request: F) -> Result<Frame>
    where
        F: FnOnce(&mut Connection<C::Stream>) -> rover_bridge::Result<Frame>,
    {
        let conn = self.connection.as_mut().ok_or(EnvError::EpisodeNotStarted)?;
        match request(conn) {
            Ok(frame) => Ok(frame),
            Err(e) => {
                log::warn!("Simulator link failed, dropping connection: {}", e);
                self.close();
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionMode;
    use approx::assert_relative_eq;
    use rover_bridge::protocol::write_frame;
    use rover_bridge::{Command, MockStream};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// Hands out one pre-loaded mock stream per connect
    struct ScriptedConnector {
        streams: VecDeque<MockStream>,
        connects: usize,
    }

    impl ScriptedConnector {
        fn new(streams: Vec<MockStream>) -> Self {
            Self {
                streams: streams.into(),
                connects: 0,
            }
        }
    }

    impl Connector for ScriptedConnector {
        type Stream = MockStream;

        fn connect(&mut self) -> rover_bridge::Result<Connection<MockStream>> {
            self.connects += 1;
            let stream = self.streams.pop_front().ok_or_else(|| {
                rover_bridge::Error::Connection(std::io::ErrorKind::ConnectionRefused.into())
            })?;
            Ok(Connection::from_stream(stream))
        }
    }

    /// Risk model that replays a fixed sequence of center risks
    #[derive(Clone)]
    struct ScriptedRisk(Rc<RefCell<VecDeque<f32>>>);

    impl ScriptedRisk {
        fn new(centers: &[f32]) -> Self {
            Self(Rc::new(RefCell::new(centers.iter().copied().collect())))
        }
    }

    impl ObstacleRisk for ScriptedRisk {
        fn risk(&self, _frame: &Frame) -> RiskTriple {
            let center = self.0.borrow_mut().pop_front().unwrap_or(0.0);
            RiskTriple::new(0.0, center, 0.0)
        }
    }

    fn frame() -> Frame {
        Frame::filled(120, 160, [10, 20, 30]).unwrap()
    }

    /// Mock stream preloaded with `n` frame responses
    fn stream_with_frames(n: usize) -> MockStream {
        let stream = MockStream::new();
        let mut bytes = Vec::new();
        for _ in 0..n {
            write_frame(&mut bytes, &frame()).unwrap();
        }
        stream.inject_read(&bytes);
        stream
    }

    fn env(
        streams: Vec<MockStream>,
        centers: &[f32],
        config: EnvConfig,
    ) -> RoverEnv<ScriptedConnector, ScriptedRisk> {
        RoverEnv::with_parts(
            &config,
            ScriptedConnector::new(streams),
            ScriptedRisk::new(centers),
        )
    }

    fn sent_commands(stream: &MockStream) -> Vec<Command> {
        let written = stream.written();
        let mut reader = written.as_slice();
        let mut commands = Vec::new();
        while !reader.is_empty() {
            commands.push(rover_bridge::protocol::read_command(&mut reader).unwrap());
        }
        commands
    }

    #[test]
    fn test_step_before_reset() {
        let mut env = env(vec![stream_with_frames(1)], &[], EnvConfig::default());
        assert!(matches!(
            env.step(&Action::Discrete(2)),
            Err(EnvError::EpisodeNotStarted)
        ));
        assert!(!env.is_connected());
    }

    #[test]
    fn test_reset_then_step_wire_sequence() {
        let stream = stream_with_frames(2);
        let mut env = env(vec![stream.clone()], &[0.0], EnvConfig::default());

        let first = env.reset().unwrap();
        assert_eq!(first, frame());
        assert_eq!(env.episode(), Some(&EpisodeState::new()));

        let step = env.step(&Action::Discrete(2)).unwrap();
        assert_eq!(
            sent_commands(&stream),
            vec![
                Command::Reset,
                Command::SetVelocity(WheelCommand::new(2.5, 2.5)),
                Command::GetFrame,
            ]
        );

        // Clear view from a fresh episode: full progress, effort 5
        assert_relative_eq!(step.info.progress_delta, 1.0);
        assert_relative_eq!(step.reward, 5.0 - 0.1 - 0.01, epsilon = 1e-5);
        assert!(!step.info.collision);
        assert!(!step.terminated && !step.truncated);
        assert_relative_eq!(step.info.cumulative_energy, 5.0);
    }

    #[test]
    fn test_collision_is_sticky_until_reset() {
        let stream = stream_with_frames(4);
        let mut env = env(vec![stream], &[0.95, 0.1, 0.0], EnvConfig::default());
        env.reset().unwrap();

        let hit = env.step(&Action::Discrete(2)).unwrap();
        assert!(hit.info.collision && hit.info.collided);
        // delta = max(0.05 - 0, -0.1), effort 5
        assert_relative_eq!(hit.reward, 5.0 * 0.05 - 0.1 - 20.0 - 0.01, epsilon = 1e-4);

        let after = env.step(&Action::Discrete(1)).unwrap();
        assert!(!after.info.collision);
        assert!(after.info.collided);

        env.reset().unwrap();
        assert!(!env.episode().unwrap().collided);
    }

    #[test]
    fn test_invalid_action_has_no_side_effects() {
        let stream = stream_with_frames(1);
        let mut env = env(vec![stream.clone()], &[], EnvConfig::default());
        env.reset().unwrap();
        stream.clear_written();

        assert!(matches!(
            env.step(&Action::Discrete(9)),
            Err(EnvError::Configuration(_))
        ));
        assert!(matches!(
            env.step(&Action::Continuous([1.0, 1.0])),
            Err(EnvError::Configuration(_))
        ));
        assert!(stream.written().is_empty());
        assert!(env.is_connected());
    }

    #[test]
    fn test_continuous_actions() {
        let config = EnvConfig {
            action_mode: ActionMode::Continuous,
            ..Default::default()
        };
        let stream = stream_with_frames(2);
        let mut env = env(vec![stream.clone()], &[0.0], config);
        env.reset().unwrap();

        let step = env.step(&Action::Continuous([-1.5, 4.0])).unwrap();
        assert_eq!(step.info.command, WheelCommand::new(-1.5, 4.0));
        assert!(matches!(
            env.step(&Action::Continuous([0.0, 4.5])),
            Err(EnvError::Configuration(_))
        ));
    }

    #[test]
    fn test_transport_error_drops_connection() {
        // Second stream serves the reconnect
        let broken = stream_with_frames(1);
        let spare = stream_with_frames(1);
        let mut env = env(vec![broken, spare], &[], EnvConfig::default());
        env.reset().unwrap();

        let err = env.step(&Action::Discrete(2)).unwrap_err();
        assert!(matches!(err, EnvError::Connection(_)));
        assert!(!env.is_connected());
        assert!(env.episode().is_none());
        assert!(matches!(
            env.step(&Action::Discrete(2)),
            Err(EnvError::EpisodeNotStarted)
        ));

        env.reset().unwrap();
        assert_eq!(env.connector.connects, 2);
    }

    #[test]
    fn test_connect_failure_stays_unconnected() {
        let mut env = env(Vec::new(), &[], EnvConfig::default());
        assert!(matches!(env.reset(), Err(EnvError::Connection(_))));
        assert!(!env.is_connected());
    }

    #[test]
    fn test_wrong_frame_shape() {
        let config = EnvConfig {
            frame_width: 80,
            frame_height: 60,
            ..Default::default()
        };
        let mut env = env(vec![stream_with_frames(1)], &[], config);
        assert!(matches!(
            env.reset(),
            Err(EnvError::ObservationShape {
                expected: (60, 80, 3),
                got: (120, 160, 3)
            })
        ));
        assert!(env.episode().is_none());
    }

    #[test]
    fn test_termination_policy_applied() {
        let config = EnvConfig {
            termination: TerminationPolicy {
                collision_patience: 2,
                max_episode_steps: 0,
            },
            ..Default::default()
        };
        let mut env = env(vec![stream_with_frames(3)], &[0.95, 0.95], config);
        env.reset().unwrap();
        assert!(!env.step(&Action::Discrete(0)).unwrap().terminated);
        assert!(env.step(&Action::Discrete(0)).unwrap().terminated);
    }
}
