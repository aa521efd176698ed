//! ADAS Simulation Runner
//!
//! Drives the simulation core from a fixed-interval timer, standing in for
//! the render/input loop of an interactive front end.

use std::path::Path;
use std::time::Duration;

use adas_sim::{
    InputSource, LateralPhase, Mode, ScriptedInput, Side, SimConfig, SimError, Simulation,
    SimulationSnapshot, SpeedAdjust, TickInput,
};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Runner error types
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Simulation error: {0}")]
    Simulation(#[from] SimError),

    #[error("Snapshot encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Logging setup failed: {0}")]
    Logging(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,

    /// One JSON object per event
    Json,
}

/// Runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Time between ticks (milliseconds)
    pub tick_interval_ms: u64,

    /// Ticks to run, 0 runs until interrupted
    pub max_ticks: u64,

    /// Log every snapshot as JSON
    pub log_snapshots: bool,

    /// Log line format
    pub log_format: LogFormat,

    /// Simulation tuning
    pub simulation: SimConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 20,
            max_ticks: 600,
            log_snapshots: false,
            log_format: LogFormat::Text,
            simulation: SimConfig::default(),
        }
    }
}

impl RunnerConfig {
    /// Layer defaults, an optional TOML file and `ADAS_SIM__*` variables
    pub fn load(path: Option<&Path>) -> Result<Self, RunnerError> {
        let mut builder = Config::builder().add_source(Config::try_from(&RunnerConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let config = builder
            .add_source(
                Environment::with_prefix("ADAS_SIM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

/// Counters collected over a run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub ticks: u64,
    pub mode_changes: u64,
    pub lane_changes: u64,
    pub departures: u64,
    pub minimum_gap_ticks: u64,
    pub last: Option<SimulationSnapshot>,
}

impl RunSummary {
    /// Fold one snapshot into the counters
    pub fn record(&mut self, snapshot: SimulationSnapshot) {
        self.ticks += 1;

        if snapshot.mode_changed.is_some() {
            self.mode_changes += 1;
        }
        if snapshot.minimum_gap_reached {
            self.minimum_gap_ticks += 1;
        }

        if let Some(previous) = &self.last {
            if previous.ego.lane_index != snapshot.ego.lane_index {
                self.lane_changes += 1;
            }
            if previous.phase == LateralPhase::Idle && snapshot.phase == LateralPhase::Departing {
                self.departures += 1;
            }
        } else if snapshot.phase == LateralPhase::Departing {
            self.departures += 1;
        }

        self.last = Some(snapshot);
    }
}

/// Built-in drive: cruise up to the target, change lane, get blocked,
/// overtake, try lane keeping, then brake
pub fn demo_script() -> ScriptedInput {
    let mut script = ScriptedInput::default();
    script
        .idle(25)
        .then(TickInput::mode(Mode::AdaptiveCruise))
        .idle(360)
        .then(TickInput::steer(Side::Right))
        .idle(20)
        .then(TickInput::steer(Side::Left))
        .idle(20)
        .then(TickInput::speed(SpeedAdjust::Faster))
        .then(TickInput::speed(SpeedAdjust::Faster))
        .then(TickInput::speed(SpeedAdjust::Faster))
        .idle(60)
        .then(TickInput::mode(Mode::LaneKeep))
        .then(TickInput::steer(Side::Left))
        .idle(20)
        .then(TickInput::mode(Mode::Emergency))
        .idle(30)
        .then(TickInput::mode(Mode::Manual));
    script
}

/// Run the simulation on a fixed interval until `max_ticks` is reached
pub async fn run(config: &RunnerConfig, source: &mut impl InputSource) -> Result<RunSummary, RunnerError> {
    let mut sim = Simulation::new(config.simulation.clone())?;
    let mut interval = tokio::time::interval(Duration::from_millis(config.tick_interval_ms.max(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        "Starting simulation: {} ticks every {} ms",
        config.max_ticks, config.tick_interval_ms
    );

    let mut summary = RunSummary::default();
    while config.max_ticks == 0 || summary.ticks < config.max_ticks {
        interval.tick().await;
        let snapshot = sim.step(source);

        if config.log_snapshots {
            debug!("{}", serde_json::to_string(&snapshot)?);
        }
        summary.record(snapshot);
    }

    info!(
        "Simulation finished after {} ticks ({} mode changes, {} lane changes, {} departures)",
        summary.ticks, summary.mode_changes, summary.lane_changes, summary.departures
    );
    Ok(summary)
}

/// Install the global subscriber
///
/// Snapshot logging is emitted at DEBUG, so enabling it also lowers the level.
pub fn init_logging(config: &RunnerConfig) -> Result<(), RunnerError> {
    let level = if config.log_snapshots { Level::DEBUG } else { Level::INFO };
    let builder = FmtSubscriber::builder().with_max_level(level);

    match config.log_format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.with_target(true).finish())?,
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
    }
    Ok(())
}
