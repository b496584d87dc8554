use config::{Config, ConfigError, File, FileFormat};
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info};

use rover_kinematics::{KinematicsError, MapBounds, PlanarDrive, Position, PowerModel};

use crate::blackboard::{MAP_MAX, MAP_MIN, Mode};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Simulator tuning. Every field has an in-code default matching the
/// reference behaviour, so the binary runs without a config file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Telemetry tick interval in milliseconds.
    pub tick_interval_ms: u64,
    /// Displacement per unit velocity per tick.
    pub motion_scale: f64,
    /// Battery percentage drained per tick while stationary.
    pub idle_drain: f64,
    /// Battery percentage drained per tick while moving.
    pub active_drain: f64,
    /// Starting x position on the map.
    pub start_x: f64,
    /// Starting y position on the map.
    pub start_y: f64,
    /// Starting battery percentage.
    pub start_battery: f64,
    /// Mode tag reported in telemetry.
    pub mode: Mode,
    /// How long the handshake waits for an answer before giving up.
    pub answer_timeout_secs: u64,
    /// Capacity of the inbound command channel.
    pub command_queue_depth: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            tick_interval_ms: 100,
            motion_scale: 0.5,
            idle_drain: 0.01,
            active_drain: 0.05,
            start_x: 50.0, // map centre
            start_y: 50.0,
            start_battery: 100.0,
            mode: Mode::Manual,
            answer_timeout_secs: 30,
            command_queue_depth: 16,
        }
    }
}

impl SimConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn answer_timeout(&self) -> Duration {
        Duration::from_secs(self.answer_timeout_secs)
    }

    pub fn start_position(&self) -> Position {
        Position::new(self.start_x, self.start_y)
    }

    pub fn drive(&self) -> Result<PlanarDrive, KinematicsError> {
        let bounds = MapBounds::new(MAP_MIN, MAP_MAX)?;
        PlanarDrive::new(self.motion_scale, bounds)
    }

    pub fn power(&self) -> Result<PowerModel, KinematicsError> {
        PowerModel::new(self.idle_drain, self.active_drain)
    }
}

pub fn load_config() -> Result<SimConfig, ConfigError> {
    info!("Attempting to load configuration from {}", DEFAULT_CONFIG_PATH);

    let settings = Config::builder()
        .add_source(File::new(DEFAULT_CONFIG_PATH, FileFormat::Toml).required(false))
        .build()
        .and_then(|c| c.try_deserialize::<SimConfig>());

    match settings {
        Ok(config) => {
            info!("Successfully loaded configuration: {:?}", config);
            Ok(config)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            Err(e)
        }
    }
}
