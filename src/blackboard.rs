use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use rover_kinematics::{Position, Twist};

/// Lower map bound for both position axes.
pub const MAP_MIN: f64 = 0.0;
/// Upper map bound for both position axes.
pub const MAP_MAX: f64 = 100.0;

/// Operating mode reported in telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Velocities come from operator commands on the control channel.
    #[default]
    Manual,
    /// Velocities come from an onboard planner (not part of this simulator).
    Autonomous,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Manual => write!(f, "manual"),
            Mode::Autonomous => write!(f, "autonomous"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RobotState {
    pub twist: Twist,
    pub position: Position,
    pub battery_level: f64,
    pub mode: Mode,
}

impl RobotState {
    pub fn new(position: Position, battery_level: f64, mode: Mode) -> Self {
        RobotState {
            twist: Twist::default(),
            position,
            battery_level,
            mode,
        }
    }
}

impl Default for RobotState {
    fn default() -> Self {
        RobotState::new(
            Position::new(50.0, 50.0), // map centre
            100.0,
            Mode::Manual,
        )
    }
}

pub type Blackboard = Arc<RwLock<RobotState>>;

pub fn snapshot(bb: &Blackboard) -> RobotState {
    (*bb.read()).clone()
}

/// Overwrites the commanded velocity pair.
///
/// Both components are stored under a single write lock, so a concurrent
/// snapshot never observes one old and one new component.
pub fn set_twist(bb: &Blackboard, twist: Twist) {
    bb.write().twist = twist;
}
