#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![doc = "A `no_std` library for planar rover motion on a bounded map."]
#![doc = ""]
#![doc = "This crate provides structures and functions for stepping a rover's position"]
#![doc = "from commanded velocities, clamping it into map bounds, and modelling"]
#![doc = "battery drain while idle or under load."]

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod error;
pub use error::KinematicsError;

/// A commanded velocity pair in the rover's base frame.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Twist {
    /// Linear velocity command (map units per step, before scaling).
    pub linear: f64,
    /// Angular velocity command (map units per step, before scaling).
    pub angular: f64,
}

impl Twist {
    /// Construct a new twist.
    ///
    /// # Arguments
    ///
    /// * `linear`: Linear velocity command.
    /// * `angular`: Angular velocity command.
    pub const fn new(linear: f64, angular: f64) -> Self {
        Twist { linear, angular }
    }

    /// Returns `true` when both velocity components are exactly zero.
    ///
    /// A stationary rover drains its battery at the idle rate rather than
    /// the active rate.
    pub fn is_stationary(&self) -> bool {
        self.linear == 0.0 && self.angular == 0.0
    }
}

impl fmt::Display for Twist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(linear: {:.2}, angular: {:.2})", self.linear, self.angular)
    }
}

/// A position on the planar map.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    /// Map x coordinate.
    pub x: f64,
    /// Map y coordinate.
    pub y: f64,
}

impl Position {
    /// Construct a new position.
    ///
    /// # Arguments
    ///
    /// * `x`: Map x coordinate.
    /// * `y`: Map y coordinate.
    pub const fn new(x: f64, y: f64) -> Self {
        Position { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(x: {:.2}, y: {:.2})", self.x, self.y)
    }
}

/// Axis-aligned square map bounds applied to both coordinates.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapBounds {
    /// Lower bound for both coordinates.
    min: f64,
    /// Upper bound for both coordinates.
    max: f64,
}

impl MapBounds {
    /// Construct new map bounds.
    ///
    /// # Arguments
    ///
    /// * `min`: Lower bound for both coordinates.
    /// * `max`: Upper bound for both coordinates.
    ///
    /// # Errors
    ///
    /// Returns `Err(KinematicsError::InvalidBounds)` if `min` is not strictly
    /// below `max`.
    pub const fn new(min: f64, max: f64) -> Result<Self, KinematicsError> {
        if min >= max {
            return Err(KinematicsError::InvalidBounds(
                "lower bound must be below upper bound",
            ));
        }
        Ok(MapBounds { min, max })
    }

    /// Returns the lower bound.
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Returns the upper bound.
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Clamps a position into the bounds.
    ///
    /// Clamping is idempotent: clamping an already in-bounds position
    /// returns it unchanged.
    ///
    /// # Arguments
    ///
    /// * `position`: The position to clamp.
    ///
    /// # Returns
    ///
    /// The position with both coordinates clamped into `[min, max]`.
    pub fn clamp(&self, position: Position) -> Position {
        Position {
            x: position.x.clamp(self.min, self.max),
            y: position.y.clamp(self.min, self.max),
        }
    }
}

impl fmt::Display for MapBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.1}, {:.1}]", self.min, self.max)
    }
}

/// Planar drive model stepping position from commanded velocities.
///
/// This struct encapsulates the displacement scale factor and the map bounds
/// of a simulated rover. The mapping is deliberately simplified: the angular
/// command displaces along the x-axis and the linear command along the
/// y-axis, with both displacements subtracted (a screen-style coordinate
/// convention where "forward" decreases y). It is not a differential-drive
/// model.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarDrive {
    /// Displacement per unit velocity per step.
    scale: f64,
    /// Map bounds applied after every step.
    bounds: MapBounds,
}

impl PlanarDrive {
    /// Construct a new planar drive model.
    ///
    /// # Arguments
    ///
    /// * `scale`: Displacement applied per unit of commanded velocity per step.
    /// * `bounds`: Map bounds the position is clamped into after each step.
    ///
    /// # Errors
    ///
    /// Returns `Err(KinematicsError::InvalidScale)` if `scale` is not positive.
    pub const fn new(scale: f64, bounds: MapBounds) -> Result<Self, KinematicsError> {
        if scale <= 0.0 {
            return Err(KinematicsError::InvalidScale("must be positive"));
        }
        Ok(PlanarDrive { scale, bounds })
    }

    /// Returns the displacement scale factor.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Returns the map bounds.
    pub fn bounds(&self) -> MapBounds {
        self.bounds
    }

    /// Steps the position by one tick of the given twist.
    ///
    /// The angular command maps to x-axis displacement and the linear command
    /// to y-axis displacement, both scaled and subtracted. The result is
    /// clamped into the map bounds, so a step can never leave the map.
    ///
    /// # Arguments
    ///
    /// * `position`: The position before the step.
    /// * `twist`: The commanded velocities applied over this step.
    ///
    /// # Returns
    ///
    /// The clamped position after the step.
    pub fn step(&self, position: Position, twist: Twist) -> Position {
        let unclamped = Position {
            x: position.x - twist.angular * self.scale,
            y: position.y - twist.linear * self.scale,
        };
        self.bounds.clamp(unclamped)
    }
}

impl fmt::Display for PlanarDrive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlanarDrive (scale: {:.2}, bounds: {})", self.scale, self.bounds)
    }
}

/// Battery drain model with distinct idle and active rates.
///
/// The battery level is a percentage in `[0, 100]`. Drain never takes the
/// level below zero, and the model never increases the level; charging is an
/// external event outside this crate.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerModel {
    /// Drain per step while stationary.
    idle_drain: f64,
    /// Drain per step while either velocity component is non-zero.
    active_drain: f64,
}

impl PowerModel {
    /// Construct a new power model.
    ///
    /// # Arguments
    ///
    /// * `idle_drain`: Battery percentage drained per step while stationary.
    /// * `active_drain`: Battery percentage drained per step while moving.
    ///
    /// # Errors
    ///
    /// Returns `Err(KinematicsError::InvalidDrainRate)` if either rate is
    /// negative, or if `idle_drain` exceeds `active_drain`.
    pub const fn new(idle_drain: f64, active_drain: f64) -> Result<Self, KinematicsError> {
        if idle_drain < 0.0 || active_drain < 0.0 {
            return Err(KinematicsError::InvalidDrainRate("must be non-negative"));
        }
        if idle_drain > active_drain {
            return Err(KinematicsError::InvalidDrainRate(
                "idle rate must not exceed active rate",
            ));
        }
        Ok(PowerModel {
            idle_drain,
            active_drain,
        })
    }

    /// Returns the idle drain rate.
    pub fn idle_drain(&self) -> f64 {
        self.idle_drain
    }

    /// Returns the active drain rate.
    pub fn active_drain(&self) -> f64 {
        self.active_drain
    }

    /// Drains the battery by one step.
    ///
    /// The applied rate is `idle_drain` when the twist is stationary and
    /// `active_drain` otherwise. The result is floored at zero.
    ///
    /// # Arguments
    ///
    /// * `level`: Battery level before the step, as a percentage.
    /// * `twist`: The commanded velocities during this step.
    ///
    /// # Returns
    ///
    /// The battery level after the step.
    pub fn drain(&self, level: f64, twist: Twist) -> f64 {
        let rate = if twist.is_stationary() {
            self.idle_drain
        } else {
            self.active_drain
        };
        (level - rate).max(0.0)
    }
}

impl fmt::Display for PowerModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PowerModel (idle: {:.3}/step, active: {:.3}/step)",
            self.idle_drain, self.active_drain
        )
    }
}
