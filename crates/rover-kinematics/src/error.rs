#![warn(missing_docs)]

//! Error types for the planar motion library.
//!
//! This module defines error types that can occur when constructing motion
//! or power models with invalid parameters.

use core::fmt;

/// Errors that can occur when constructing motion or power models.
#[derive(Debug, Clone, PartialEq)]
pub enum KinematicsError {
    /// Error for an invalid motion scale factor.
    /// This variant is returned when a scale factor is provided that is not positive.
    InvalidScale(&'static str),
    /// Error for invalid map bounds.
    /// This variant is returned when the lower bound is not below the upper bound.
    InvalidBounds(&'static str),
    /// Error for invalid battery drain rates.
    /// This variant is returned when a drain rate is negative or the idle rate
    /// exceeds the active rate.
    InvalidDrainRate(&'static str),
}

impl core::fmt::Display for KinematicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KinematicsError::InvalidScale(msg) => write!(f, "Invalid motion scale: {}", msg),
            KinematicsError::InvalidBounds(msg) => write!(f, "Invalid map bounds: {}", msg),
            KinematicsError::InvalidDrainRate(msg) => write!(f, "Invalid drain rate: {}", msg),
        }
    }
}

impl core::error::Error for KinematicsError {}
