//! Motion controller trait
//!
//! This trait abstracts over whatever drives the head and plunger axes:
//! a serial motion controller, a virtual controller, or the recording
//! port used for simulation.

use core::fmt;

use crate::motion::{Axis, Coordinate};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Errors reported by a motion controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MotionError {
    /// Controller is not connected
    Disconnected,
    /// Controller did not acknowledge in time
    Timeout,
    /// A limit switch was hit on this axis
    LimitReached(Axis),
    /// Axis position is unknown until homed
    NotHomed(Axis),
    /// Axis is not driven by this controller
    UnsupportedAxis(Axis),
    /// Target could not be represented (NaN or infinite)
    InvalidTarget,
}

impl fmt::Display for MotionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotionError::Disconnected => write!(f, "motion controller disconnected"),
            MotionError::Timeout => write!(f, "motion controller timed out"),
            MotionError::LimitReached(axis) => write!(f, "limit switch hit on axis {}", axis),
            MotionError::NotHomed(axis) => write!(f, "axis {} is not homed", axis),
            MotionError::UnsupportedAxis(axis) => write!(f, "axis {} is not supported", axis),
            MotionError::InvalidTarget => write!(f, "invalid motion target"),
        }
    }
}

/// Non-fatal conditions raised while moving
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MotionWarning {
    /// Requested head target was outside the travel envelope and was clamped
    TravelClamped {
        requested: Coordinate,
        reached: Coordinate,
    },
    /// Requested plunger target was outside the axis travel and was clamped
    PlungerClamped { axis: Axis, requested: f64, reached: f64 },
}

impl fmt::Display for MotionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotionWarning::TravelClamped { requested, reached } => {
                write!(f, "head target {} clamped to {}", requested, reached)
            }
            MotionWarning::PlungerClamped {
                axis,
                requested,
                reached,
            } => write!(
                f,
                "plunger {} target {} clamped to {}",
                axis, requested, reached
            ),
        }
    }
}

/// Target and measured position of an axis or of the head
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PositionReport<T> {
    /// Position last commanded
    pub target: T,
    /// Position reached
    pub current: T,
}

impl<T: Copy> PositionReport<T> {
    /// A report for an axis that is at rest at its target
    pub const fn settled(position: T) -> Self {
        Self {
            target: position,
            current: position,
        }
    }
}

/// Trait for motion controllers
///
/// All moves are blocking from the caller's point of view: when a method
/// returns `Ok`, the axis has reached its target.
pub trait MotionPort {
    /// Move the head to an absolute deck coordinate
    fn move_head(&mut self, target: Coordinate) -> Result<(), MotionError>;

    /// Move a plunger axis to an absolute position in millimetres
    fn move_plunger(&mut self, axis: Axis, position: f64) -> Result<(), MotionError>;

    /// Set the plunger speed multiplier used by subsequent plunger moves
    fn set_plunger_speed(&mut self, axis: Axis, speed: f64) -> Result<(), MotionError>;

    /// Home an axis against its endstop
    fn home(&mut self, axis: Axis) -> Result<(), MotionError>;

    /// Hold still for a number of seconds
    fn dwell(&mut self, seconds: f64) -> Result<(), MotionError>;

    /// Current head position
    fn head_position(&self) -> PositionReport<Coordinate>;

    /// Current plunger position
    fn plunger_position(&self, axis: Axis) -> PositionReport<f64>;

    /// Pop the oldest pending warning, if the controller produces any
    fn take_warning(&mut self) -> Option<MotionWarning> {
        None
    }
}
