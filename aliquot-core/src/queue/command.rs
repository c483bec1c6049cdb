//! Queued commands
//!
//! A command pairs a human-readable description with the motion actions
//! that carry it out. Plunger targets are fixed when the command is
//! built; head targets stay symbolic until replay.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::labware::Location;
use crate::motion::{Axis, MoveStrategy};
use crate::traits::MotionWarning;

/// A single motion primitive
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Move the head over a location
    MoveTo {
        location: Location,
        strategy: MoveStrategy,
    },
    /// Move a plunger to an absolute position, optionally at a new speed
    MovePlunger {
        axis: Axis,
        position: f64,
        speed: Option<f64>,
    },
    /// Wait
    Dwell { seconds: f64 },
    /// Home an axis
    Home { axis: Axis },
}

/// A described group of actions
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    description: String,
    actions: Vec<Action>,
}

impl Command {
    pub fn new(description: impl Into<String>, actions: Vec<Action>) -> Self {
        Self {
            description: description.into(),
            actions,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

/// Recoverable conditions collected while planning and replaying
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Warning {
    /// Volume is below the pipette's accurate range
    VolumeBelowMinimum { volume: f64, min_volume: f64 },
    /// Motion controller reported a non-fatal condition
    Motion(MotionWarning),
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::VolumeBelowMinimum { volume, min_volume } => write!(
                f,
                "{} uL is below the minimum accurate volume of {} uL",
                volume, min_volume
            ),
            Warning::Motion(w) => write!(f, "{}", w),
        }
    }
}
