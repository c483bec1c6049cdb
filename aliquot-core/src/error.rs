//! Errors raised while planning pipette operations
//!
//! Every fault is raised before anything is enqueued for the failing
//! operation, so the queue and pipette state are left as they were.

use core::fmt;

use crate::traits::{MotionError, ResolveError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Malformed arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum InvalidArgument {
    /// Tip policy is not one of `always`, `once`, `never`
    UnknownTipPolicy,
    /// Volume list length differs from the number of transfers
    VolumeCountMismatch { volumes: usize, transfers: usize },
    /// Neither location count divides the other
    NotDivisible { sources: usize, destinations: usize },
    /// No sources or no destinations were given
    EmptyLocations,
    /// Plunger position needed for this operation is not calibrated
    UncalibratedPosition,
    /// Plunger position name is not recognised
    UnknownPosition,
    /// Volume is negative or not a number
    NegativeVolume,
    /// Calibration values are not ordered top < bottom < blow_out/drop_tip
    InvalidCalibration,
    /// Volume bounds do not satisfy 0 < min_volume < max_volume
    InvalidCapacity,
    /// Channel count must be 1 or a full row
    InvalidChannels,
    /// Axis does not drive a plunger
    InvalidAxis,
    /// Speed or rate is negative or not a number
    InvalidSpeed,
    /// Air gap leaves no room for liquid
    AirGapTooLarge,
    /// Tip is not in any rack bound to the pipette
    UnknownTip,
    /// Delay is negative or not a number
    NegativeDuration,
    /// Volume is infinite or would need too many tip loads
    UnboundedVolume,
}

impl fmt::Display for InvalidArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidArgument::UnknownTipPolicy => {
                write!(f, "tip policy must be one of \"always\", \"once\" or \"never\"")
            }
            InvalidArgument::VolumeCountMismatch { volumes, transfers } => write!(
                f,
                "{} volumes given for {} transfers",
                volumes, transfers
            ),
            InvalidArgument::NotDivisible {
                sources,
                destinations,
            } => write!(
                f,
                "{} sources and {} destinations cannot be paired",
                sources, destinations
            ),
            InvalidArgument::EmptyLocations => write!(f, "no locations given"),
            InvalidArgument::UncalibratedPosition => {
                write!(f, "plunger position is not calibrated")
            }
            InvalidArgument::UnknownPosition => write!(f, "unknown plunger position"),
            InvalidArgument::NegativeVolume => write!(f, "volume must not be negative"),
            InvalidArgument::InvalidCalibration => write!(f, "plunger calibration is not ordered"),
            InvalidArgument::InvalidCapacity => {
                write!(f, "volume bounds must satisfy 0 < min < max")
            }
            InvalidArgument::InvalidChannels => write!(f, "unsupported channel count"),
            InvalidArgument::InvalidAxis => write!(f, "axis does not drive a plunger"),
            InvalidArgument::InvalidSpeed => write!(f, "speed must not be negative"),
            InvalidArgument::AirGapTooLarge => write!(f, "air gap leaves no room for liquid"),
            InvalidArgument::UnknownTip => write!(f, "tip is not in a bound rack"),
            InvalidArgument::NegativeDuration => write!(f, "delay must not be negative"),
            InvalidArgument::UnboundedVolume => write!(f, "volume is too large to plan"),
        }
    }
}

/// Errors from pipette and planner operations
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PipetteError {
    /// Malformed argument
    InvalidArgument(InvalidArgument),
    /// Aspirating would overfill the tip
    ExceedsCapacity { requested: f64, available: f64 },
    /// Volume is outside 0..=max_volume
    VolumeOutOfRange { volume: f64 },
    /// Every tip in every bound rack has been used
    OutOfTips,
    /// A tip is already mounted
    TipAlreadyAttached,
    /// Operation needs a tip and none is mounted
    NoTip,
    /// A volume exceeds capacity and carryover is disabled
    CarryoverDisabled { volume: f64, max: f64 },
    /// Air held in the tip must be dispensed before aspirating liquid
    AirGapNotCleared,
    /// No location given and the pipette has not been anywhere yet
    NoLocation,
    /// Operation needs a trash container and none is bound
    NoTrash,
    /// Motion controller fault while reading a position
    Motion(MotionError),
    /// Location could not be resolved
    Resolve(ResolveError),
}

impl From<InvalidArgument> for PipetteError {
    fn from(e: InvalidArgument) -> Self {
        PipetteError::InvalidArgument(e)
    }
}

impl From<MotionError> for PipetteError {
    fn from(e: MotionError) -> Self {
        PipetteError::Motion(e)
    }
}

impl From<ResolveError> for PipetteError {
    fn from(e: ResolveError) -> Self {
        PipetteError::Resolve(e)
    }
}

impl fmt::Display for PipetteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipetteError::InvalidArgument(e) => write!(f, "invalid argument: {}", e),
            PipetteError::ExceedsCapacity {
                requested,
                available,
            } => write!(
                f,
                "cannot aspirate {} uL, only {} uL of capacity remains",
                requested, available
            ),
            PipetteError::VolumeOutOfRange { volume } => {
                write!(f, "volume {} uL is outside the pipette's range", volume)
            }
            PipetteError::OutOfTips => write!(f, "no tips left in any bound rack"),
            PipetteError::TipAlreadyAttached => write!(f, "a tip is already attached"),
            PipetteError::NoTip => write!(f, "no tip attached"),
            PipetteError::CarryoverDisabled { volume, max } => write!(
                f,
                "{} uL exceeds the {} uL capacity and carryover is disabled",
                volume, max
            ),
            PipetteError::AirGapNotCleared => {
                write!(f, "air gap must be dispensed before aspirating liquid")
            }
            PipetteError::NoLocation => write!(f, "no location given and no previous location"),
            PipetteError::NoTrash => write!(f, "no trash container bound"),
            PipetteError::Motion(e) => write!(f, "motion error: {}", e),
            PipetteError::Resolve(e) => write!(f, "resolve error: {}", e),
        }
    }
}
