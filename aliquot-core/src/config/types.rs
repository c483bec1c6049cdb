//! Configuration type definitions
//!
//! These types describe the pipettes mounted on the robot and the robot's
//! travel limits. They can be built in code or loaded from TOML.

use heapless::{String, Vec};

use super::calibration::PlungerCalibration;
use crate::error::InvalidArgument;
use crate::motion::{Axis, TravelEnvelope};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum pipette name length
pub const MAX_NAME_LEN: usize = 16;

/// Maximum pipettes on one robot (one per plunger axis)
pub const MAX_PIPETTES: usize = 2;

/// Channels in a full row of a standard plate
pub const ROW_CHANNELS: u8 = 8;

/// Default safe travel height above the deck in mm
pub const DEFAULT_SAFE_HEIGHT: f64 = 100.0;

/// Plunger speed multipliers
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Speeds {
    pub aspirate: f64,
    pub dispense: f64,
}

impl Default for Speeds {
    fn default() -> Self {
        Self {
            aspirate: 1.0,
            dispense: 1.0,
        }
    }
}

impl Speeds {
    pub fn validate(&self) -> Result<(), InvalidArgument> {
        // NaN fails both comparisons
        if self.aspirate >= 0.0 && self.dispense >= 0.0 {
            Ok(())
        } else {
            Err(InvalidArgument::InvalidSpeed)
        }
    }
}

/// Pipette configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PipetteConfig {
    /// Display name
    pub name: String<MAX_NAME_LEN>,
    /// Plunger axis (A or B)
    pub axis: Axis,
    /// 1 for single-channel, 8 for a full-row multi-channel
    pub channels: u8,
    /// Capacity in uL
    pub max_volume: f64,
    /// Smallest accurate volume in uL
    pub min_volume: f64,
    pub speeds: Speeds,
    pub plunger: PlungerCalibration,
}

impl Default for PipetteConfig {
    fn default() -> Self {
        let mut name = String::new();
        let _ = name.push_str("p200");
        Self {
            name,
            axis: Axis::B,
            channels: 1,
            max_volume: 200.0,
            min_volume: 10.0,
            speeds: Speeds::default(),
            plunger: PlungerCalibration::default(),
        }
    }
}

impl PipetteConfig {
    /// Check the configuration is usable
    pub fn validate(&self) -> Result<(), InvalidArgument> {
        if !self.axis.is_plunger() {
            return Err(InvalidArgument::InvalidAxis);
        }
        if self.channels != 1 && self.channels != ROW_CHANNELS {
            return Err(InvalidArgument::InvalidChannels);
        }
        if !(self.min_volume > 0.0
            && self.max_volume > self.min_volume
            && self.max_volume.is_finite())
        {
            return Err(InvalidArgument::InvalidCapacity);
        }
        self.speeds.validate()?;
        self.plunger.validate()
    }
}

/// Robot configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RobotConfig {
    /// Height the head travels at between sites
    pub safe_height: f64,
    /// Head travel limits
    pub envelope: TravelEnvelope,
    /// Mounted pipettes
    #[cfg_attr(feature = "serde", serde(rename = "pipette"))]
    pub pipettes: Vec<PipetteConfig, MAX_PIPETTES>,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            safe_height: DEFAULT_SAFE_HEIGHT,
            envelope: TravelEnvelope::default(),
            pipettes: Vec::new(),
        }
    }
}

impl RobotConfig {
    /// Pipette mounted on an axis
    pub fn pipette(&self, axis: Axis) -> Option<&PipetteConfig> {
        self.pipettes.iter().find(|p| p.axis == axis)
    }

    /// Validate every pipette and reject two pipettes on one axis
    pub fn validate(&self) -> Result<(), InvalidArgument> {
        for (i, pipette) in self.pipettes.iter().enumerate() {
            pipette.validate()?;
            if self.pipettes[..i].iter().any(|p| p.axis == pipette.axis) {
                return Err(InvalidArgument::InvalidAxis);
            }
        }
        if self.safe_height.is_nan() || self.safe_height > self.envelope.max.z {
            return Err(InvalidArgument::InvalidCalibration);
        }
        Ok(())
    }
}
