//! Plunger calibration
//!
//! Four named stroke positions along a plunger axis. `bottom` is the
//! empty-tip position and `top` the full-tip position; `blow_out` and
//! `drop_tip` lie beyond `bottom`.

use core::fmt;
use core::str::FromStr;

use crate::error::InvalidArgument;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Named plunger position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PlungerPosition {
    Top,
    Bottom,
    BlowOut,
    DropTip,
}

impl PlungerPosition {
    pub const fn name(self) -> &'static str {
        match self {
            PlungerPosition::Top => "top",
            PlungerPosition::Bottom => "bottom",
            PlungerPosition::BlowOut => "blow_out",
            PlungerPosition::DropTip => "drop_tip",
        }
    }
}

impl FromStr for PlungerPosition {
    type Err = InvalidArgument;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top" => Ok(PlungerPosition::Top),
            "bottom" => Ok(PlungerPosition::Bottom),
            "blow_out" => Ok(PlungerPosition::BlowOut),
            "drop_tip" => Ok(PlungerPosition::DropTip),
            _ => Err(InvalidArgument::UnknownPosition),
        }
    }
}

impl fmt::Display for PlungerPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Calibrated plunger positions in millimetres
///
/// Any entry may be unset; operations that need an unset entry fail
/// with [`InvalidArgument::UncalibratedPosition`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PlungerCalibration {
    pub top: Option<f64>,
    pub bottom: Option<f64>,
    pub blow_out: Option<f64>,
    pub drop_tip: Option<f64>,
}

impl Default for PlungerCalibration {
    fn default() -> Self {
        Self::new(0.0, 10.0, 12.0, 13.0)
    }
}

impl PlungerCalibration {
    /// Fully calibrated set of positions
    pub const fn new(top: f64, bottom: f64, blow_out: f64, drop_tip: f64) -> Self {
        Self {
            top: Some(top),
            bottom: Some(bottom),
            blow_out: Some(blow_out),
            drop_tip: Some(drop_tip),
        }
    }

    /// No position calibrated
    pub const fn unset() -> Self {
        Self {
            top: None,
            bottom: None,
            blow_out: None,
            drop_tip: None,
        }
    }

    /// Calibrated value of a position
    pub fn get(&self, position: PlungerPosition) -> Result<f64, InvalidArgument> {
        let value = match position {
            PlungerPosition::Top => self.top,
            PlungerPosition::Bottom => self.bottom,
            PlungerPosition::BlowOut => self.blow_out,
            PlungerPosition::DropTip => self.drop_tip,
        };
        value.ok_or(InvalidArgument::UncalibratedPosition)
    }

    /// Set or clear one position
    pub fn set(&mut self, position: PlungerPosition, value: Option<f64>) {
        let slot = match position {
            PlungerPosition::Top => &mut self.top,
            PlungerPosition::Bottom => &mut self.bottom,
            PlungerPosition::BlowOut => &mut self.blow_out,
            PlungerPosition::DropTip => &mut self.drop_tip,
        };
        *slot = value;
    }

    /// Check ordering of the positions that are set
    pub fn validate(&self) -> Result<(), InvalidArgument> {
        for value in [self.top, self.bottom, self.blow_out, self.drop_tip]
            .into_iter()
            .flatten()
        {
            if value.is_nan() {
                return Err(InvalidArgument::InvalidCalibration);
            }
        }
        if let (Some(top), Some(bottom)) = (self.top, self.bottom) {
            if top >= bottom {
                return Err(InvalidArgument::InvalidCalibration);
            }
        }
        if let Some(bottom) = self.bottom {
            for beyond in [self.blow_out, self.drop_tip].into_iter().flatten() {
                if beyond <= bottom {
                    return Err(InvalidArgument::InvalidCalibration);
                }
            }
        }
        Ok(())
    }

    /// Plunger position holding `volume` in a tip of `max_volume`
    ///
    /// Affine in volume: `bottom` at zero, `top` at `max_volume`.
    pub fn position_for(&self, volume: f64, max_volume: f64) -> Result<f64, InvalidArgument> {
        let top = self.get(PlungerPosition::Top)?;
        let bottom = self.get(PlungerPosition::Bottom)?;
        Ok(bottom - (bottom - top) * volume / max_volume)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_names_round_trip() {
        for position in [
            PlungerPosition::Top,
            PlungerPosition::Bottom,
            PlungerPosition::BlowOut,
            PlungerPosition::DropTip,
        ] {
            assert_eq!(position.name().parse::<PlungerPosition>(), Ok(position));
        }
        assert_eq!(
            "roll_out".parse::<PlungerPosition>(),
            Err(InvalidArgument::UnknownPosition)
        );
    }

    #[test]
    fn test_get_and_unset() {
        let mut cal = PlungerCalibration::default();
        assert_eq!(cal.get(PlungerPosition::Top), Ok(0.0));
        assert_eq!(cal.get(PlungerPosition::Bottom), Ok(10.0));
        assert_eq!(cal.get(PlungerPosition::BlowOut), Ok(12.0));
        assert_eq!(cal.get(PlungerPosition::DropTip), Ok(13.0));

        cal.set(PlungerPosition::DropTip, None);
        assert_eq!(
            cal.get(PlungerPosition::DropTip),
            Err(InvalidArgument::UncalibratedPosition)
        );
    }

    #[test]
    fn test_position_mapping() {
        let cal = PlungerCalibration::default();
        assert_eq!(cal.position_for(0.0, 200.0), Ok(10.0));
        assert_eq!(cal.position_for(100.0, 200.0), Ok(5.0));
        assert_eq!(cal.position_for(200.0, 200.0), Ok(0.0));

        let unset = PlungerCalibration::unset();
        assert_eq!(
            unset.position_for(10.0, 200.0),
            Err(InvalidArgument::UncalibratedPosition)
        );
    }

    #[test]
    fn test_validate_ordering() {
        assert!(PlungerCalibration::default().validate().is_ok());
        assert!(PlungerCalibration::unset().validate().is_ok());
        assert_eq!(
            PlungerCalibration::new(10.0, 0.0, 12.0, 13.0).validate(),
            Err(InvalidArgument::InvalidCalibration)
        );
        assert_eq!(
            PlungerCalibration::new(0.0, 10.0, 9.0, 13.0).validate(),
            Err(InvalidArgument::InvalidCalibration)
        );
    }
}
