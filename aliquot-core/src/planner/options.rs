//! Transfer options
//!
//! Everything a caller can tune about a transfer, distribute or
//! consolidate. Defaults match a plain single-tip transfer.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;

use crate::error::InvalidArgument;
use crate::labware::Location;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// When the planner changes tips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TipPolicy {
    /// Fresh tip for every aspirate batch
    Always,
    /// One tip for the whole operation
    #[default]
    Once,
    /// Use whatever tip is mounted
    Never,
}

impl TipPolicy {
    pub const fn name(self) -> &'static str {
        match self {
            TipPolicy::Always => "always",
            TipPolicy::Once => "once",
            TipPolicy::Never => "never",
        }
    }
}

impl FromStr for TipPolicy {
    type Err = InvalidArgument;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "always" => Ok(TipPolicy::Always),
            "once" => Ok(TipPolicy::Once),
            "never" => Ok(TipPolicy::Never),
            _ => Err(InvalidArgument::UnknownTipPolicy),
        }
    }
}

impl fmt::Display for TipPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How source/destination pairs are grouped into batches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferMode {
    /// One aspirate and one dispense per pair
    Transfer,
    /// One aspirate serves several destinations
    Distribute,
    /// Several aspirates feed one dispense
    Consolidate,
}

/// Mix cycle run before aspirating or after dispensing
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Mix {
    pub repetitions: u32,
    pub volume: f64,
}

/// Volume argument of a compound operation
#[derive(Debug, Clone, PartialEq)]
pub enum Volumes {
    /// Same volume for every pair
    Single(f64),
    /// One volume per pair
    List(Vec<f64>),
    /// Linear ramp from the first pair to the last
    Range(f64, f64),
}

impl From<f64> for Volumes {
    fn from(volume: f64) -> Self {
        Volumes::Single(volume)
    }
}

impl From<Vec<f64>> for Volumes {
    fn from(volumes: Vec<f64>) -> Self {
        Volumes::List(volumes)
    }
}

impl From<&[f64]> for Volumes {
    fn from(volumes: &[f64]) -> Self {
        Volumes::List(volumes.to_vec())
    }
}

impl From<(f64, f64)> for Volumes {
    fn from((start, end): (f64, f64)) -> Self {
        Volumes::Range(start, end)
    }
}

/// Maps a pair's fractional index in `[0, 1]` to a scaling factor
///
/// For a [`Volumes::Range`] the factor places the pair between start and
/// end; for other volumes it multiplies the pair's volume.
#[derive(Clone)]
pub struct Gradient(Arc<dyn Fn(f64) -> f64 + Send + Sync>);

impl Gradient {
    pub fn new(f: impl Fn(f64) -> f64 + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn apply(&self, x: f64) -> f64 {
        (self.0)(x)
    }
}

impl fmt::Debug for Gradient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Gradient(..)")
    }
}

/// Options shared by transfer, distribute and consolidate
#[derive(Debug, Clone)]
pub struct TransferOptions {
    pub new_tip: TipPolicy,
    /// Drop used tips in the trash; `false` returns them to their rack
    pub trash: bool,
    /// Touch the tip after every aspirate and dispense
    pub touch_tip: bool,
    /// Blow out at the end of every batch
    pub blow_out: bool,
    /// Where leftover liquid is blown out; the trash when unset
    pub blow_out_location: Option<Location>,
    /// Air drawn between aspirate and dispense, in uL
    pub air_gap: f64,
    /// Extra liquid a distribute batch aspirates and discards.
    /// `None` uses the pipette's minimum volume.
    pub disposal_vol: Option<f64>,
    pub mix_before: Option<Mix>,
    pub mix_after: Option<Mix>,
    /// Split volumes larger than the tip; otherwise fail
    pub carryover: bool,
    pub gradient: Option<Gradient>,
    /// Plunger speed multiplier
    pub rate: f64,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            new_tip: TipPolicy::Once,
            trash: true,
            touch_tip: false,
            blow_out: false,
            blow_out_location: None,
            air_gap: 0.0,
            disposal_vol: None,
            mix_before: None,
            mix_after: None,
            carryover: true,
            gradient: None,
            rate: 1.0,
        }
    }
}

impl TransferOptions {
    /// Reject option values no plan could honour
    pub fn validate(&self) -> Result<(), InvalidArgument> {
        check_volume(self.air_gap)?;
        if let Some(disposal) = self.disposal_vol {
            check_volume(disposal)?;
        }
        for mix in [self.mix_before, self.mix_after].into_iter().flatten() {
            check_volume(mix.volume)?;
        }
        if !(self.rate >= 0.0 && self.rate.is_finite()) {
            return Err(InvalidArgument::InvalidSpeed);
        }
        Ok(())
    }
}

/// Volumes must be finite and not negative
pub(crate) fn check_volume(volume: f64) -> Result<(), InvalidArgument> {
    if !(volume >= 0.0) {
        Err(InvalidArgument::NegativeVolume)
    } else if !volume.is_finite() {
        Err(InvalidArgument::UnboundedVolume)
    } else {
        Ok(())
    }
}
