//! Location resolver trait
//!
//! Maps well-relative locations to deck coordinates. The resolver owns
//! container placement and any calibration deltas captured against it.

use core::fmt;

use crate::labware::{Labware, Location};
use crate::motion::Coordinate;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Errors that can occur while resolving a location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ResolveError {
    /// Container is not placed on the deck
    UnknownContainer,
    /// Deck slot does not exist
    UnknownSlot,
    /// Deck slot already holds a container
    SlotOccupied,
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::UnknownContainer => write!(f, "container is not on the deck"),
            ResolveError::UnknownSlot => write!(f, "unknown deck slot"),
            ResolveError::SlotOccupied => write!(f, "deck slot is occupied"),
        }
    }
}

/// Trait for resolving locations to deck coordinates
pub trait LocationResolver {
    /// Resolve a location, applying any stored calibration delta
    fn resolve(&self, location: &Location) -> Result<Coordinate, ResolveError>;

    /// Height the head travels at between sites
    fn safe_height(&self) -> f64;

    /// Record where `location` was actually observed
    ///
    /// The difference between `observed` and the uncalibrated position of
    /// `location` becomes the container's calibration delta, which is
    /// returned.
    fn calibrate(
        &mut self,
        location: &Location,
        observed: Coordinate,
    ) -> Result<Coordinate, ResolveError>;

    /// Calibration delta currently stored for a container
    fn delta(&self, labware: &Labware) -> Coordinate;
}
