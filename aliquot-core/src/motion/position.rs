//! Position types shared by the head and plunger axes
//!
//! Head positions are millimetre coordinates in deck space. Plunger
//! positions are plain millimetre values along a single plunger axis.

use core::fmt;
use core::ops::{Add, Neg, Sub};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Axis identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Axis {
    /// Head X axis (left/right across the deck)
    X,
    /// Head Y axis (front/back across the deck)
    Y,
    /// Head Z axis (vertical)
    Z,
    /// Plunger axis of the first mount
    A,
    /// Plunger axis of the second mount
    B,
}

impl Axis {
    /// Whether this axis drives a pipette plunger
    pub const fn is_plunger(self) -> bool {
        matches!(self, Axis::A | Axis::B)
    }

    /// Upper-case axis letter
    pub const fn letter(self) -> char {
        match self {
            Axis::X => 'X',
            Axis::Y => 'Y',
            Axis::Z => 'Z',
            Axis::A => 'A',
            Axis::B => 'B',
        }
    }

    /// Parse an axis letter, case-insensitive
    pub fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'X' => Some(Axis::X),
            'Y' => Some(Axis::Y),
            'Z' => Some(Axis::Z),
            'A' => Some(Axis::A),
            'B' => Some(Axis::B),
            _ => None,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// A point or displacement in deck space, in millimetres
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Coordinate {
    /// The origin
    pub const ZERO: Coordinate = Coordinate::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Same point with a different height
    pub const fn with_z(self, z: f64) -> Self {
        Self { z, ..self }
    }
}

impl Add for Coordinate {
    type Output = Coordinate;

    fn add(self, rhs: Coordinate) -> Coordinate {
        Coordinate::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Coordinate {
    type Output = Coordinate;

    fn sub(self, rhs: Coordinate) -> Coordinate {
        Coordinate::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Coordinate {
    type Output = Coordinate;

    fn neg(self) -> Coordinate {
        Coordinate::new(-self.x, -self.y, -self.z)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// How the head travels to a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MoveStrategy {
    /// Rise to the safe travel height, traverse, then descend
    #[default]
    Arc,
    /// Straight move from the current position
    Direct,
}

/// Travel limits of the head, in millimetres
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TravelEnvelope {
    pub min: Coordinate,
    pub max: Coordinate,
}

impl Default for TravelEnvelope {
    fn default() -> Self {
        Self {
            min: Coordinate::ZERO,
            max: Coordinate::new(400.0, 400.0, 120.0),
        }
    }
}

impl TravelEnvelope {
    /// Check if a target is within the envelope
    pub fn contains(&self, target: Coordinate) -> bool {
        target.x >= self.min.x
            && target.x <= self.max.x
            && target.y >= self.min.y
            && target.y <= self.max.y
            && target.z >= self.min.z
            && target.z <= self.max.z
    }

    /// Clamp a target into the envelope
    pub fn clamp(&self, target: Coordinate) -> Coordinate {
        Coordinate::new(
            target.x.clamp(self.min.x, self.max.x),
            target.y.clamp(self.min.y, self.max.y),
            target.z.clamp(self.min.z, self.max.z),
        )
    }
}
