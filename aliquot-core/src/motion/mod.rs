//! Motion primitives
//!
//! Axes, deck coordinates, travel strategies and envelopes.

pub mod position;

pub use position::{Axis, Coordinate, MoveStrategy, TravelEnvelope};
