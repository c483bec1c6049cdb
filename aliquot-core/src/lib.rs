//! Hardware-agnostic command engine for a liquid-handling robot
//!
//! This crate contains all planning logic that does not depend on a
//! specific motion controller:
//!
//! - Labware model and locations
//! - Pipette state machine (volume, tips, calibration)
//! - Transfer planner (transfer, distribute, consolidate)
//! - Command queue with simulation and pausable replay
//! - Motion controller and location resolver traits
//! - Configuration type definitions

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

pub mod config;
pub mod error;
pub mod labware;
pub mod motion;
pub mod pipette;
pub mod planner;
pub mod queue;
pub mod traits;

#[cfg(test)]
mod testing;

pub use error::{InvalidArgument, PipetteError};
