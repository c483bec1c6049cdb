//! Configuration types
//!
//! Pipette and robot configuration, plunger calibration, and an optional
//! TOML loader behind the `toml` feature.

pub mod calibration;
#[cfg(feature = "toml")]
pub mod loader;
pub mod types;

pub use calibration::{PlungerCalibration, PlungerPosition};
#[cfg(feature = "toml")]
pub use loader::{parse_config, ConfigError};
pub use types::*;
