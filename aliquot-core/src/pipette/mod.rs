//! Pipettes
//!
//! The [`Pipette`] state machine and the tip inventory it draws from.

pub mod machine;
pub mod tips;

pub use machine::{
    Pipette, DEFAULT_AIR_GAP_HEIGHT, DROP_TIP_DEPTH, LIQUID_HEIGHT, TIP_PLUNGE, TIP_PRESSES,
};
pub use tips::TipTracker;
