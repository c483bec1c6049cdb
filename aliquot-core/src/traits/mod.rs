//! Collaborator traits
//!
//! These traits define the interface between the command engine and
//! whatever moves the robot and knows where the labware is.

pub mod motion;
pub mod resolver;

pub use motion::{MotionError, MotionPort, MotionWarning, PositionReport};
pub use resolver::{LocationResolver, ResolveError};
