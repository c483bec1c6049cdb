//! Command queue
//!
//! Deferred, replayable log of everything the pipettes were asked to do.

pub mod command;
pub mod executor;
pub mod simulated;

pub use command::{Action, Command, Warning};
pub use executor::{
    CommandQueue, ReplayControl, ReplayError, ReplayOutcome, ReplayPhase, ReplayReport, Signal,
    Simulation, Uninterrupted,
};
pub use simulated::{SimulatedPort, TraceEntry};
