//! Recording motion port
//!
//! Accepts every move instantly and keeps a trace of what was asked of
//! it. Used by [`CommandQueue::simulate`](super::CommandQueue::simulate)
//! and handy in tests.

use alloc::vec::Vec;

use crate::motion::{Axis, Coordinate};
use crate::traits::{MotionError, MotionPort, PositionReport};

/// One recorded controller call
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TraceEntry {
    Head(Coordinate),
    Plunger { axis: Axis, position: f64 },
    Speed { axis: Axis, speed: f64 },
    Home(Axis),
    Dwell(f64),
}

/// Motion port with no physical effect
#[derive(Debug, Clone, Default)]
pub struct SimulatedPort {
    head: Coordinate,
    plunger_a: f64,
    plunger_b: f64,
    trace: Vec<TraceEntry>,
}

impl SimulatedPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a known head position
    pub fn at(head: Coordinate) -> Self {
        Self {
            head,
            ..Self::default()
        }
    }

    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    pub fn into_trace(self) -> Vec<TraceEntry> {
        self.trace
    }

    /// Head targets in order
    pub fn head_moves(&self) -> impl Iterator<Item = Coordinate> + '_ {
        self.trace.iter().filter_map(|entry| match entry {
            TraceEntry::Head(c) => Some(*c),
            _ => None,
        })
    }

    fn plunger_mut(&mut self, axis: Axis) -> Result<&mut f64, MotionError> {
        match axis {
            Axis::A => Ok(&mut self.plunger_a),
            Axis::B => Ok(&mut self.plunger_b),
            other => Err(MotionError::UnsupportedAxis(other)),
        }
    }
}

impl MotionPort for SimulatedPort {
    fn move_head(&mut self, target: Coordinate) -> Result<(), MotionError> {
        self.head = target;
        self.trace.push(TraceEntry::Head(target));
        Ok(())
    }

    fn move_plunger(&mut self, axis: Axis, position: f64) -> Result<(), MotionError> {
        *self.plunger_mut(axis)? = position;
        self.trace.push(TraceEntry::Plunger { axis, position });
        Ok(())
    }

    fn set_plunger_speed(&mut self, axis: Axis, speed: f64) -> Result<(), MotionError> {
        self.plunger_mut(axis)?;
        self.trace.push(TraceEntry::Speed { axis, speed });
        Ok(())
    }

    fn home(&mut self, axis: Axis) -> Result<(), MotionError> {
        match axis {
            Axis::X => self.head.x = 0.0,
            Axis::Y => self.head.y = 0.0,
            Axis::Z => self.head.z = 0.0,
            plunger => *self.plunger_mut(plunger)? = 0.0,
        }
        self.trace.push(TraceEntry::Home(axis));
        Ok(())
    }

    fn dwell(&mut self, seconds: f64) -> Result<(), MotionError> {
        self.trace.push(TraceEntry::Dwell(seconds));
        Ok(())
    }

    fn head_position(&self) -> PositionReport<Coordinate> {
        PositionReport::settled(self.head)
    }

    fn plunger_position(&self, axis: Axis) -> PositionReport<f64> {
        let position = match axis {
            Axis::A => self.plunger_a,
            Axis::B => self.plunger_b,
            _ => 0.0,
        };
        PositionReport::settled(position)
    }
}
