//! Virtual motion controller
//!
//! Stands in for the robot's motion board. Moves complete instantly but
//! obey the travel envelope and plunger travel: out-of-range targets are
//! clamped and reported as warnings, like the real controller does.

use aliquot_core::motion::{Axis, Coordinate, TravelEnvelope};
use aliquot_core::traits::{MotionError, MotionPort, MotionWarning, PositionReport};
use heapless::Deque;

/// Warnings held before the oldest is dropped
pub const WARNING_CAPACITY: usize = 16;

/// Where homing leaves the head
pub const HOME_POSITION: Coordinate = Coordinate::new(0.0, 400.0, 100.0);

/// Virtual controller configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VirtualPortConfig {
    pub envelope: TravelEnvelope,
    /// Plunger travel from 0 to this, in mm
    pub plunger_travel: f64,
}

impl Default for VirtualPortConfig {
    fn default() -> Self {
        Self {
            envelope: TravelEnvelope::default(),
            plunger_travel: 20.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Plunger {
    position: f64,
    speed: f64,
}

/// In-memory motion controller
#[derive(Debug)]
pub struct VirtualMotionPort {
    config: VirtualPortConfig,
    head: Coordinate,
    /// Last requested head target, before clamping
    head_target: Coordinate,
    plungers: [Plunger; 2],
    warnings: Deque<MotionWarning, WARNING_CAPACITY>,
    moves: usize,
    dwelled: f64,
    /// Fail every call once this many moves have completed
    disconnect_after: Option<usize>,
}

impl Default for VirtualMotionPort {
    fn default() -> Self {
        Self::new(VirtualPortConfig::default())
    }
}

impl VirtualMotionPort {
    /// Controller with the head at its home position
    pub fn new(config: VirtualPortConfig) -> Self {
        Self {
            config,
            head: HOME_POSITION,
            head_target: HOME_POSITION,
            plungers: [Plunger {
                position: 0.0,
                speed: 1.0,
            }; 2],
            warnings: Deque::new(),
            moves: 0,
            dwelled: 0.0,
            disconnect_after: None,
        }
    }

    pub fn config(&self) -> &VirtualPortConfig {
        &self.config
    }

    /// Head and plunger moves completed so far
    pub fn moves(&self) -> usize {
        self.moves
    }

    /// Total time spent dwelling, in seconds
    pub fn dwelled(&self) -> f64 {
        self.dwelled
    }

    /// Current speed multiplier of a plunger
    pub fn plunger_speed(&self, axis: Axis) -> Option<f64> {
        self.plunger_index(axis).ok().map(|i| self.plungers[i].speed)
    }

    /// Simulate losing the link after `moves` more moves
    pub fn disconnect_after(&mut self, moves: usize) {
        self.disconnect_after = Some(self.moves + moves);
    }

    fn plunger_index(&self, axis: Axis) -> Result<usize, MotionError> {
        match axis {
            Axis::A => Ok(0),
            Axis::B => Ok(1),
            other => Err(MotionError::UnsupportedAxis(other)),
        }
    }

    fn check_link(&self) -> Result<(), MotionError> {
        match self.disconnect_after {
            Some(limit) if self.moves >= limit => Err(MotionError::Disconnected),
            _ => Ok(()),
        }
    }

    fn warn(&mut self, warning: MotionWarning) {
        #[cfg(feature = "defmt")]
        defmt::warn!("virtual port: {}", warning);

        if self.warnings.is_full() {
            self.warnings.pop_front();
        }
        let _ = self.warnings.push_back(warning);
    }
}

fn finite(c: Coordinate) -> bool {
    c.x.is_finite() && c.y.is_finite() && c.z.is_finite()
}

impl MotionPort for VirtualMotionPort {
    fn move_head(&mut self, target: Coordinate) -> Result<(), MotionError> {
        self.check_link()?;
        if !finite(target) {
            return Err(MotionError::InvalidTarget);
        }
        self.head_target = target;
        let reached = self.config.envelope.clamp(target);
        if reached != target {
            self.warn(MotionWarning::TravelClamped {
                requested: target,
                reached,
            });
        }
        self.head = reached;
        self.moves += 1;
        Ok(())
    }

    fn move_plunger(&mut self, axis: Axis, position: f64) -> Result<(), MotionError> {
        self.check_link()?;
        let index = self.plunger_index(axis)?;
        if !position.is_finite() {
            return Err(MotionError::InvalidTarget);
        }
        let reached = position.clamp(0.0, self.config.plunger_travel);
        if reached != position {
            self.warn(MotionWarning::PlungerClamped {
                axis,
                requested: position,
                reached,
            });
        }
        self.plungers[index].position = reached;
        self.moves += 1;
        Ok(())
    }

    fn set_plunger_speed(&mut self, axis: Axis, speed: f64) -> Result<(), MotionError> {
        self.check_link()?;
        let index = self.plunger_index(axis)?;
        if !(speed >= 0.0 && speed.is_finite()) {
            return Err(MotionError::InvalidTarget);
        }
        self.plungers[index].speed = speed;
        Ok(())
    }

    fn home(&mut self, axis: Axis) -> Result<(), MotionError> {
        self.check_link()?;
        match axis {
            Axis::X => self.head.x = HOME_POSITION.x,
            Axis::Y => self.head.y = HOME_POSITION.y,
            Axis::Z => self.head.z = HOME_POSITION.z,
            plunger => {
                let index = self.plunger_index(plunger)?;
                self.plungers[index].position = 0.0;
            }
        }
        self.head_target = self.head;

        #[cfg(feature = "defmt")]
        defmt::debug!("virtual port: homed {}", axis);
        Ok(())
    }

    fn dwell(&mut self, seconds: f64) -> Result<(), MotionError> {
        self.check_link()?;
        self.dwelled += seconds;
        Ok(())
    }

    fn head_position(&self) -> PositionReport<Coordinate> {
        PositionReport {
            target: self.head_target,
            current: self.head,
        }
    }

    fn plunger_position(&self, axis: Axis) -> PositionReport<f64> {
        let position = self
            .plunger_index(axis)
            .map(|i| self.plungers[i].position)
            .unwrap_or(0.0);
        PositionReport::settled(position)
    }

    fn take_warning(&mut self) -> Option<MotionWarning> {
        self.warnings.pop_front()
    }
}
