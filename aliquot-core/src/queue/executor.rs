//! Command queue and replay
//!
//! Planning appends commands; replay drains them in insertion order
//! against a [`MotionPort`]. Replay polls a [`ReplayControl`] checkpoint
//! between commands (never inside one) so it can be paused, resumed and
//! aborted.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use super::command::{Action, Command, Warning};
use super::simulated::{SimulatedPort, TraceEntry};
use crate::motion::{Coordinate, MoveStrategy};
use crate::traits::{LocationResolver, MotionError, MotionPort, ResolveError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Replay phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ReplayPhase {
    /// Nothing replayed since the last clear, or a replay failed
    #[default]
    Idle,
    /// Replay in progress
    Running,
    /// Stopped between commands, resumable
    Paused,
    /// Every queued command has been executed
    Complete,
    /// Stopped and the remaining commands discarded
    Aborted,
}

/// Checkpoint decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Signal {
    Continue,
    Pause,
    Abort,
}

/// Polled by the replay loop before each command
pub trait ReplayControl {
    /// Decide whether command `next` may run
    fn checkpoint(&mut self, next: usize) -> Signal;
}

impl<F: FnMut(usize) -> Signal> ReplayControl for F {
    fn checkpoint(&mut self, next: usize) -> Signal {
        self(next)
    }
}

/// Control that never interrupts
#[derive(Debug, Clone, Copy, Default)]
pub struct Uninterrupted;

impl ReplayControl for Uninterrupted {
    fn checkpoint(&mut self, _next: usize) -> Signal {
        Signal::Continue
    }
}

/// Summary of one replay call
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReplayReport {
    /// Commands executed by this call
    pub executed: usize,
    /// Warnings raised by the port during this call
    pub warnings: Vec<Warning>,
}

/// How a replay call ended
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayOutcome {
    /// Every command ran
    Completed(ReplayReport),
    /// Stopped before command `next`
    Paused { next: usize, report: ReplayReport },
    /// Stopped after `executed` commands in total; the rest were discarded
    Aborted { executed: usize, discarded: usize },
}

/// Replay faults
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReplayError {
    /// Motion controller failed while executing a command
    Motion { command: usize, error: MotionError },
    /// A location in a command could not be resolved
    Resolve { command: usize, error: ResolveError },
    /// `resume` called when no replay is paused
    NotPaused,
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayError::Motion { command, error } => {
                write!(f, "command {}: {}", command, error)
            }
            ReplayError::Resolve { command, error } => {
                write!(f, "command {}: {}", command, error)
            }
            ReplayError::NotPaused => write!(f, "no paused replay to resume"),
        }
    }
}

/// Result of [`CommandQueue::simulate`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Simulation {
    pub report: ReplayReport,
    pub trace: Vec<TraceEntry>,
}

/// Queue length and warning count at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Mark {
    commands: usize,
    warnings: usize,
}

/// Ordered log of commands for one program run
#[derive(Debug, Clone, Default)]
pub struct CommandQueue {
    commands: Vec<Command>,
    warnings: Vec<Warning>,
    /// Index of the first command not yet executed
    cursor: usize,
    phase: ReplayPhase,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command
    pub fn enqueue(&mut self, description: impl Into<String>, actions: Vec<Action>) {
        self.commands.push(Command::new(description, actions));
    }

    /// Record a recoverable condition
    pub fn warn(&mut self, warning: Warning) {
        #[cfg(feature = "defmt")]
        defmt::warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Command descriptions in order
    pub fn descriptions(&self) -> impl Iterator<Item = &str> + '_ {
        self.commands.iter().map(Command::description)
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn phase(&self) -> ReplayPhase {
        self.phase
    }

    /// Index of the next command a replay would execute
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Commands not yet executed
    pub fn pending(&self) -> &[Command] {
        &self.commands[self.cursor..]
    }

    /// Discard every command and warning without executing anything
    pub fn clear(&mut self) {
        self.commands.clear();
        self.warnings.clear();
        self.cursor = 0;
        self.phase = ReplayPhase::Idle;
    }

    pub(crate) fn mark(&self) -> Mark {
        Mark {
            commands: self.commands.len(),
            warnings: self.warnings.len(),
        }
    }

    /// Drop everything appended since `mark`
    pub(crate) fn rollback(&mut self, mark: Mark) {
        self.commands.truncate(mark.commands.max(self.cursor));
        self.warnings.truncate(mark.warnings);
    }

    /// Execute every pending command
    ///
    /// Commands executed by an earlier call are not run again.
    pub fn run<P, R, C>(
        &mut self,
        port: &mut P,
        resolver: &R,
        control: &mut C,
    ) -> Result<ReplayOutcome, ReplayError>
    where
        P: MotionPort + ?Sized,
        R: LocationResolver + ?Sized,
        C: ReplayControl + ?Sized,
    {
        #[cfg(feature = "defmt")]
        defmt::debug!(
            "replay: starting at command {} of {}",
            self.cursor,
            self.commands.len()
        );
        self.drain(port, resolver, control)
    }

    /// Continue a paused replay from the next unexecuted command
    pub fn resume<P, R, C>(
        &mut self,
        port: &mut P,
        resolver: &R,
        control: &mut C,
    ) -> Result<ReplayOutcome, ReplayError>
    where
        P: MotionPort + ?Sized,
        R: LocationResolver + ?Sized,
        C: ReplayControl + ?Sized,
    {
        if self.phase != ReplayPhase::Paused {
            return Err(ReplayError::NotPaused);
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("replay: resuming at command {}", self.cursor);
        self.drain(port, resolver, control)
    }

    /// Stop replay and discard the unexecuted commands
    ///
    /// Returns the number of commands discarded.
    pub fn abort(&mut self) -> usize {
        let discarded = self.commands.len() - self.cursor;
        self.commands.truncate(self.cursor);
        self.phase = ReplayPhase::Aborted;

        #[cfg(feature = "defmt")]
        defmt::warn!("replay: aborted, {} commands discarded", discarded);
        discarded
    }

    /// Replay every command against a recording port
    ///
    /// Locations are resolved exactly as in a real run. The queue itself,
    /// including its cursor, is left untouched.
    pub fn simulate<R>(&self, resolver: &R) -> Result<Simulation, ReplayError>
    where
        R: LocationResolver + ?Sized,
    {
        let mut port = SimulatedPort::new();
        let mut report = ReplayReport::default();
        for (index, command) in self.commands.iter().enumerate() {
            execute(command, index, &mut port, resolver)?;
            report.executed += 1;
        }
        Ok(Simulation {
            report,
            trace: port.into_trace(),
        })
    }

    fn drain<P, R, C>(
        &mut self,
        port: &mut P,
        resolver: &R,
        control: &mut C,
    ) -> Result<ReplayOutcome, ReplayError>
    where
        P: MotionPort + ?Sized,
        R: LocationResolver + ?Sized,
        C: ReplayControl + ?Sized,
    {
        self.phase = ReplayPhase::Running;
        let mut report = ReplayReport::default();

        while self.cursor < self.commands.len() {
            match control.checkpoint(self.cursor) {
                Signal::Continue => {}
                Signal::Pause => {
                    self.phase = ReplayPhase::Paused;
                    #[cfg(feature = "defmt")]
                    defmt::debug!("replay: paused before command {}", self.cursor);
                    return Ok(ReplayOutcome::Paused {
                        next: self.cursor,
                        report,
                    });
                }
                Signal::Abort => {
                    let executed = self.cursor;
                    let discarded = self.abort();
                    return Ok(ReplayOutcome::Aborted {
                        executed,
                        discarded,
                    });
                }
            }

            if let Err(e) = execute(&self.commands[self.cursor], self.cursor, port, resolver) {
                self.phase = ReplayPhase::Idle;
                return Err(e);
            }
            while let Some(w) = port.take_warning() {
                let warning = Warning::Motion(w);
                self.warn(warning);
                report.warnings.push(warning);
            }
            self.cursor += 1;
            report.executed += 1;
        }

        self.phase = ReplayPhase::Complete;
        Ok(ReplayOutcome::Completed(report))
    }
}

/// Run one command's actions
fn execute<P, R>(
    command: &Command,
    index: usize,
    port: &mut P,
    resolver: &R,
) -> Result<(), ReplayError>
where
    P: MotionPort + ?Sized,
    R: LocationResolver + ?Sized,
{
    let motion = |error| ReplayError::Motion {
        command: index,
        error,
    };

    for action in command.actions() {
        match action {
            Action::MoveTo { location, strategy } => {
                let target = resolver
                    .resolve(location)
                    .map_err(|error| ReplayError::Resolve {
                        command: index,
                        error,
                    })?;
                match strategy {
                    MoveStrategy::Direct => port.move_head(target).map_err(motion)?,
                    MoveStrategy::Arc => {
                        for waypoint in arc(port.head_position().current, target, resolver.safe_height()) {
                            port.move_head(waypoint).map_err(motion)?;
                        }
                    }
                }
            }
            Action::MovePlunger {
                axis,
                position,
                speed,
            } => {
                if let Some(speed) = speed {
                    port.set_plunger_speed(*axis, *speed).map_err(motion)?;
                }
                port.move_plunger(*axis, *position).map_err(motion)?;
            }
            Action::Dwell { seconds } => port.dwell(*seconds).map_err(motion)?,
            Action::Home { axis } => port.home(*axis).map_err(motion)?,
        }
    }
    Ok(())
}

/// Rise, traverse, descend
///
/// Travel happens at the safe height, or higher if either end is above it.
fn arc(from: Coordinate, to: Coordinate, safe_height: f64) -> [Coordinate; 3] {
    let travel = safe_height.max(from.z).max(to.z);
    [from.with_z(travel), to.with_z(travel), to]
}
