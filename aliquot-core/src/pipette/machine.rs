//! Pipette state machine
//!
//! Tracks one pipette's liquid volume, tip and calibration. Every
//! operation validates first, then updates state and enqueues the
//! commands that carry it out. A failed operation changes nothing.

use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use super::tips::TipTracker;
use crate::config::{PipetteConfig, PlungerCalibration, PlungerPosition, ROW_CHANNELS};
use crate::error::{InvalidArgument, PipetteError};
use crate::labware::{Labware, Location, Site, WellRef};
use crate::motion::{Axis, Coordinate, MoveStrategy};
use crate::queue::{Action, CommandQueue, Warning};
use crate::traits::{LocationResolver, MotionPort};

/// Height above the rim an air gap is drawn at, in mm
pub const DEFAULT_AIR_GAP_HEIGHT: f64 = 20.0;

/// How far below the rim a tip is released, in mm
pub const DROP_TIP_DEPTH: f64 = 5.0;

/// Height above the bottom liquid is handled at when given a bare well
pub const LIQUID_HEIGHT: f64 = 1.0;

/// Times the head presses down onto a new tip
pub const TIP_PRESSES: usize = 3;

/// Distance the head rises between presses, in mm
pub const TIP_PLUNGE: f64 = 6.0;

/// One pipette and its tip inventory
#[derive(Debug, Clone)]
pub struct Pipette {
    config: PipetteConfig,
    /// Configuration at construction, restored by `reset`
    initial: PipetteConfig,
    current_volume: f64,
    /// Part of `current_volume` that is air
    air_volume: f64,
    has_tip: bool,
    tips: TipTracker,
    trash: Option<Labware>,
    current_tip: Option<Site>,
    last_location: Option<Location>,
}

impl Pipette {
    /// Create a pipette bound to tip racks and an optional trash
    pub fn new(
        config: PipetteConfig,
        tip_racks: Vec<Labware>,
        trash: Option<Labware>,
    ) -> Result<Self, PipetteError> {
        config.validate()?;
        let by_row = config.channels >= ROW_CHANNELS;
        Ok(Self {
            initial: config.clone(),
            config,
            current_volume: 0.0,
            air_volume: 0.0,
            has_tip: false,
            tips: TipTracker::new(tip_racks, by_row),
            trash,
            current_tip: None,
            last_location: None,
        })
    }

    pub fn config(&self) -> &PipetteConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn axis(&self) -> Axis {
        self.config.axis
    }

    pub fn channels(&self) -> u8 {
        self.config.channels
    }

    pub fn max_volume(&self) -> f64 {
        self.config.max_volume
    }

    pub fn min_volume(&self) -> f64 {
        self.config.min_volume
    }

    pub fn calibration(&self) -> &PlungerCalibration {
        &self.config.plunger
    }

    pub fn current_volume(&self) -> f64 {
        self.current_volume
    }

    /// Air currently held above the liquid
    pub fn air_volume(&self) -> f64 {
        self.air_volume
    }

    pub fn has_tip(&self) -> bool {
        self.has_tip
    }

    /// Where the mounted tip was picked up from
    pub fn current_tip(&self) -> Option<&Site> {
        self.current_tip.as_ref()
    }

    pub fn tips(&self) -> &TipTracker {
        &self.tips
    }

    pub fn trash(&self) -> Option<&Labware> {
        self.trash.as_ref()
    }

    /// Last location the pipette was sent to
    pub fn last_location(&self) -> Option<&Location> {
        self.last_location.as_ref()
    }

    /// Back to an empty, tipless pipette with its initial calibration
    pub fn reset(&mut self) {
        self.config = self.initial.clone();
        self.current_volume = 0.0;
        self.air_volume = 0.0;
        self.has_tip = false;
        self.current_tip = None;
        self.last_location = None;
        self.tips.rewind();
    }

    /// Run `f`, restoring pipette and queue if it fails
    pub(crate) fn atomically<T>(
        &mut self,
        queue: &mut CommandQueue,
        f: impl FnOnce(&mut Self, &mut CommandQueue) -> Result<T, PipetteError>,
    ) -> Result<T, PipetteError> {
        let snapshot = self.clone();
        let mark = queue.mark();
        let result = f(self, queue);
        if result.is_err() {
            *self = snapshot;
            queue.rollback(mark);
        }
        result
    }

    /// Fraction of capacity `volume` represents
    ///
    /// Volumes outside `0..=max_volume` are a fault. Volumes below
    /// `min_volume` are accepted with a warning on the queue.
    pub fn volume_percentage(
        &self,
        volume: f64,
        queue: &mut CommandQueue,
    ) -> Result<f64, PipetteError> {
        let percentage = self.checked_percentage(volume)?;
        self.warn_if_below_minimum(volume, queue);
        Ok(percentage)
    }

    fn checked_percentage(&self, volume: f64) -> Result<f64, PipetteError> {
        if !(volume >= 0.0 && volume <= self.max_volume()) {
            return Err(PipetteError::VolumeOutOfRange { volume });
        }
        Ok(volume / self.max_volume())
    }

    fn warn_if_below_minimum(&self, volume: f64, queue: &mut CommandQueue) {
        if volume < self.min_volume() {
            queue.warn(Warning::VolumeBelowMinimum {
                volume,
                min_volume: self.min_volume(),
            });
        }
    }

    /// Calibrated plunger position
    pub fn plunger_position(&self, position: PlungerPosition) -> Result<f64, PipetteError> {
        Ok(self.config.plunger.get(position)?)
    }

    /// Plunger position holding `volume`
    pub fn plunger_position_for(&self, volume: f64) -> Result<f64, PipetteError> {
        Ok(self.config.plunger.position_for(volume, self.max_volume())?)
    }

    fn plunger_to(&self, position: f64, speed: Option<f64>) -> Action {
        Action::MovePlunger {
            axis: self.axis(),
            position,
            speed,
        }
    }

    /// Liquid handling at a bare well happens just above the bottom
    fn liquid_target(location: Location) -> Location {
        if location.is_bare() {
            location.site.bottom(LIQUID_HEIGHT)
        } else {
            location
        }
    }

    fn describe_at(&self, location: Option<&Location>, joiner: &str) -> String {
        match location.or(self.last_location.as_ref()) {
            Some(l) => format!(" {} {}", joiner, l),
            None => String::new(),
        }
    }

    fn check_rate(rate: f64) -> Result<(), PipetteError> {
        if rate >= 0.0 {
            Ok(())
        } else {
            Err(InvalidArgument::InvalidSpeed.into())
        }
    }

    fn check_volume(volume: f64) -> Result<(), PipetteError> {
        if volume >= 0.0 {
            Ok(())
        } else {
            Err(InvalidArgument::NegativeVolume.into())
        }
    }

    /// Draw liquid into the tip
    ///
    /// `None` fills the remaining capacity. When `location` is given the
    /// head moves there first; a bare well is entered just above its
    /// bottom. A zero volume does nothing.
    pub fn aspirate(
        &mut self,
        queue: &mut CommandQueue,
        volume: Option<f64>,
        location: Option<Location>,
        rate: f64,
    ) -> Result<(), PipetteError> {
        Self::check_rate(rate)?;
        let volume = volume.unwrap_or(self.max_volume() - self.current_volume);
        Self::check_volume(volume)?;
        if volume == 0.0 {
            return Ok(());
        }
        if !self.has_tip {
            return Err(PipetteError::NoTip);
        }
        if self.air_volume > 0.0 {
            return Err(PipetteError::AirGapNotCleared);
        }
        let target = self.current_volume + volume;
        if target > self.max_volume() {
            return Err(PipetteError::ExceedsCapacity {
                requested: volume,
                available: self.max_volume() - self.current_volume,
            });
        }
        self.checked_percentage(volume)?;
        let empty = self.plunger_position_for(0.0)?;
        let destination = self.plunger_position_for(target)?;
        self.warn_if_below_minimum(volume, queue);

        let mut actions = Vec::new();
        let location = location.map(Self::liquid_target);
        match (&location, self.current_volume == 0.0) {
            (Some(l), true) => {
                // Plunger goes to bottom above the liquid, not in it
                actions.push(Action::MoveTo {
                    location: l.site.top(0.0),
                    strategy: MoveStrategy::Arc,
                });
                actions.push(self.plunger_to(empty, None));
                actions.push(Action::MoveTo {
                    location: l.clone(),
                    strategy: MoveStrategy::Direct,
                });
            }
            (Some(l), false) => actions.push(Action::MoveTo {
                location: l.clone(),
                strategy: MoveStrategy::Arc,
            }),
            (None, true) => actions.push(self.plunger_to(empty, None)),
            (None, false) => {}
        }
        actions.push(self.plunger_to(destination, Some(self.config.speeds.aspirate * rate)));

        let description = format!(
            "Aspirating {} uL{} at {} speed",
            volume,
            self.describe_at(location.as_ref(), "from"),
            rate
        );
        queue.enqueue(description, actions);

        self.current_volume = target;
        if location.is_some() {
            self.last_location = location;
        }
        Ok(())
    }

    /// Push liquid out of the tip
    ///
    /// `None` empties the tip. Requests larger than the tip holds are
    /// clamped. Air held in the tip leaves first.
    pub fn dispense(
        &mut self,
        queue: &mut CommandQueue,
        volume: Option<f64>,
        location: Option<Location>,
        rate: f64,
    ) -> Result<(), PipetteError> {
        Self::check_rate(rate)?;
        let volume = volume.unwrap_or(self.current_volume);
        Self::check_volume(volume)?;
        let volume = volume.min(self.current_volume);
        if volume == 0.0 {
            return Ok(());
        }
        self.checked_percentage(volume)?;
        let target = self.current_volume - volume;
        let destination = self.plunger_position_for(target)?;
        self.warn_if_below_minimum(volume, queue);

        let location = location.map(Self::liquid_target);
        let mut actions = Vec::new();
        if let Some(l) = &location {
            actions.push(Action::MoveTo {
                location: l.clone(),
                strategy: MoveStrategy::Arc,
            });
        }
        actions.push(self.plunger_to(destination, Some(self.config.speeds.dispense * rate)));

        let description = format!(
            "Dispensing {} uL{}",
            volume,
            self.describe_at(location.as_ref(), "into")
        );
        queue.enqueue(description, actions);

        self.current_volume = target;
        self.air_volume = (self.air_volume - volume).max(0.0);
        if location.is_some() {
            self.last_location = location;
        }
        Ok(())
    }

    /// Aspirate and dispense `repetitions` times
    ///
    /// The first aspirate moves to `location`; the rest happen in place.
    /// `None` mixes with the remaining capacity.
    pub fn mix(
        &mut self,
        queue: &mut CommandQueue,
        repetitions: u32,
        volume: Option<f64>,
        location: Option<Location>,
        rate: f64,
    ) -> Result<(), PipetteError> {
        if repetitions == 0 {
            return Ok(());
        }
        let volume = volume.unwrap_or(self.max_volume() - self.current_volume);
        self.atomically(queue, |pipette, queue| {
            queue.enqueue(
                format!(
                    "Mixing {} times with a volume of {}ul",
                    repetitions, volume
                ),
                Vec::new(),
            );
            pipette.aspirate(queue, Some(volume), location, rate)?;
            pipette.dispense(queue, Some(volume), None, rate)?;
            for _ in 1..repetitions {
                pipette.aspirate(queue, Some(volume), None, rate)?;
                pipette.dispense(queue, Some(volume), None, rate)?;
            }
            Ok(())
        })
    }

    /// Push the plunger past bottom, emptying the tip
    pub fn blow_out(
        &mut self,
        queue: &mut CommandQueue,
        location: Option<Location>,
    ) -> Result<(), PipetteError> {
        let position = self.plunger_position(PlungerPosition::BlowOut)?;

        let mut actions = Vec::new();
        if let Some(l) = &location {
            actions.push(Action::MoveTo {
                location: l.clone(),
                strategy: MoveStrategy::Arc,
            });
        }
        actions.push(self.plunger_to(position, None));

        let description = match &location {
            Some(l) => format!("Blowing out at {}", l),
            None => String::from("Blowing out"),
        };
        queue.enqueue(description, actions);

        self.current_volume = 0.0;
        self.air_volume = 0.0;
        if location.is_some() {
            self.last_location = location;
        }
        Ok(())
    }

    /// Touch the tip against the well wall at four points
    ///
    /// Points lie `radius` (a fraction of the well radius) from the
    /// center along X then Y, `v_offset` mm from the rim. Without a
    /// location, the last well visited is used.
    pub fn touch_tip(
        &mut self,
        queue: &mut CommandQueue,
        location: Option<Location>,
        radius: f64,
        v_offset: f64,
    ) -> Result<(), PipetteError> {
        let approach = match location {
            Some(l) => l,
            None => self
                .last_location
                .as_ref()
                .map(|l| l.site.location())
                .ok_or(PipetteError::NoLocation)?,
        };
        let site = approach.site.clone();
        let well = site.well();
        let r = well.radius() * radius;
        let z = well.depth + v_offset;

        let mut actions = vec![Action::MoveTo {
            location: approach.clone(),
            strategy: MoveStrategy::Arc,
        }];
        for (x, y) in [(r, 0.0), (-r, 0.0), (0.0, r), (0.0, -r)] {
            actions.push(Action::MoveTo {
                location: Location::at(site.clone(), Coordinate::new(x, y, z)),
                strategy: MoveStrategy::Direct,
            });
        }
        queue.enqueue("Touching tip", actions);

        self.last_location = Some(approach);
        Ok(())
    }

    /// Draw air above the last well visited
    ///
    /// `None` draws `min_volume`; the gap is drawn `height` mm above the
    /// rim. The air must be dispensed or blown out before the next
    /// liquid aspirate.
    pub fn air_gap(
        &mut self,
        queue: &mut CommandQueue,
        volume: Option<f64>,
        height: Option<f64>,
    ) -> Result<(), PipetteError> {
        let volume = volume.unwrap_or(self.min_volume());
        Self::check_volume(volume)?;
        if volume == 0.0 {
            return Ok(());
        }
        if !self.has_tip {
            return Err(PipetteError::NoTip);
        }
        let site = self
            .last_location
            .as_ref()
            .map(|l| l.site.clone())
            .ok_or(PipetteError::NoLocation)?;
        let target = self.current_volume + volume;
        if target > self.max_volume() {
            return Err(PipetteError::ExceedsCapacity {
                requested: volume,
                available: self.max_volume() - self.current_volume,
            });
        }
        let empty = self.plunger_position_for(0.0)?;
        let destination = self.plunger_position_for(target)?;
        let above = site.top(height.unwrap_or(DEFAULT_AIR_GAP_HEIGHT));

        queue.enqueue("Air gap", Vec::new());
        queue.enqueue(
            format!("Moving to {}", site),
            vec![Action::MoveTo {
                location: above.clone(),
                strategy: MoveStrategy::Direct,
            }],
        );
        let mut actions = Vec::new();
        if self.current_volume == 0.0 {
            actions.push(self.plunger_to(empty, None));
        }
        actions.push(self.plunger_to(destination, Some(self.config.speeds.aspirate)));
        queue.enqueue(
            format!("Aspirating {} uL from {} at 1 speed", volume, site),
            actions,
        );

        self.current_volume = target;
        self.air_volume += volume;
        self.last_location = Some(above);
        Ok(())
    }

    /// Mount a tip
    ///
    /// Without a location, the next unused tip from the bound racks is
    /// taken.
    pub fn pick_up_tip(
        &mut self,
        queue: &mut CommandQueue,
        location: Option<Location>,
    ) -> Result<(), PipetteError> {
        if self.has_tip {
            return Err(PipetteError::TipAlreadyAttached);
        }
        let bottom = self.plunger_position(PlungerPosition::Bottom)?;
        let location = match location {
            Some(l) if l.is_bare() => l.site.bottom(0.0),
            Some(l) => l,
            None => self
                .tips
                .peek()
                .map(|site| site.bottom(0.0))
                .ok_or(PipetteError::OutOfTips)?,
        };
        let site = location.site.clone();

        let mut actions = vec![
            self.plunger_to(bottom, None),
            Action::MoveTo {
                location: location.clone(),
                strategy: MoveStrategy::Arc,
            },
        ];
        for _ in 0..TIP_PRESSES {
            actions.push(Action::MoveTo {
                location: site.bottom(TIP_PLUNGE),
                strategy: MoveStrategy::Direct,
            });
            actions.push(Action::MoveTo {
                location: location.clone(),
                strategy: MoveStrategy::Direct,
            });
        }
        queue.enqueue(format!("Picking up tip from {}", site), actions);

        if self.tips.peek().as_ref() == Some(&site) {
            self.tips.take();
        }
        self.has_tip = true;
        self.current_volume = 0.0;
        self.air_volume = 0.0;
        self.current_tip = Some(site);
        self.last_location = Some(location);
        Ok(())
    }

    /// Release the tip
    ///
    /// Without a location, the tip goes into the bound trash. The tip
    /// cursor is not rewound.
    pub fn drop_tip(
        &mut self,
        queue: &mut CommandQueue,
        location: Option<Location>,
    ) -> Result<(), PipetteError> {
        let location = match location {
            Some(l) if l.is_bare() => l.site.top(-DROP_TIP_DEPTH),
            Some(l) => l,
            None => {
                let trash = self.trash.as_ref().ok_or(PipetteError::NoTrash)?;
                let well = trash.get_well(0).ok_or(PipetteError::NoTrash)?;
                Site::Well(well).top(-DROP_TIP_DEPTH)
            }
        };
        let drop = self.plunger_position(PlungerPosition::DropTip)?;
        let bottom = self.plunger_position(PlungerPosition::Bottom)?;

        let actions = vec![
            Action::MoveTo {
                location: location.clone(),
                strategy: MoveStrategy::Arc,
            },
            self.plunger_to(drop, None),
            self.plunger_to(bottom, None),
        ];
        queue.enqueue(format!("Dropping tip into {}", location), actions);

        self.has_tip = false;
        self.current_volume = 0.0;
        self.air_volume = 0.0;
        self.current_tip = None;
        self.last_location = Some(location);
        Ok(())
    }

    /// Put the tip back where it was picked up
    pub fn return_tip(&mut self, queue: &mut CommandQueue) -> Result<(), PipetteError> {
        let site = self.current_tip.clone().ok_or(PipetteError::NoTip)?;
        self.atomically(queue, |pipette, queue| {
            queue.enqueue("Returning tip", Vec::new());
            pipette.drop_tip(queue, Some(site.location()))
        })
    }

    /// Continue from `tip` on the next automatic pick-up
    pub fn start_at_tip(&mut self, tip: &WellRef) -> Result<(), PipetteError> {
        Ok(self.tips.start_at(tip)?)
    }

    /// Wait
    pub fn delay(
        &mut self,
        queue: &mut CommandQueue,
        seconds: f64,
        minutes: f64,
    ) -> Result<(), PipetteError> {
        let total = minutes * 60.0 + seconds;
        if !(total >= 0.0) {
            return Err(InvalidArgument::NegativeDuration.into());
        }
        let whole_minutes = (total / 60.0) as u64;
        let remaining = total - whole_minutes as f64 * 60.0;
        queue.enqueue(
            format!(
                "Delaying {} minutes and {} seconds",
                whole_minutes, remaining
            ),
            vec![Action::Dwell { seconds: total }],
        );
        Ok(())
    }

    /// Home the plunger axis
    pub fn home(&mut self, queue: &mut CommandQueue) -> Result<(), PipetteError> {
        queue.enqueue(
            format!("Homing pipette plunger on axis {}", self.axis()),
            vec![Action::Home { axis: self.axis() }],
        );
        self.current_volume = 0.0;
        self.air_volume = 0.0;
        Ok(())
    }

    /// Move the head over a location
    pub fn move_to(
        &mut self,
        queue: &mut CommandQueue,
        location: Location,
        strategy: MoveStrategy,
    ) -> Result<(), PipetteError> {
        queue.enqueue(
            format!("Moving to {}", location),
            vec![Action::MoveTo {
                location: location.clone(),
                strategy,
            }],
        );
        self.last_location = Some(location);
        Ok(())
    }

    /// Set or clear one plunger position
    pub fn calibrate(
        &mut self,
        position: PlungerPosition,
        value: Option<f64>,
    ) -> Result<(), PipetteError> {
        let mut plunger = self.config.plunger;
        plunger.set(position, value);
        plunger.validate()?;
        self.config.plunger = plunger;
        Ok(())
    }

    /// Set one plunger position by name ("top", "bottom", "blow_out", "drop_tip")
    pub fn calibrate_named(&mut self, name: &str, value: Option<f64>) -> Result<(), PipetteError> {
        let position = name.parse::<PlungerPosition>()?;
        self.calibrate(position, value)
    }

    /// Set the given plunger positions at once
    pub fn calibrate_plunger(
        &mut self,
        top: Option<f64>,
        bottom: Option<f64>,
        blow_out: Option<f64>,
        drop_tip: Option<f64>,
    ) -> Result<(), PipetteError> {
        let mut plunger = self.config.plunger;
        for (position, value) in [
            (PlungerPosition::Top, top),
            (PlungerPosition::Bottom, bottom),
            (PlungerPosition::BlowOut, blow_out),
            (PlungerPosition::DropTip, drop_tip),
        ] {
            if value.is_some() {
                plunger.set(position, value);
            }
        }
        plunger.validate()?;
        self.config.plunger = plunger;
        Ok(())
    }

    /// Record the plunger's current position as a named position
    pub fn calibrate_from_port<P: MotionPort + ?Sized>(
        &mut self,
        position: PlungerPosition,
        port: &P,
    ) -> Result<(), PipetteError> {
        let current = port.plunger_position(self.axis()).current;
        self.calibrate(position, Some(current))
    }

    /// Capture where the head really is over `location`
    ///
    /// The resolver stores the difference from the expected position as
    /// the container's calibration delta, which is returned.
    pub fn calibrate_position<P, R>(
        &mut self,
        location: &Location,
        port: &P,
        resolver: &mut R,
    ) -> Result<Coordinate, PipetteError>
    where
        P: MotionPort + ?Sized,
        R: LocationResolver + ?Sized,
    {
        let observed = port.head_position().current;
        let delta = resolver.calibrate(location, observed)?;

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "calibrated {=str}: delta {}",
            location.site.labware().label(),
            delta
        );
        Ok(delta)
    }

    /// Change capacity; must stay above `min_volume`
    pub fn set_max_volume(&mut self, max_volume: f64) -> Result<(), PipetteError> {
        if !(max_volume > self.min_volume()) {
            return Err(InvalidArgument::InvalidCapacity.into());
        }
        if self.current_volume > max_volume {
            return Err(PipetteError::VolumeOutOfRange {
                volume: self.current_volume,
            });
        }
        self.config.max_volume = max_volume;
        Ok(())
    }

    /// Change plunger speed multipliers
    pub fn set_speed(
        &mut self,
        aspirate: Option<f64>,
        dispense: Option<f64>,
    ) -> Result<(), PipetteError> {
        let mut speeds = self.config.speeds;
        if let Some(a) = aspirate {
            speeds.aspirate = a;
        }
        if let Some(d) = dispense {
            speeds.dispense = d;
        }
        speeds.validate()?;
        self.config.speeds = speeds;
        Ok(())
    }
}
