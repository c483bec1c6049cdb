//! Deck layout and location resolution
//!
//! The deck is a grid of named slots (A1..E3). Containers are loaded
//! into slots; a location resolves to the slot origin plus the well's
//! position plus the location's offset, shifted by any calibration delta
//! captured for the container.

use alloc::vec::Vec;

use aliquot_core::config::DEFAULT_SAFE_HEIGHT;
use aliquot_core::labware::{Container, Labware, Location};
use aliquot_core::motion::Coordinate;
use aliquot_core::traits::{LocationResolver, ResolveError};
use heapless::String;

/// Maximum slot name length
pub const MAX_SLOT_NAME_LEN: usize = 4;

/// Slot columns (lettered, along X)
pub const SLOT_COLUMNS: usize = 5;

/// Slot rows (numbered, along Y)
pub const SLOT_ROWS: usize = 3;

/// Distance between slot origins along X, in mm
pub const SLOT_PITCH_X: f64 = 96.25;

/// Distance between slot origins along Y, in mm
pub const SLOT_PITCH_Y: f64 = 133.0;

/// Slot name ("A1")
pub type SlotName = String<MAX_SLOT_NAME_LEN>;

/// A named position on the deck
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Slot {
    pub name: SlotName,
    pub origin: Coordinate,
}

#[derive(Debug, Clone)]
struct Placement {
    slot: usize,
    labware: Labware,
    delta: Coordinate,
}

/// Slots, the containers loaded into them, and their calibration
#[derive(Debug, Clone)]
pub struct Deck {
    slots: Vec<Slot>,
    placements: Vec<Placement>,
    safe_height: f64,
}

impl Default for Deck {
    fn default() -> Self {
        Self::new(DEFAULT_SAFE_HEIGHT)
    }
}

impl Deck {
    /// Standard 5 x 3 slot deck
    pub fn new(safe_height: f64) -> Self {
        let mut slots = Vec::with_capacity(SLOT_COLUMNS * SLOT_ROWS);
        for column in 0..SLOT_COLUMNS {
            for row in 0..SLOT_ROWS {
                let mut name = SlotName::new();
                let _ = name.push((b'A' + column as u8) as char);
                let _ = name.push((b'1' + row as u8) as char);
                slots.push(Slot {
                    name,
                    origin: Coordinate::new(
                        column as f64 * SLOT_PITCH_X,
                        row as f64 * SLOT_PITCH_Y,
                        0.0,
                    ),
                });
            }
        }
        Self::with_slots(slots, safe_height)
    }

    /// Deck with a custom slot layout
    pub fn with_slots(slots: Vec<Slot>, safe_height: f64) -> Self {
        Self {
            slots,
            placements: Vec::new(),
            safe_height,
        }
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    fn slot_index(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.name.as_str() == name)
    }

    /// Place a container in a slot
    pub fn load(&mut self, slot: &str, container: Container) -> Result<Labware, ResolveError> {
        let slot = self.slot_index(slot).ok_or(ResolveError::UnknownSlot)?;
        if self.placements.iter().any(|p| p.slot == slot) {
            return Err(ResolveError::SlotOccupied);
        }
        let labware = Labware::new(container);
        self.placements.push(Placement {
            slot,
            labware: labware.clone(),
            delta: Coordinate::ZERO,
        });

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "deck: loaded {=str} into {=str}",
            labware.label(),
            self.slots[slot].name.as_str()
        );
        Ok(labware)
    }

    /// Container in a slot
    pub fn labware(&self, slot: &str) -> Option<&Labware> {
        let slot = self.slot_index(slot)?;
        self.placements
            .iter()
            .find(|p| p.slot == slot)
            .map(|p| &p.labware)
    }

    fn placement(&self, labware: &Labware) -> Result<&Placement, ResolveError> {
        self.placements
            .iter()
            .find(|p| &p.labware == labware)
            .ok_or(ResolveError::UnknownContainer)
    }

    /// Position of a location ignoring calibration
    fn nominal(&self, location: &Location) -> Result<Coordinate, ResolveError> {
        let (site, offset) = location.unpack();
        let placement = self.placement(site.labware())?;
        Ok(self.slots[placement.slot].origin + site.well().position + offset)
    }

    /// Forget every captured calibration delta
    pub fn clear_calibration(&mut self) {
        for placement in &mut self.placements {
            placement.delta = Coordinate::ZERO;
        }
    }
}

impl LocationResolver for Deck {
    fn resolve(&self, location: &Location) -> Result<Coordinate, ResolveError> {
        let delta = self.placement(location.site.labware())?.delta;
        Ok(self.nominal(location)? + delta)
    }

    fn safe_height(&self) -> f64 {
        self.safe_height
    }

    fn calibrate(
        &mut self,
        location: &Location,
        observed: Coordinate,
    ) -> Result<Coordinate, ResolveError> {
        let delta = observed - self.nominal(location)?;
        let labware = location.site.labware();
        let placement = self
            .placements
            .iter_mut()
            .find(|p| &p.labware == labware)
            .ok_or(ResolveError::UnknownContainer)?;
        placement.delta = delta;
        Ok(delta)
    }

    fn delta(&self, labware: &Labware) -> Coordinate {
        self.placement(labware)
            .map(|p| p.delta)
            .unwrap_or(Coordinate::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use aliquot_core::labware::Site;
    use proptest::prelude::*;

    fn deck_with_plate() -> (Deck, Labware) {
        let mut deck = Deck::default();
        let plate = deck
            .load("B2", catalog::container("96-flat").unwrap())
            .unwrap();
        (deck, plate)
    }

    #[test]
    fn test_slot_names() {
        let deck = Deck::default();
        assert_eq!(deck.slots().len(), 15);
        assert_eq!(deck.slots()[0].name.as_str(), "A1");
        assert_eq!(deck.slots()[14].name.as_str(), "E3");
    }

    #[test]
    fn test_load_rejects_bad_slots() {
        let (mut deck, plate) = deck_with_plate();
        assert_eq!(
            deck.load("B2", catalog::container("point").unwrap()),
            Err(ResolveError::SlotOccupied)
        );
        assert_eq!(
            deck.load("Z9", catalog::container("point").unwrap()),
            Err(ResolveError::UnknownSlot)
        );
        assert_eq!(deck.labware("B2"), Some(&plate));
    }

    #[test]
    fn test_resolve_adds_slot_origin() {
        let (deck, plate) = deck_with_plate();
        let site = Site::Well(plate.well(9));
        let resolved = deck.resolve(&site.bottom(1.0)).unwrap();
        assert_eq!(
            resolved,
            Coordinate::new(SLOT_PITCH_X + 9.0, SLOT_PITCH_Y + 9.0, 1.0)
        );
        // bare locations sit just above the rim
        assert_eq!(deck.resolve(&site.location()).unwrap().z, 11.5);
    }

    #[test]
    fn test_unknown_container() {
        let deck = Deck::default();
        let stray = Labware::new(catalog::container("point").unwrap());
        assert_eq!(
            deck.resolve(&stray.well(0).into()),
            Err(ResolveError::UnknownContainer)
        );
    }

    #[test]
    fn test_calibration_shifts_every_well() {
        let (mut deck, plate) = deck_with_plate();
        let a1 = Site::Well(plate.well(0)).bottom(0.0);
        let nominal = deck.resolve(&a1).unwrap();
        let delta = deck
            .calibrate(&a1, nominal + Coordinate::new(0.5, -0.25, 1.0))
            .unwrap();
        assert_eq!(delta, Coordinate::new(0.5, -0.25, 1.0));
        assert_eq!(deck.delta(&plate), delta);

        let h12 = Site::Well(plate.well(95)).bottom(0.0);
        let expected = Coordinate::new(
            SLOT_PITCH_X + 99.0 + 0.5,
            SLOT_PITCH_Y + 63.0 - 0.25,
            1.0,
        );
        assert_eq!(deck.resolve(&h12).unwrap(), expected);

        deck.clear_calibration();
        assert_eq!(deck.delta(&plate), Coordinate::ZERO);
    }

    proptest! {
        #[test]
        fn calibration_recovers_any_offset(
            dx in -5.0..5.0f64,
            dy in -5.0..5.0f64,
            dz in -5.0..5.0f64,
            well in 0usize..96,
        ) {
            let (mut deck, plate) = deck_with_plate();
            let reference = Site::Well(plate.well(0)).bottom(0.0);
            let nominal = deck.resolve(&reference).unwrap();
            deck.calibrate(&reference, nominal + Coordinate::new(dx, dy, dz)).unwrap();

            let target = Site::Well(plate.well(well)).top(0.0);
            let before = deck.nominal(&target).unwrap();
            let after = deck.resolve(&target).unwrap();
            prop_assert!((after.x - before.x - dx).abs() < 1e-9);
            prop_assert!((after.y - before.y - dy).abs() < 1e-9);
            prop_assert!((after.z - before.z - dz).abs() < 1e-9);
        }
    }
}
