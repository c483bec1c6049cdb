//! Containers and wells
//!
//! A container is an ordered collection of wells. Wells are stored in
//! plate order (A1, B1, ... H1, A2, ...) and grouped into rows of
//! `row_len` consecutive wells, which is the unit a multi-channel
//! pipette addresses.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::ops::Range;

use heapless::String;

use crate::motion::Coordinate;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum container label length
pub const MAX_LABEL_LEN: usize = 24;

/// Maximum well name length ("A1", "P24")
pub const MAX_WELL_NAME_LEN: usize = 4;

/// Container label
pub type Label = String<MAX_LABEL_LEN>;

/// Well name
pub type WellName = String<MAX_WELL_NAME_LEN>;

/// What a container is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ContainerKind {
    #[default]
    Plate,
    TipRack,
    Trough,
    Trash,
    /// A single addressable point
    Point,
}

/// A single well
///
/// `position` is the well's bottom-center relative to the container origin.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Well {
    pub name: WellName,
    pub position: Coordinate,
    /// Inner diameter in mm
    pub diameter: f64,
    /// Depth from rim to bottom in mm
    pub depth: f64,
}

impl Well {
    pub const fn radius(&self) -> f64 {
        self.diameter / 2.0
    }
}

/// Dimensions shared by every well of a grid
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WellShape {
    pub diameter: f64,
    pub depth: f64,
}

/// Grid layout for [`Container::grid`]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridLayout {
    /// Wells per row (lettered A, B, ...)
    pub row_len: usize,
    /// Number of rows (numbered 1, 2, ...)
    pub rows: usize,
    /// Spacing between lettered wells (along Y) in mm
    pub well_spacing: f64,
    /// Spacing between numbered rows (along X) in mm
    pub row_spacing: f64,
    /// Position of A1's bottom-center
    pub origin: Coordinate,
}

/// Container definition
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Container {
    label: Label,
    kind: ContainerKind,
    wells: Vec<Well>,
    row_len: usize,
}

impl Container {
    /// Create a container from explicit wells
    ///
    /// A `row_len` of zero is treated as one row spanning every well.
    pub fn new(label: &str, kind: ContainerKind, wells: Vec<Well>, row_len: usize) -> Self {
        let row_len = if row_len == 0 { wells.len().max(1) } else { row_len };
        Self {
            label: label_from(label),
            kind,
            wells,
            row_len,
        }
    }

    /// Create a lettered grid of identical wells
    pub fn grid(label: &str, kind: ContainerKind, layout: GridLayout, shape: WellShape) -> Self {
        let mut wells = Vec::with_capacity(layout.row_len * layout.rows);
        for row in 0..layout.rows {
            for slot in 0..layout.row_len {
                wells.push(Well {
                    name: grid_name(slot, row),
                    position: layout.origin
                        + Coordinate::new(
                            row as f64 * layout.row_spacing,
                            slot as f64 * layout.well_spacing,
                            0.0,
                        ),
                    diameter: shape.diameter,
                    depth: shape.depth,
                });
            }
        }
        Self::new(label, kind, wells, layout.row_len)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    pub fn wells(&self) -> &[Well] {
        &self.wells
    }

    pub fn row_len(&self) -> usize {
        self.row_len
    }

    pub fn len(&self) -> usize {
        self.wells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wells.is_empty()
    }

    /// Number of complete rows
    pub fn row_count(&self) -> usize {
        self.wells.len() / self.row_len
    }

    /// Index of the well with this name
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.wells.iter().position(|w| w.name.as_str() == name)
    }
}

fn label_from(s: &str) -> Label {
    let mut label = Label::new();
    for c in s.chars() {
        if label.push(c).is_err() {
            break;
        }
    }
    label
}

fn grid_name(slot: usize, row: usize) -> WellName {
    let mut name = WellName::new();
    let _ = name.push((b'A' + (slot % 26) as u8) as char);
    let mut digits = [0u8; 3];
    let mut n = row + 1;
    let mut len = 0;
    while n > 0 && len < digits.len() {
        digits[len] = b'0' + (n % 10) as u8;
        n /= 10;
        len += 1;
    }
    for d in digits[..len].iter().rev() {
        let _ = name.push(*d as char);
    }
    name
}

/// Shared handle to a container placed on the deck
///
/// Handles compare by identity: two handles are equal only if they
/// point at the same loaded container.
#[derive(Debug, Clone)]
pub struct Labware(Arc<Container>);

impl Labware {
    pub fn new(container: Container) -> Self {
        Self(Arc::new(container))
    }

    pub fn container(&self) -> &Container {
        &self.0
    }

    pub fn label(&self) -> &str {
        self.0.label()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Well at `index`, if it exists
    pub fn get_well(&self, index: usize) -> Option<WellRef> {
        (index < self.len()).then(|| WellRef {
            labware: self.clone(),
            index,
        })
    }

    /// Well at `index`
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range, like slice indexing.
    pub fn well(&self, index: usize) -> WellRef {
        match self.get_well(index) {
            Some(well) => well,
            None => panic!(
                "well index {} out of range for {} ({} wells)",
                index,
                self.label(),
                self.len()
            ),
        }
    }

    /// Well by name ("A1")
    pub fn well_named(&self, name: &str) -> Option<WellRef> {
        self.0
            .position_of(name)
            .and_then(|index| self.get_well(index))
    }

    /// Consecutive wells, clipped to the container
    pub fn wells(&self, range: Range<usize>) -> Vec<WellRef> {
        let end = range.end.min(self.len());
        (range.start.min(end)..end).map(|i| self.well(i)).collect()
    }

    /// Every well in order
    pub fn iter(&self) -> impl Iterator<Item = WellRef> + '_ {
        (0..self.len()).map(move |i| self.well(i))
    }

    /// Row at `index`, if it exists
    pub fn get_row(&self, index: usize) -> Option<RowRef> {
        (index < self.0.row_count()).then(|| RowRef {
            labware: self.clone(),
            index,
        })
    }

    /// Row at `index`
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn row(&self, index: usize) -> RowRef {
        match self.get_row(index) {
            Some(row) => row,
            None => panic!("row index {} out of range for {}", index, self.label()),
        }
    }

    /// Every row in order
    pub fn rows(&self) -> impl Iterator<Item = RowRef> + '_ {
        (0..self.0.row_count()).map(move |i| self.row(i))
    }
}

impl PartialEq for Labware {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Labware {}

/// Reference to one well of a loaded container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WellRef {
    labware: Labware,
    index: usize,
}

impl WellRef {
    pub fn labware(&self) -> &Labware {
        &self.labware
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn well(&self) -> &Well {
        &self.labware.container().wells()[self.index]
    }

    pub fn name(&self) -> &str {
        &self.well().name
    }
}

impl fmt::Display for WellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Well {} of {}", self.name(), self.labware.label())
    }
}

/// Reference to one row of a loaded container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRef {
    labware: Labware,
    index: usize,
}

impl RowRef {
    pub fn labware(&self) -> &Labware {
        &self.labware
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Wells of this row in order
    pub fn wells(&self) -> impl Iterator<Item = WellRef> + '_ {
        let len = self.labware.container().row_len();
        let start = self.index * len;
        (start..start + len).map(move |i| self.labware.well(i))
    }

    /// The well the first channel lands in
    pub fn first(&self) -> WellRef {
        let len = self.labware.container().row_len();
        self.labware.well(self.index * len)
    }
}

impl fmt::Display for RowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (row of {})",
            self.first(),
            self.labware.container().row_len()
        )
    }
}
