//! Targets for head moves
//!
//! A [`Location`] names a site (a well, or a row for multi-channel
//! pipettes) and an optional well-relative offset measured from the
//! well's bottom-center. A location without an offset is "bare" and
//! unpacks to a point just above the rim.

use alloc::vec::Vec;
use core::fmt;

use super::container::{Labware, RowRef, Well, WellRef};
use crate::motion::Coordinate;

/// Height above the rim a bare location unpacks to, in mm
pub const DEFAULT_APPROACH_HEIGHT: f64 = 1.0;

/// Something a pipette can be positioned over
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Site {
    Well(WellRef),
    Row(RowRef),
}

impl Site {
    /// The well the first channel is positioned over
    pub fn anchor(&self) -> WellRef {
        match self {
            Site::Well(well) => well.clone(),
            Site::Row(row) => row.first(),
        }
    }

    pub fn labware(&self) -> &Labware {
        match self {
            Site::Well(well) => well.labware(),
            Site::Row(row) => row.labware(),
        }
    }

    /// Geometry of the anchor well
    pub fn well(&self) -> &Well {
        match self {
            Site::Well(well) => well.well(),
            Site::Row(row) => {
                let len = row.labware().container().row_len();
                &row.labware().container().wells()[row.index() * len]
            }
        }
    }

    /// Bare location at this site
    pub fn location(&self) -> Location {
        Location::bare(self.clone())
    }

    /// `z` mm above the rim (negative goes below it)
    pub fn top(&self, z: f64) -> Location {
        Location::at(self.clone(), Coordinate::new(0.0, 0.0, self.well().depth + z))
    }

    /// `z` mm above the bottom
    pub fn bottom(&self, z: f64) -> Location {
        Location::at(self.clone(), Coordinate::new(0.0, 0.0, z))
    }

    /// Geometric center of the well volume
    pub fn center(&self) -> Location {
        Location::at(self.clone(), Coordinate::new(0.0, 0.0, self.well().depth / 2.0))
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Site::Well(well) => write!(f, "{}", well),
            Site::Row(row) => write!(f, "{}", row),
        }
    }
}

impl From<WellRef> for Site {
    fn from(well: WellRef) -> Self {
        Site::Well(well)
    }
}

impl From<RowRef> for Site {
    fn from(row: RowRef) -> Self {
        Site::Row(row)
    }
}

/// A site plus an optional well-relative offset
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub site: Site,
    pub offset: Option<Coordinate>,
}

impl Location {
    /// Location without an offset
    pub fn bare(site: Site) -> Self {
        Self { site, offset: None }
    }

    /// Location at an explicit offset from the well's bottom-center
    pub fn at(site: Site, offset: Coordinate) -> Self {
        Self {
            site,
            offset: Some(offset),
        }
    }

    pub fn is_bare(&self) -> bool {
        self.offset.is_none()
    }

    /// Offset this location resolves to
    ///
    /// A bare location sits [`DEFAULT_APPROACH_HEIGHT`] above the rim.
    pub fn unpacked_offset(&self) -> Coordinate {
        match self.offset {
            Some(offset) => offset,
            None => Coordinate::new(0.0, 0.0, self.site.well().depth + DEFAULT_APPROACH_HEIGHT),
        }
    }

    /// Site and resolved offset
    pub fn unpack(&self) -> (Site, Coordinate) {
        (self.site.clone(), self.unpacked_offset())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.site)
    }
}

impl From<Site> for Location {
    fn from(site: Site) -> Self {
        Location::bare(site)
    }
}

impl From<WellRef> for Location {
    fn from(well: WellRef) -> Self {
        Location::bare(Site::Well(well))
    }
}

impl From<RowRef> for Location {
    fn from(row: RowRef) -> Self {
        Location::bare(Site::Row(row))
    }
}

impl From<&WellRef> for Location {
    fn from(well: &WellRef) -> Self {
        Location::bare(Site::Well(well.clone()))
    }
}

/// One or more locations, as accepted by the transfer planner
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Locations(pub Vec<Location>);

impl Locations {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Location> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<Location> {
        self.0
    }
}

impl From<Location> for Locations {
    fn from(location: Location) -> Self {
        Locations(alloc::vec![location])
    }
}

impl From<Site> for Locations {
    fn from(site: Site) -> Self {
        Locations(alloc::vec![Location::bare(site)])
    }
}

impl From<WellRef> for Locations {
    fn from(well: WellRef) -> Self {
        Locations(alloc::vec![Location::from(well)])
    }
}

impl From<RowRef> for Locations {
    fn from(row: RowRef) -> Self {
        Locations(alloc::vec![Location::from(row)])
    }
}

impl From<Vec<Location>> for Locations {
    fn from(locations: Vec<Location>) -> Self {
        Locations(locations)
    }
}

impl From<Vec<WellRef>> for Locations {
    fn from(wells: Vec<WellRef>) -> Self {
        Locations(wells.into_iter().map(Location::from).collect())
    }
}

impl From<Vec<RowRef>> for Locations {
    fn from(rows: Vec<RowRef>) -> Self {
        Locations(rows.into_iter().map(Location::from).collect())
    }
}

impl From<&Labware> for Locations {
    fn from(labware: &Labware) -> Self {
        Locations(labware.iter().map(Location::from).collect())
    }
}
