//! Tip inventory
//!
//! Tips are taken in order from the concatenation of every bound rack.
//! A multi-channel pipette takes a whole row at a time.

use alloc::vec::Vec;

use crate::error::InvalidArgument;
use crate::labware::{Labware, Site, WellRef};

/// Cursor over the tips of one or more racks
#[derive(Debug, Clone, Default)]
pub struct TipTracker {
    racks: Vec<Labware>,
    /// Index into the flattened well sequence
    offset: usize,
    by_row: bool,
}

impl TipTracker {
    pub fn new(racks: Vec<Labware>, by_row: bool) -> Self {
        Self {
            racks,
            offset: 0,
            by_row,
        }
    }

    pub fn racks(&self) -> &[Labware] {
        &self.racks
    }

    /// Flattened index of the next tip
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Tips across every rack
    pub fn total(&self) -> usize {
        self.racks.iter().map(Labware::len).sum()
    }

    /// Tips (or rows) not yet taken
    pub fn remaining(&self) -> usize {
        let mut count = 0;
        let mut cursor = self.clone();
        while cursor.take().is_some() {
            count += 1;
        }
        count
    }

    /// Next unused tip, without consuming it
    pub fn peek(&self) -> Option<Site> {
        let mut start = 0;
        for rack in &self.racks {
            let len = rack.len();
            if self.offset < start + len {
                let index = self.offset - start;
                return if self.by_row {
                    rack.get_row(index / rack.container().row_len())
                        .map(Site::Row)
                } else {
                    rack.get_well(index).map(Site::Well)
                };
            }
            start += len;
        }
        None
    }

    /// Take the next unused tip
    pub fn take(&mut self) -> Option<Site> {
        let site = self.peek()?;
        self.offset += match &site {
            Site::Row(row) => row.labware().container().row_len(),
            Site::Well(_) => 1,
        };
        Some(site)
    }

    /// Continue from `tip` on the next pick-up
    pub fn start_at(&mut self, tip: &WellRef) -> Result<(), InvalidArgument> {
        let mut start = 0;
        for rack in &self.racks {
            if rack == tip.labware() {
                self.offset = start + tip.index();
                return Ok(());
            }
            start += rack.len();
        }
        Err(InvalidArgument::UnknownTip)
    }

    /// Back to the first tip of the first rack
    pub fn rewind(&mut self) {
        self.offset = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labware::{Container, ContainerKind, GridLayout, WellShape};
    use crate::motion::Coordinate;
    use alloc::vec;

    fn rack(wells: usize, row_len: usize) -> Labware {
        Labware::new(Container::grid(
            "tiprack",
            ContainerKind::TipRack,
            GridLayout {
                row_len,
                rows: wells / row_len,
                well_spacing: 5.0,
                row_spacing: 5.0,
                origin: Coordinate::ZERO,
            },
            WellShape {
                diameter: 5.0,
                depth: 50.0,
            },
        ))
    }

    #[test]
    fn test_walks_across_racks() {
        let first = rack(4, 2);
        let second = rack(4, 2);
        let mut tips = TipTracker::new(vec![first.clone(), second.clone()], false);

        for i in 0..4 {
            assert_eq!(tips.take(), Some(Site::Well(first.well(i))));
        }
        for i in 0..4 {
            assert_eq!(tips.take(), Some(Site::Well(second.well(i))));
        }
        assert_eq!(tips.take(), None);
        assert_eq!(tips.offset(), 8);
    }

    #[test]
    fn test_rows_for_multichannel() {
        let first = rack(96, 8);
        let second = rack(96, 8);
        let mut tips = TipTracker::new(vec![first.clone(), second.clone()], true);

        for i in 0..12 {
            assert_eq!(tips.take(), Some(Site::Row(first.row(i))));
        }
        assert_eq!(tips.take(), Some(Site::Row(second.row(0))));
        assert_eq!(tips.offset(), 104);
        assert_eq!(tips.remaining(), 11);
    }

    #[test]
    fn test_start_at_and_rewind() {
        let first = rack(4, 2);
        let second = rack(4, 2);
        let mut tips = TipTracker::new(vec![first.clone(), second.clone()], false);

        tips.start_at(&second.well(2)).unwrap();
        assert_eq!(tips.take(), Some(Site::Well(second.well(2))));

        let stranger = rack(4, 2);
        assert_eq!(tips.start_at(&stranger.well(0)), Err(InvalidArgument::UnknownTip));

        tips.rewind();
        assert_eq!(tips.peek(), Some(Site::Well(first.well(0))));
        assert_eq!(tips.total(), 8);
    }
}
