//! Built-in container definitions
//!
//! Geometry for the labware most protocols use. Positions are relative
//! to the container origin (the bottom-center of its first well).

use aliquot_core::labware::{Container, ContainerKind, GridLayout, WellShape};
use aliquot_core::motion::Coordinate;

/// Names accepted by [`container`]
pub const NAMES: &[&str] = &[
    "96-flat",
    "96-deep-well",
    "tiprack-10ul",
    "tiprack-200ul",
    "trough-12row",
    "point",
    "trash-box",
];

/// Pitch of a standard 96-well grid, in mm
pub const WELL_PITCH: f64 = 9.0;

fn plate_96(label: &str, kind: ContainerKind, shape: WellShape) -> Container {
    Container::grid(
        label,
        kind,
        GridLayout {
            row_len: 8,
            rows: 12,
            well_spacing: WELL_PITCH,
            row_spacing: WELL_PITCH,
            origin: Coordinate::ZERO,
        },
        shape,
    )
}

fn single(label: &str, kind: ContainerKind, shape: WellShape) -> Container {
    Container::grid(
        label,
        kind,
        GridLayout {
            row_len: 1,
            rows: 1,
            well_spacing: 0.0,
            row_spacing: 0.0,
            origin: Coordinate::ZERO,
        },
        shape,
    )
}

/// Look up a container definition by name
///
/// The container is labelled with its catalog name.
pub fn container(name: &str) -> Option<Container> {
    let container = match name {
        "96-flat" => plate_96(
            name,
            ContainerKind::Plate,
            WellShape {
                diameter: 6.4,
                depth: 10.5,
            },
        ),
        "96-deep-well" => plate_96(
            name,
            ContainerKind::Plate,
            WellShape {
                diameter: 8.2,
                depth: 33.5,
            },
        ),
        "tiprack-10ul" => plate_96(
            name,
            ContainerKind::TipRack,
            WellShape {
                diameter: 3.5,
                depth: 56.0,
            },
        ),
        "tiprack-200ul" => plate_96(
            name,
            ContainerKind::TipRack,
            WellShape {
                diameter: 3.5,
                depth: 60.0,
            },
        ),
        // One lettered channel per numbered row
        "trough-12row" => Container::grid(
            name,
            ContainerKind::Trough,
            GridLayout {
                row_len: 1,
                rows: 12,
                well_spacing: 0.0,
                row_spacing: WELL_PITCH,
                origin: Coordinate::ZERO,
            },
            WellShape {
                diameter: 8.0,
                depth: 38.0,
            },
        ),
        "point" => single(
            name,
            ContainerKind::Point,
            WellShape {
                diameter: 0.0,
                depth: 0.0,
            },
        ),
        "trash-box" => single(
            name,
            ContainerKind::Trash,
            WellShape {
                diameter: 80.0,
                depth: 58.0,
            },
        ),
        _ => return None,
    };
    Some(container)
}
