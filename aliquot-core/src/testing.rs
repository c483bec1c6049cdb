//! Shared fixtures for unit tests

use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;

use crate::config::PipetteConfig;
use crate::labware::{Container, ContainerKind, GridLayout, Labware, WellShape};
use crate::motion::Coordinate;
use crate::pipette::Pipette;
use crate::queue::CommandQueue;

fn grid(label: &str, kind: ContainerKind, row_len: usize, rows: usize, shape: WellShape) -> Labware {
    Labware::new(Container::grid(
        label,
        kind,
        GridLayout {
            row_len,
            rows,
            well_spacing: 9.0,
            row_spacing: 9.0,
            origin: Coordinate::ZERO,
        },
        shape,
    ))
}

/// 96-well flat-bottom plate
pub fn plate() -> Labware {
    grid(
        "96-flat",
        ContainerKind::Plate,
        8,
        12,
        WellShape {
            diameter: 6.4,
            depth: 10.5,
        },
    )
}

pub fn tiprack(row_len: usize, rows: usize) -> Labware {
    grid(
        "tiprack",
        ContainerKind::TipRack,
        row_len,
        rows,
        WellShape {
            diameter: 5.0,
            depth: 60.0,
        },
    )
}

pub fn trash() -> Labware {
    grid(
        "trash",
        ContainerKind::Trash,
        1,
        1,
        WellShape {
            diameter: 80.0,
            depth: 80.0,
        },
    )
}

/// Single addressable well
pub fn point(label: &str) -> Labware {
    grid(
        label,
        ContainerKind::Point,
        1,
        1,
        WellShape {
            diameter: 10.0,
            depth: 20.0,
        },
    )
}

/// p200 with a full rack of tips and a trash
pub fn pipette() -> Pipette {
    pipette_with(PipetteConfig::default())
}

pub fn pipette_with(config: PipetteConfig) -> Pipette {
    match Pipette::new(config, vec![tiprack(8, 12)], Some(trash())) {
        Ok(p) => p,
        Err(e) => panic!("fixture pipette rejected: {}", e),
    }
}

pub fn descriptions(queue: &CommandQueue) -> Vec<String> {
    queue.descriptions().map(ToString::to_string).collect()
}
