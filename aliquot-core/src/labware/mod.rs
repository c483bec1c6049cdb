//! Labware reference model
//!
//! Read-only view of the containers loaded on the deck. Geometry is
//! resolved to deck coordinates by a [`LocationResolver`](crate::traits::LocationResolver).

pub mod container;
pub mod location;

pub use container::{
    Container, ContainerKind, GridLayout, Label, Labware, RowRef, Well, WellName, WellRef,
    WellShape, MAX_LABEL_LEN,
};
pub use location::{Location, Locations, Site, DEFAULT_APPROACH_HEIGHT};
