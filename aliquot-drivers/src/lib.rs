//! Collaborator implementations for the aliquot engine
//!
//! This crate provides concrete implementations of the traits defined
//! in aliquot-core:
//!
//! - Deck layout and location resolution with calibration deltas
//! - Built-in labware catalog
//! - Virtual motion controller
//! - Operator signal channel for pausing and aborting replay

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

pub mod catalog;
pub mod control;
pub mod deck;
pub mod virtual_port;

pub use control::{Request, SignalChannel};
pub use deck::Deck;
pub use virtual_port::{VirtualMotionPort, VirtualPortConfig};
