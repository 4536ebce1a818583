//! # co-events
//!
//! Columnar event storage for CatOpt.
//!
//! This crate provides:
//! - An immutable [`EventTable`] (SoA layout) holding per-event mass, weight
//!   and optional classifier score.
//! - Slicing by mass window, sideband region and score interval, always
//!   producing new owned tables.
//! - Seeded toy-dataset generation for tests and the demo CLI.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod table;
pub mod toy;

pub use table::EventTable;
pub use toy::{ToyConfig, generate_toy_data};
