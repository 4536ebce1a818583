//! # co-core
//!
//! Core types for CatOpt: the error taxonomy shared by every crate and the
//! `Window` mass-range type used to describe the preselection and
//! signal-region cuts.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod window;

pub use error::{Error, Result};
pub use window::Window;
