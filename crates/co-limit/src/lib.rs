//! # co-limit
//!
//! Expected-sensitivity figures of merit for CatOpt:
//! - Asymptotic CLs for a signal-strength hypothesis over one or more
//!   categories, and the 95%-CL upper limit found by bisection.
//! - AMS (approximate median significance), combined in quadrature across
//!   categories.
//!
//! Both operate on *expected* per-category yields (Asimov approximation),
//! not observed counts.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ams;
pub mod cls;

pub use ams::ams;
pub use cls::{LimitConfig, expected_cls, expected_limit};
