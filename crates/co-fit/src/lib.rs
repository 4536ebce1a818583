//! # co-fit
//!
//! Background-model fitting for CatOpt.
//!
//! This crate provides:
//! - A scalar L-BFGS minimizer wrapping argmin, with analytic gradients.
//! - The [`ExponentialModel`] mass-density model with a fitted-parameter
//!   uncertainty envelope.
//! - The unbinned sideband NLL fit producing that model.
//! - Per-category yield estimation combining the fitted background with
//!   direct signal counting.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod background;
pub mod exponential;
pub mod optimizer;
pub mod yields;

pub use background::{FitConfig, fit_background};
pub use exponential::{ExponentialModel, int_exp};
pub use optimizer::{OptimizerConfig, ScalarMinimizer, ScalarMinimum, ScalarObjective};
pub use yields::{CategoryYield, perform_fit};
