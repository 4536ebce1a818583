//! # co-search
//!
//! Category-boundary optimisation for CatOpt.
//!
//! This crate provides:
//! - [`BoundarySet`] and the rank-space candidate grid generator.
//! - Boundary-set validation with a shared memoization cache of per-pair
//!   verdicts.
//! - The parallel optimiser evaluating every valid candidate through the
//!   fit + limit pipeline and selecting the optimum.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod grid;
pub mod optimize;
pub mod validate;

pub use grid::{BOUNDARY_EPSILON, BoundarySet, GridConfig, form_boundaries_grid};
pub use optimize::{
    CandidateOutcome, OptimisationOutcome, SearchConfig, boundaries_performance,
    optimise_boundary, unsplit_performance,
};
pub use validate::{ValidationCache, is_valid_boundaries};
