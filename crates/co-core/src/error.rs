//! Error types for CatOpt

use thiserror::Error;

/// CatOpt error type
#[derive(Error, Debug)]
pub enum Error {
    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Background NLL fit did not converge. Carries the sideband event count
    /// and the optimizer's termination diagnostics.
    #[error("Background fit diverged (n_sideband = {n_sideband}): {message}")]
    FitDivergence {
        /// Number of sideband events entering the fit.
        n_sideband: usize,
        /// Optimizer diagnostics (termination reason, iteration counts).
        message: String,
    },

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
