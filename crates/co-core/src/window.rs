//! Mass windows.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// An open mass interval `(low, high)`.
///
/// Two windows describe the analysis regions: the outer `preselection`
/// window and the `signal_region` strictly nested inside it. Membership is
/// strict on both ends, matching the event-selection cuts
/// `mass > low && mass < high`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Window {
    /// Lower mass bound.
    pub low: f64,
    /// Upper mass bound.
    pub high: f64,
}

impl Window {
    /// Create a window, validating `low < high` and finiteness.
    pub fn new(low: f64, high: f64) -> Result<Self> {
        if !(low.is_finite() && high.is_finite()) {
            return Err(Error::Validation(format!(
                "window bounds must be finite, got ({low}, {high})"
            )));
        }
        if low >= high {
            return Err(Error::Validation(format!(
                "window requires low < high, got ({low}, {high})"
            )));
        }
        Ok(Self { low, high })
    }

    /// Whether `m` lies strictly inside the window.
    pub fn contains(&self, m: f64) -> bool {
        m > self.low && m < self.high
    }

    /// Window width `high - low`.
    pub fn width(&self) -> f64 {
        self.high - self.low
    }

    /// Whether `inner` is strictly nested: `low < inner.low < inner.high < high`.
    pub fn strictly_encloses(&self, inner: &Window) -> bool {
        self.low < inner.low && inner.high < self.high
    }
}

/// Validate the preselection / signal-region nesting invariant.
pub fn validate_nesting(preselection: &Window, signal_region: &Window) -> Result<()> {
    if !preselection.strictly_encloses(signal_region) {
        return Err(Error::Validation(format!(
            "signal region ({}, {}) must be strictly inside the preselection window ({}, {})",
            signal_region.low, signal_region.high, preselection.low, preselection.high
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_contains_is_strict() {
        let w = Window::new(100.0, 180.0).unwrap();
        assert!(w.contains(100.5));
        assert!(!w.contains(100.0));
        assert!(!w.contains(180.0));
    }

    #[test]
    fn test_window_rejects_inverted_bounds() {
        assert!(Window::new(180.0, 100.0).is_err());
        assert!(Window::new(1.0, f64::NAN).is_err());
    }

    #[test]
    fn test_nesting_invariant() {
        let pres = Window::new(100.0, 180.0).unwrap();
        let sr = Window::new(120.0, 130.0).unwrap();
        assert!(validate_nesting(&pres, &sr).is_ok());
        assert!(validate_nesting(&sr, &pres).is_err());
    }
}
