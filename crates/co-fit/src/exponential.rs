//! Fitted exponential background model.

use co_core::Window;

/// Definite integral of `n * exp(-lambda * m)` over `[lo, hi]`.
///
/// For `|lambda| < 1e-12` the integrand is numerically uniform and the
/// integral degenerates to `n * (hi - lo)`.
pub fn int_exp(lo: f64, hi: f64, lambda: f64, n: f64) -> f64 {
    if lambda.abs() < 1e-12 {
        return n * (hi - lo);
    }
    (n / lambda) * ((-lambda * lo).exp() - (-lambda * hi).exp())
}

/// Exponential mass-density model fitted to the background sidebands.
///
/// Holds the fitted decay rate with its ±1σ variants and the sideband weight
/// sum `N` with Poisson `N ± √N` variants. The density is normalized over
/// the sidebands (preselection minus signal region), so integrating it over
/// the sidebands recovers `N`. Constructed once per fit call and discarded
/// after the yield queries.
#[derive(Debug, Clone)]
pub struct ExponentialModel {
    lambda: f64,
    lambda_up: f64,
    lambda_down: f64,
    n: f64,
    n_up: f64,
    n_down: f64,
    preselection: Window,
    signal_region: Window,
}

impl ExponentialModel {
    pub(crate) fn new(
        lambda: f64,
        lambda_up: f64,
        lambda_down: f64,
        n: f64,
        preselection: Window,
        signal_region: Window,
    ) -> Self {
        let root = n.max(0.0).sqrt();
        Self {
            lambda,
            lambda_up,
            lambda_down,
            n,
            n_up: n + root,
            n_down: n - root,
            preselection,
            signal_region,
        }
    }

    /// Fitted decay rate.
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// +1σ decay-rate variant.
    pub fn lambda_up(&self) -> f64 {
        self.lambda_up
    }

    /// −1σ decay-rate variant.
    pub fn lambda_down(&self) -> f64 {
        self.lambda_down
    }

    /// Sideband weight sum.
    pub fn n(&self) -> f64 {
        self.n
    }

    /// Sideband normalization `Z(lambda)`: the integral of
    /// `exp(-lambda * m)` over the two sideband sub-intervals.
    fn sideband_norm(&self, lambda: f64) -> f64 {
        int_exp(self.preselection.low, self.signal_region.low, lambda, 1.0)
            + int_exp(self.signal_region.high, self.preselection.high, lambda, 1.0)
    }

    /// Expected events per unit mass at `m`.
    pub fn density(&self, m: f64) -> f64 {
        (self.n / self.sideband_norm(self.lambda)) * (-self.lambda * m).exp()
    }

    /// `(min, max)` of the density at `m` over all 3×3 combinations of
    /// {λ, λ↑, λ↓} × {N, N↑, N↓}. A conservative envelope, not a rigorous
    /// confidence interval.
    pub fn density_envelope(&self, m: f64) -> (f64, f64) {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &l in &[self.lambda, self.lambda_up, self.lambda_down] {
            for &n in &[self.n, self.n_up, self.n_down] {
                let v = (n / self.sideband_norm(l)) * (-l * m).exp();
                min = min.min(v);
                max = max.max(v);
            }
        }
        (min, max)
    }

    /// Expected event count in `window` under the nominal parameters.
    pub fn expected_count(&self, window: &Window) -> f64 {
        int_exp(window.low, window.high, self.lambda, self.n / self.sideband_norm(self.lambda))
    }

    /// `(nominal, min, max)` expected count in `window`, the extrema taken
    /// over the same 3×3 variant grid as [`Self::density_envelope`].
    pub fn expected_count_envelope(&self, window: &Window) -> (f64, f64, f64) {
        let nominal = self.expected_count(window);
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &l in &[self.lambda, self.lambda_up, self.lambda_down] {
            for &n in &[self.n, self.n_up, self.n_down] {
                let v = int_exp(window.low, window.high, l, n / self.sideband_norm(l));
                min = min.min(v);
                max = max.max(v);
            }
        }
        (nominal, min, max)
    }
}
