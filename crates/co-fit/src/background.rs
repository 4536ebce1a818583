//! Unbinned exponential fit to the background sidebands.

use crate::exponential::{ExponentialModel, int_exp};
use crate::optimizer::{OptimizerConfig, ScalarMinimizer, ScalarObjective};
use co_core::window::validate_nesting;
use co_core::{Error, Result, Window};
use co_events::EventTable;

/// Configuration of the background fit.
#[derive(Debug, Clone)]
pub struct FitConfig {
    /// Outer preselection mass window.
    pub preselection: Window,
    /// Signal-region mass window, strictly nested in the preselection.
    pub signal_region: Window,
    /// Initial guess for the decay rate.
    pub lambda_guess: f64,
    /// Box bounds on the decay rate during minimization.
    pub lambda_bounds: (f64, f64),
    /// Underlying L-BFGS settings.
    pub optimizer: OptimizerConfig,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            preselection: Window { low: 100.0, high: 180.0 },
            signal_region: Window { low: 120.0, high: 130.0 },
            lambda_guess: 0.1,
            lambda_bounds: (-1.0, 1.0),
            optimizer: OptimizerConfig::default(),
        }
    }
}

/// Sideband normalization `Z(lambda)` for the exponential density: the
/// integral of `exp(-lambda * m)` over `(pres.low, sr.low)` and
/// `(sr.high, pres.high)`.
fn sideband_norm(lambda: f64, pres: &Window, sr: &Window) -> f64 {
    int_exp(pres.low, sr.low, lambda, 1.0) + int_exp(sr.high, pres.high, lambda, 1.0)
}

/// `dZ/dlambda` for [`sideband_norm`].
fn sideband_norm_grad(lambda: f64, pres: &Window, sr: &Window) -> f64 {
    let (a, b, c, d) = (pres.low, sr.low, sr.high, pres.high);
    if lambda.abs() < 1e-12 {
        // dZ/dλ = -∫ m dm over the sidebands in the uniform limit.
        return -0.5 * (b * b - a * a + d * d - c * c);
    }
    let z = sideband_norm(lambda, pres, sr);
    (-z + b * (-lambda * b).exp() - a * (-lambda * a).exp()
        + d * (-lambda * d).exp()
        - c * (-lambda * c).exp())
        / lambda
}

/// Mean negative log-likelihood of the sideband masses under the bounded
/// exponential density `p(m; λ) = exp(-λ m) / Z(λ)`.
///
/// The NLL is the unweighted mean over sideband events; event weights enter
/// the model only through the sideband weight sum `N`.
struct BackgroundNll<'a> {
    mass: &'a [f64],
    preselection: Window,
    signal_region: Window,
}

impl<'a> BackgroundNll<'a> {
    fn mean_mass(&self) -> f64 {
        self.mass.iter().sum::<f64>() / self.mass.len() as f64
    }
}

impl<'a> ScalarObjective for BackgroundNll<'a> {
    fn eval(&self, lambda: f64) -> Result<f64> {
        let z = sideband_norm(lambda, &self.preselection, &self.signal_region);
        if !(z.is_finite() && z > 0.0) {
            return Err(Error::Computation(format!(
                "sideband normalization is not positive at lambda={lambda}: Z={z}"
            )));
        }
        Ok(lambda * self.mean_mass() + z.ln())
    }

    fn gradient(&self, lambda: f64) -> Result<f64> {
        let z = sideband_norm(lambda, &self.preselection, &self.signal_region);
        if !(z.is_finite() && z > 0.0) {
            return Err(Error::Computation(format!(
                "sideband normalization is not positive at lambda={lambda}: Z={z}"
            )));
        }
        let dz = sideband_norm_grad(lambda, &self.preselection, &self.signal_region);
        Ok(self.mean_mass() + dz / z)
    }
}

/// Fit the exponential background model to the sidebands of `background`.
///
/// Restricts the sample to the sidebands, minimizes the mean NLL over the
/// decay rate with the analytic gradient, and derives the ±1σ rate variants
/// from the inverse curvature of the mean NLL scaled by
/// `1/sqrt(n_sideband)`. Non-convergence is fatal
/// ([`Error::FitDivergence`]).
pub fn fit_background(background: &EventTable, config: &FitConfig) -> Result<ExponentialModel> {
    validate_nesting(&config.preselection, &config.signal_region)?;

    let sideband = background.in_sidebands(&config.preselection, &config.signal_region);
    let n_sideband = sideband.len();
    if n_sideband == 0 {
        return Err(Error::Validation("background sample has no sideband events".into()));
    }

    let nll = BackgroundNll {
        mass: sideband.mass(),
        preselection: config.preselection,
        signal_region: config.signal_region,
    };

    let minimum = ScalarMinimizer::new(config.optimizer).minimize(
        &nll,
        config.lambda_guess,
        config.lambda_bounds,
    )?;
    if !minimum.converged {
        return Err(Error::FitDivergence { n_sideband, message: minimum.to_string() });
    }
    let lambda = minimum.x;
    log::debug!("background fit: lambda={lambda:.6} over {n_sideband} sideband events ({minimum})");

    // Curvature of the mean NLL at the minimum, from a central difference of
    // the analytic gradient; 1σ on λ is sqrt(H⁻¹ / n_sideband).
    let eps = 1e-5 * lambda.abs().max(1.0);
    let curvature = (nll.gradient(lambda + eps)? - nll.gradient(lambda - eps)?) / (2.0 * eps);
    let sigma = if curvature > 0.0 {
        (1.0 / (curvature * n_sideband as f64)).sqrt()
    } else {
        log::warn!(
            "background fit: non-positive NLL curvature ({curvature:.3e}) at lambda={lambda:.6}; \
             rate uncertainty set to zero"
        );
        0.0
    };

    Ok(ExponentialModel::new(
        lambda,
        lambda + sigma,
        lambda - sigma,
        sideband.weight_sum(),
        config.preselection,
        config.signal_region,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::prelude::*;
    use rand_distr::Exp;

    fn toy_background(n: usize, lambda: f64, pres: Window, seed: u64) -> EventTable {
        let mut rng = StdRng::seed_from_u64(seed);
        let dist = Exp::new(lambda).unwrap();
        let mut mass = Vec::with_capacity(n);
        while mass.len() < n {
            let m: f64 = rng.sample(dist);
            if pres.contains(m) {
                mass.push(m);
            }
        }
        EventTable::new(mass, vec![1.0; n]).unwrap()
    }

    #[test]
    fn test_nll_gradient_matches_finite_difference() {
        let pres = Window { low: 100.0, high: 180.0 };
        let sr = Window { low: 120.0, high: 130.0 };
        let bkg = toy_background(500, 0.05, pres, 11).in_sidebands(&pres, &sr);
        let nll = BackgroundNll { mass: bkg.mass(), preselection: pres, signal_region: sr };

        for &l in &[-0.2, 0.01, 0.05, 0.3] {
            let eps = 1e-6;
            let fd = (nll.eval(l + eps).unwrap() - nll.eval(l - eps).unwrap()) / (2.0 * eps);
            assert_relative_eq!(nll.gradient(l).unwrap(), fd, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_fit_recovers_generated_rate() {
        let pres = Window { low: 100.0, high: 180.0 };
        let truth = 0.05;
        let bkg = toy_background(10_000, truth, pres, 5);
        let model = fit_background(&bkg, &FitConfig::default()).unwrap();
        // 10k events pin the rate well inside 10%.
        assert!(
            (model.lambda() - truth).abs() < 0.1 * truth,
            "fitted lambda {} too far from {}",
            model.lambda(),
            truth
        );
        assert!(model.lambda_up() > model.lambda());
        assert!(model.lambda_down() < model.lambda());
    }

    #[test]
    fn test_fit_model_recovers_sideband_weight_sum() {
        let pres = Window { low: 100.0, high: 180.0 };
        let sr = Window { low: 120.0, high: 130.0 };
        let bkg = toy_background(2_000, 0.03, pres, 9);
        let model = fit_background(&bkg, &FitConfig::default()).unwrap();

        let low_side = Window { low: pres.low, high: sr.low };
        let high_side = Window { low: sr.high, high: pres.high };
        let integral = model.expected_count(&low_side) + model.expected_count(&high_side);
        let n_sideband = bkg.in_sidebands(&pres, &sr).weight_sum();
        assert_relative_eq!(integral, n_sideband, max_relative = 1e-9);
    }

    #[test]
    fn test_fit_rejects_empty_sidebands() {
        let bkg = EventTable::new(vec![125.0, 126.0], vec![1.0, 1.0]).unwrap();
        let err = fit_background(&bkg, &FitConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
