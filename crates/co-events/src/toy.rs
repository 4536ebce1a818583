//! Seeded toy-experiment generation.
//!
//! Produces a background sample with an exponentially falling mass spectrum
//! and a signal sample with a Gaussian mass peak, plus classifier scores in
//! `(0, 1)` concentrated at low score for background and high score for
//! signal. Randomness is deterministic via the caller-supplied seed,
//! independent of threading.

use crate::EventTable;
use co_core::{Error, Result, Window};
use rand::prelude::*;
use rand_distr::{Exp, Normal};

/// Shape of the generated toy dataset.
#[derive(Debug, Clone)]
pub struct ToyConfig {
    /// Number of background events (after the preselection cut).
    pub n_bkg: usize,
    /// Number of signal events (after the preselection cut).
    pub n_sig: usize,
    /// Background mass decay rate.
    pub lambda: f64,
    /// Signal peak position.
    pub peak_mass: f64,
    /// Signal peak width.
    pub peak_width: f64,
    /// Preselection mass window applied to both samples.
    pub preselection: Window,
    /// Score decay rate for background (`score ~ Exp(rate)` truncated to `(0,1)`).
    pub bkg_score_rate: f64,
    /// Score decay rate for signal (`score ~ 1 - Exp(rate)` truncated to `(0,1)`).
    pub sig_score_rate: f64,
}

impl Default for ToyConfig {
    fn default() -> Self {
        Self {
            n_bkg: 100,
            n_sig: 100,
            lambda: 0.05,
            peak_mass: 125.0,
            peak_width: 1.0,
            preselection: Window { low: 100.0, high: 180.0 },
            bkg_score_rate: 1.0,
            sig_score_rate: 10.0,
        }
    }
}

/// Generate `(background, signal)` toy tables with unit weights.
pub fn generate_toy_data(config: &ToyConfig, seed: u64) -> Result<(EventTable, EventTable)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let pres = config.preselection;

    let bkg_mass_dist = Exp::new(config.lambda)
        .map_err(|e| Error::Validation(format!("invalid background mass rate: {e}")))?;
    let sig_mass_dist = Normal::new(config.peak_mass, config.peak_width)
        .map_err(|e| Error::Validation(format!("invalid signal peak parameters: {e}")))?;
    let bkg_score_dist = Exp::new(config.bkg_score_rate)
        .map_err(|e| Error::Validation(format!("invalid background score rate: {e}")))?;
    let sig_score_dist = Exp::new(config.sig_score_rate)
        .map_err(|e| Error::Validation(format!("invalid signal score rate: {e}")))?;

    let bkg_mass = sample_until(&mut rng, config.n_bkg, |r| r.sample(bkg_mass_dist), |m| {
        pres.contains(m)
    })?;
    let sig_mass = sample_until(&mut rng, config.n_sig, |r| r.sample(sig_mass_dist), |m| {
        pres.contains(m)
    })?;

    let unit = |x: f64| x > 0.0 && x < 1.0;
    let bkg_score = sample_until(&mut rng, config.n_bkg, |r| r.sample(bkg_score_dist), unit)?;
    let sig_score =
        sample_until(&mut rng, config.n_sig, |r| 1.0 - r.sample(sig_score_dist), unit)?;

    let bkg = EventTable::with_scores(bkg_mass, vec![1.0; config.n_bkg], bkg_score)?;
    let sig = EventTable::with_scores(sig_mass, vec![1.0; config.n_sig], sig_score)?;
    Ok((bkg, sig))
}

/// Rejection-sample `n` values passing `accept`, bounding the total draws so
/// a cut with negligible acceptance fails instead of spinning forever.
fn sample_until(
    rng: &mut StdRng,
    n: usize,
    mut draw: impl FnMut(&mut StdRng) -> f64,
    accept: impl Fn(f64) -> bool,
) -> Result<Vec<f64>> {
    let mut out = Vec::with_capacity(n);
    let max_draws = 1000 * n.max(1000);
    for _ in 0..max_draws {
        if out.len() == n {
            return Ok(out);
        }
        let x = draw(rng);
        if accept(x) {
            out.push(x);
        }
    }
    Err(Error::Computation(format!(
        "toy sampling accepted only {} of {} requested events after {} draws",
        out.len(),
        n,
        max_draws
    )))
}
