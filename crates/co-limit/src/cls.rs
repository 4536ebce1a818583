//! Asymptotic CLs and the 95%-CL upper limit.

use co_core::{Error, Result};
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Configuration for the upper-limit search.
#[derive(Debug, Clone, Copy)]
pub struct LimitConfig {
    /// Signal-strength bracket searched for the limit.
    pub bracket: (f64, f64),
    /// Target CLs level.
    pub alpha: f64,
    /// Relative tolerance of the bisection.
    pub rtol: f64,
    /// Maximum bisection iterations.
    pub max_iter: usize,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self { bracket: (0.0, 100.0), alpha: 0.05, rtol: 1e-3, max_iter: 100 }
    }
}

fn check_yields(s: &[f64], b: &[f64]) -> Result<()> {
    if s.is_empty() || s.len() != b.len() {
        return Err(Error::Validation(format!(
            "per-category yields must be non-empty and aligned, got {} signal / {} background",
            s.len(),
            b.len()
        )));
    }
    if b.iter().any(|&bi| bi <= 0.0) {
        return Err(Error::Validation(
            "background yields must be strictly positive (apply the zero-yield floor)".into(),
        ));
    }
    Ok(())
}

/// Expected CLs for signal strength `mu` and per-category expected yields.
///
/// Uses the Asimov asymptotic test statistic
/// `q = -2 Σ [ bᵢ (ln(μ sᵢ + bᵢ) − ln bᵢ) − μ sᵢ ]`
/// referred to a one-degree-of-freedom χ² distribution. Pass slices of
/// length 1 for a single category.
pub fn expected_cls(mu: f64, s: &[f64], b: &[f64]) -> Result<f64> {
    check_yields(s, b)?;

    let q = -2.0
        * s.iter()
            .zip(b.iter())
            .map(|(&si, &bi)| bi * ((mu * si + bi).ln() - bi.ln()) - mu * si)
            .sum::<f64>();
    if !q.is_finite() {
        return Err(Error::Computation(format!(
            "test statistic is not finite at mu={mu} (q={q})"
        )));
    }

    let chi2 = ChiSquared::new(1.0)
        .map_err(|e| Error::Computation(format!("chi-squared distribution: {e}")))?;
    // cdf(q) = 0 for q <= 0, so mu = 0 gives CLs = 1 exactly.
    Ok(1.0 - chi2.cdf(q))
}

/// 95%-CL (by default) upper limit on the signal strength.
///
/// Bisects `expected_cls(mu) = alpha` over the configured bracket. When even
/// the bracket's upper end is not excluded, the true limit lies above the
/// bracket: a warning is logged and the upper end is returned as a
/// saturating estimate.
pub fn expected_limit(s: &[f64], b: &[f64], config: &LimitConfig) -> Result<f64> {
    let (mut lo, mut hi) = config.bracket;
    if !(0.0 < config.alpha && config.alpha < 1.0) {
        return Err(Error::Validation(format!("alpha must be in (0,1), got {}", config.alpha)));
    }
    if lo < 0.0 {
        lo = 0.0;
    }
    if hi <= lo {
        return Err(Error::Validation(format!("invalid bracket: lo={lo} hi={hi}")));
    }

    if expected_cls(hi, s, b)? >= config.alpha {
        log::warn!(
            "expected limit lies above the bracket upper bound mu={hi}; returning it as a \
             saturating estimate"
        );
        return Ok(hi);
    }

    for _ in 0..config.max_iter {
        let mid = 0.5 * (lo + hi);
        let cls_mid = expected_cls(mid, s, b)?;
        if cls_mid > config.alpha {
            lo = mid;
        } else {
            hi = mid;
        }

        let denom = hi.abs().max(1.0);
        if ((hi - lo).abs() / denom) < config.rtol {
            break;
        }
    }

    Ok(0.5 * (lo + hi))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cls_at_zero_mu_is_one() {
        for &(s, b) in &[(1.0, 1.0), (10.0, 3.0), (0.5, 100.0)] {
            assert_relative_eq!(expected_cls(0.0, &[s], &[b]).unwrap(), 1.0);
        }
    }

    #[test]
    fn test_cls_is_monotone_non_increasing_in_mu() {
        let (s, b) = ([5.0], [50.0]);
        let mut last = f64::INFINITY;
        for i in 0..50 {
            let mu = 0.2 * i as f64;
            let cls = expected_cls(mu, &s, &b).unwrap();
            assert!(cls <= last + 1e-12, "CLs rose at mu={mu}: {cls} > {last}");
            last = cls;
        }
    }

    #[test]
    fn test_limit_satisfies_target_cls() {
        let (s, b) = ([5.0], [50.0]);
        let config = LimitConfig::default();
        let limit = expected_limit(&s, &b, &config).unwrap();
        assert!(limit > config.bracket.0 && limit < config.bracket.1);
        let cls = expected_cls(limit, &s, &b).unwrap();
        assert!((cls - config.alpha).abs() < 1e-3, "CLs at limit = {cls}");
    }

    #[test]
    fn test_limit_saturates_above_bracket() {
        // Vanishing signal: nothing is excludable inside the bracket.
        let limit = expected_limit(&[1e-9], &[100.0], &LimitConfig::default()).unwrap();
        assert_relative_eq!(limit, 100.0);
    }

    #[test]
    fn test_multi_category_combination_tightens_the_limit() {
        let combined = expected_limit(&[3.0, 3.0], &[30.0, 30.0], &LimitConfig::default()).unwrap();
        let single = expected_limit(&[3.0], &[30.0], &LimitConfig::default()).unwrap();
        assert!(combined < single, "combined {combined} vs single {single}");
    }

    #[test]
    fn test_rejects_non_positive_background() {
        assert!(expected_cls(1.0, &[1.0], &[0.0]).is_err());
        assert!(expected_cls(1.0, &[1.0, 1.0], &[1.0]).is_err());
    }
}
