//! Approximate median significance.

use co_core::{Error, Result};

/// AMS for per-category expected yields, combined in quadrature:
/// `AMS² = Σ 2 [ (sᵢ + bᵢ) ln(1 + sᵢ/bᵢ) − sᵢ ]`.
///
/// Background yields must be strictly positive (callers apply the
/// zero-yield floor before combining).
pub fn ams(s: &[f64], b: &[f64]) -> Result<f64> {
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

    let total: f64 = s
        .iter()
        .zip(b.iter())
        .map(|(&si, &bi)| 2.0 * ((si + bi) * (1.0 + si / bi).ln() - si))
        .sum();
    if !total.is_finite() || total < 0.0 {
        return Err(Error::Computation(format!("AMS² is not a finite non-negative value: {total}")));
    }
    Ok(total.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_single_category_closed_form() {
        let (s, b): (f64, f64) = (10.0, 100.0);
        let expected = (2.0 * ((s + b) * (1.0 + s / b).ln() - s)).sqrt();
        assert_relative_eq!(ams(&[s], &[b]).unwrap(), expected, max_relative = 1e-12);
    }

    #[test]
    fn test_categories_combine_in_quadrature() {
        let combined = ams(&[4.0, 7.0], &[40.0, 9.0]).unwrap();
        let a1 = ams(&[4.0], &[40.0]).unwrap();
        let a2 = ams(&[7.0], &[9.0]).unwrap();
        assert_relative_eq!(combined * combined, a1 * a1 + a2 * a2, max_relative = 1e-12);
    }

    #[test]
    fn test_zero_signal_gives_zero_significance() {
        assert_relative_eq!(ams(&[0.0], &[25.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_rejects_non_positive_background() {
        assert!(ams(&[1.0], &[0.0]).is_err());
    }
}
