//! Columnar event storage.

use co_core::{Error, Result, Window};

/// Columnar event table (Structure-of-Arrays / SoA).
///
/// One row per event: `mass`, `weight` and an optional classifier `score`.
/// Negative weights are accepted (interference samples). Tables are
/// immutable once constructed; every slicing operation returns a new owned
/// table and leaves the source untouched.
#[derive(Debug, Clone, Default)]
pub struct EventTable {
    mass: Vec<f64>,
    weight: Vec<f64>,
    score: Option<Vec<f64>>,
}

impl EventTable {
    /// Create a table from mass and weight columns (no scores).
    pub fn new(mass: Vec<f64>, weight: Vec<f64>) -> Result<Self> {
        Self::build(mass, weight, None)
    }

    /// Create a table carrying a classifier score per event.
    pub fn with_scores(mass: Vec<f64>, weight: Vec<f64>, score: Vec<f64>) -> Result<Self> {
        Self::build(mass, weight, Some(score))
    }

    fn build(mass: Vec<f64>, weight: Vec<f64>, score: Option<Vec<f64>>) -> Result<Self> {
        let n = mass.len();
        if weight.len() != n {
            return Err(Error::Validation(format!(
                "weight column length mismatch: expected {n}, got {}",
                weight.len()
            )));
        }
        if let Some(s) = &score
            && s.len() != n
        {
            return Err(Error::Validation(format!(
                "score column length mismatch: expected {n}, got {}",
                s.len()
            )));
        }
        if mass.iter().any(|x| !x.is_finite()) {
            return Err(Error::Validation("mass column contains non-finite values".into()));
        }
        if weight.iter().any(|x| !x.is_finite()) {
            return Err(Error::Validation("weight column contains non-finite values".into()));
        }
        if let Some(s) = &score
            && s.iter().any(|x| !x.is_finite())
        {
            return Err(Error::Validation("score column contains non-finite values".into()));
        }
        Ok(Self { mass, weight, score })
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.mass.len()
    }

    /// Whether the table holds no events.
    pub fn is_empty(&self) -> bool {
        self.mass.is_empty()
    }

    /// Mass column.
    pub fn mass(&self) -> &[f64] {
        &self.mass
    }

    /// Weight column.
    pub fn weight(&self) -> &[f64] {
        &self.weight
    }

    /// Score column; an error if the table was built without scores.
    pub fn score(&self) -> Result<&[f64]> {
        self.score
            .as_deref()
            .ok_or_else(|| Error::Validation("event table has no score column".into()))
    }

    /// Whether a score column is present.
    pub fn has_scores(&self) -> bool {
        self.score.is_some()
    }

    /// Sum of event weights.
    pub fn weight_sum(&self) -> f64 {
        self.weight.iter().sum()
    }

    fn filter_rows(&self, keep: impl Fn(usize) -> bool) -> Self {
        let idx: Vec<usize> = (0..self.len()).filter(|&i| keep(i)).collect();
        Self {
            mass: idx.iter().map(|&i| self.mass[i]).collect(),
            weight: idx.iter().map(|&i| self.weight[i]).collect(),
            score: self.score.as_ref().map(|s| idx.iter().map(|&i| s[i]).collect()),
        }
    }

    /// Events with mass strictly inside `window`.
    pub fn in_mass_window(&self, window: &Window) -> Self {
        self.filter_rows(|i| window.contains(self.mass[i]))
    }

    /// Events in the sidebands: inside `preselection` but outside
    /// `signal_region` (both cuts strict).
    pub fn in_sidebands(&self, preselection: &Window, signal_region: &Window) -> Self {
        self.filter_rows(|i| in_sidebands(self.mass[i], preselection, signal_region))
    }

    /// Events with score in the category interval `(lo, hi]`.
    pub fn in_score_interval(&self, lo: f64, hi: f64) -> Result<Self> {
        let score = self.score()?;
        Ok(self.filter_rows(|i| score[i] > lo && score[i] <= hi))
    }

    /// Count events with score in `(lo, hi]` and mass in the sidebands.
    ///
    /// Raw event count, not a weight sum; used by the category-population
    /// validity check.
    pub fn count_sideband_in_score_interval(
        &self,
        preselection: &Window,
        signal_region: &Window,
        lo: f64,
        hi: f64,
    ) -> Result<usize> {
        let score = self.score()?;
        Ok((0..self.len())
            .filter(|&i| {
                score[i] > lo && score[i] <= hi && in_sidebands(self.mass[i], preselection, signal_region)
            })
            .count())
    }

    /// Sum of weights for events with mass strictly inside `window`.
    pub fn weight_sum_in_window(&self, window: &Window) -> f64 {
        (0..self.len())
            .filter(|&i| window.contains(self.mass[i]))
            .map(|i| self.weight[i])
            .sum()
    }
}

fn in_sidebands(m: f64, preselection: &Window, signal_region: &Window) -> bool {
    (m > preselection.low && m < signal_region.low)
        || (m > signal_region.high && m < preselection.high)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn table() -> EventTable {
        EventTable::with_scores(
            vec![105.0, 125.0, 150.0, 175.0],
            vec![1.0, 2.0, -0.5, 1.0],
            vec![0.1, 0.6, 0.6, 0.9],
        )
        .unwrap()
    }

    #[test]
    fn test_build_rejects_mismatched_columns() {
        assert!(EventTable::new(vec![1.0], vec![1.0, 2.0]).is_err());
        assert!(EventTable::with_scores(vec![1.0], vec![1.0], vec![]).is_err());
        assert!(EventTable::new(vec![f64::NAN], vec![1.0]).is_err());
    }

    #[test]
    fn test_negative_weights_are_accepted() {
        let t = table();
        assert_relative_eq!(t.weight_sum(), 3.5);
    }

    #[test]
    fn test_mass_window_slice() {
        let sr = Window::new(120.0, 130.0).unwrap();
        let sliced = table().in_mass_window(&sr);
        assert_eq!(sliced.mass(), &[125.0]);
        assert_eq!(sliced.score().unwrap(), &[0.6]);
    }

    #[test]
    fn test_sideband_slice_excludes_signal_region() {
        let pres = Window::new(100.0, 180.0).unwrap();
        let sr = Window::new(120.0, 130.0).unwrap();
        let sliced = table().in_sidebands(&pres, &sr);
        assert_eq!(sliced.len(), 3);
        assert!(sliced.mass().iter().all(|&m| !sr.contains(m)));
    }

    #[test]
    fn test_score_interval_is_half_open() {
        let t = table();
        let cat = t.in_score_interval(0.1, 0.6).unwrap();
        // 0.1 excluded (lower bound is exclusive), 0.6 included.
        assert_eq!(cat.len(), 2);
    }

    #[test]
    fn test_slicing_does_not_mutate_source() {
        let t = table();
        let _ = t.in_score_interval(0.0, 0.5).unwrap();
        assert_eq!(t.len(), 4);
    }

    #[test]
    fn test_sideband_score_count() {
        let pres = Window::new(100.0, 180.0).unwrap();
        let sr = Window::new(120.0, 130.0).unwrap();
        let n = table().count_sideband_in_score_interval(&pres, &sr, 0.5, 1.0).unwrap();
        // scores 0.6, 0.6, 0.9 pass the score cut; mass 125 is in the signal region.
        assert_eq!(n, 2);
    }
}
