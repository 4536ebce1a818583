//! Candidate boundary-set generation over rank-ordered sideband scores.
//!
//! Candidate cut positions are ranks into the background sideband sample
//! sorted by descending score, not raw score values. The rank-gap
//! constraint is a coarse population pre-filter: it guarantees a minimum
//! number of *sideband-sample ranks* between adjacent cuts, while the
//! validator counts *sideband events* per category. For non-uniform score
//! distributions the two are not equivalent, so both filters are applied.

use co_core::{Error, Result};
use co_events::EventTable;
use serde::{Deserialize, Serialize};

/// Offset subtracted from a ranked score when it becomes a boundary, so the
/// event at that rank falls strictly above the cut under the category
/// selection `score > lo && score <= hi`.
pub const BOUNDARY_EPSILON: f64 = 1e-8;

/// An ordered set of classifier-score cuts.
///
/// Strictly increasing; the final cut is the terminal boundary (1.0 for
/// generated grids). `len - 1` adjacent pairs define the category intervals
/// `(lo, hi]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundarySet(Vec<f64>);

impl BoundarySet {
    /// Create a boundary set, validating strict monotonicity.
    pub fn new(cuts: Vec<f64>) -> Result<Self> {
        if cuts.len() < 2 {
            return Err(Error::Validation(format!(
                "a boundary set needs at least 2 cuts, got {}",
                cuts.len()
            )));
        }
        if cuts.windows(2).any(|w| !(w[0] < w[1])) {
            return Err(Error::Validation(format!(
                "boundary cuts must be strictly increasing: {cuts:?}"
            )));
        }
        Ok(Self(cuts))
    }

    /// The cut positions.
    pub fn cuts(&self) -> &[f64] {
        &self.0
    }

    /// Number of category intervals (`len - 1`).
    pub fn n_categories(&self) -> usize {
        self.0.len() - 1
    }

    /// Adjacent `(lo, hi]` category boundary pairs.
    pub fn pairs(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.0.windows(2).map(|w| (w[0], w[1]))
    }
}

/// Configuration of the candidate grid.
#[derive(Debug, Clone, Copy)]
pub struct GridConfig {
    /// Lowest score considered as a cut position.
    pub low: f64,
    /// Highest score considered as a cut position.
    pub high: f64,
    /// Number of free cut positions per candidate (excluding the terminal
    /// 1.0 and the optional leading 0.0).
    pub n_bounds: usize,
    /// Prepend a leading 0.0 boundary, adding a catch-all category below the
    /// lowest real cut.
    pub include_lower: bool,
    /// Lowest admissible rank for the first (highest-score) cut; skipping
    /// the top ranks guarantees a minimum population above the highest cut.
    pub min_first_rank: usize,
    /// Minimum rank distance between consecutive cuts.
    pub min_rank_gap: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            low: 0.05,
            high: 1.0,
            n_bounds: 1,
            include_lower: false,
            min_first_rank: 9,
            min_rank_gap: 10,
        }
    }
}

/// Enumerate candidate boundary sets from the background sideband sample.
///
/// Ranks index the sideband scores sorted descending after the
/// `[low, high]` score cut. Rank sequences grow incrementally: every
/// admissible single rank seeds a sequence, and each partial sequence is
/// extended by every rank at distance ≥ `min_rank_gap`, until `n_bounds`
/// cuts are reached. A constrained combinatorial walk, not a full
/// cross-product. Each rank sequence maps back to score values (minus
/// [`BOUNDARY_EPSILON`]) in ascending order, suffixed with the terminal 1.0
/// and optionally prefixed with 0.0.
pub fn form_boundaries_grid(sideband: &EventTable, config: &GridConfig) -> Result<Vec<BoundarySet>> {
    if config.n_bounds == 0 {
        return Err(Error::Validation("n_bounds must be at least 1".into()));
    }
    let scores = sideband.score()?;
    let mut pool: Vec<f64> =
        scores.iter().copied().filter(|s| *s >= config.low && *s <= config.high).collect();
    pool.sort_unstable_by(|a, b| b.total_cmp(a));

    if pool.len() < 2 {
        return Ok(Vec::new());
    }

    // Seed with every admissible single-cut rank.
    let mut sequences: Vec<Vec<usize>> = (1..pool.len())
        .filter(|&r| r >= config.min_first_rank)
        .map(|r| vec![r])
        .collect();

    for _ in 1..config.n_bounds {
        let mut extended = Vec::new();
        for seq in &sequences {
            let Some(&last) = seq.last() else { continue };
            for r in (last + config.min_rank_gap)..pool.len() {
                let mut next = seq.clone();
                next.push(r);
                extended.push(next);
            }
        }
        sequences = extended;
    }

    let mut n_degenerate = 0usize;
    let grid: Vec<BoundarySet> = sequences
        .into_iter()
        .filter_map(|seq| {
            // Ranks ascend in descending-score space; reverse into
            // ascending-score boundary order.
            let mut cuts: Vec<f64> =
                seq.iter().rev().map(|&r| pool[r] - BOUNDARY_EPSILON).collect();
            cuts.push(1.0);
            if config.include_lower {
                cuts.insert(0, 0.0);
            }
            // Tied scores can collapse adjacent cuts; such candidates define
            // an empty category and are dropped here.
            match BoundarySet::new(cuts) {
                Ok(set) => Some(set),
                Err(_) => {
                    n_degenerate += 1;
                    None
                }
            }
        })
        .collect();
    if n_degenerate > 0 {
        log::debug!("dropped {n_degenerate} degenerate candidates from tied scores");
    }
    Ok(grid)
}
