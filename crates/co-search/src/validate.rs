//! Boundary-set validation with memoized per-pair verdicts.
//!
//! A boundary set is valid iff every adjacent boundary pair selects at least
//! `threshold` background events in the sidebands. Pairs recur across many
//! candidate sets sharing sub-boundaries, so verdicts are cached per pair;
//! that cache is the dominant performance lever of the whole grid search.

use crate::grid::BoundarySet;
use co_core::{Result, Window};
use co_events::EventTable;
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Bit-exact hash key for a `(lo, hi]` boundary pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PairKey(u64, u64);

impl PairKey {
    fn new(lo: f64, hi: f64) -> Self {
        Self(lo.to_bits(), hi.to_bits())
    }
}

/// Shared memoization of per-pair validity verdicts.
///
/// Keyed on the literal `(lo, hi)` boundary pair, not the category index.
/// Grows monotonically over one optimisation run and is never evicted (the
/// domain is bounded by the grid). Safe to share across rayon workers: the
/// verdict is a deterministic function of the input tables, so a racing
/// duplicate evaluation costs redundant counting, never correctness.
#[derive(Debug, Default)]
pub struct ValidationCache {
    verdicts: RwLock<HashMap<PairKey, bool>>,
    n_evaluated: AtomicUsize,
}

impl ValidationCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached verdict for a pair, if any.
    fn verdict(&self, lo: f64, hi: f64) -> Option<bool> {
        self.verdicts
            .read()
            .ok()
            .and_then(|map| map.get(&PairKey::new(lo, hi)).copied())
    }

    fn record(&self, lo: f64, hi: f64, valid: bool) {
        self.n_evaluated.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut map) = self.verdicts.write() {
            map.insert(PairKey::new(lo, hi), valid);
        }
    }

    /// Number of pair evaluations that actually counted events (cache
    /// misses).
    pub fn n_evaluated(&self) -> usize {
        self.n_evaluated.load(Ordering::Relaxed)
    }

    /// Number of distinct pairs with a cached verdict.
    pub fn len(&self) -> usize {
        self.verdicts.read().map(|map| map.len()).unwrap_or(0)
    }

    /// Whether the cache holds no verdicts.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Check whether every category of `boundaries` holds at least `threshold`
/// background sideband events.
///
/// Any cached-invalid pair fails the whole set before any counting; pairs
/// without a cached verdict are counted once and recorded.
pub fn is_valid_boundaries(
    background: &EventTable,
    preselection: &Window,
    signal_region: &Window,
    boundaries: &BoundarySet,
    threshold: usize,
    cache: &ValidationCache,
) -> Result<bool> {
    for (lo, hi) in boundaries.pairs() {
        if cache.verdict(lo, hi) == Some(false) {
            return Ok(false);
        }
    }

    for (lo, hi) in boundaries.pairs() {
        if cache.verdict(lo, hi) == Some(true) {
            continue;
        }
        let n =
            background.count_sideband_in_score_interval(preselection, signal_region, lo, hi)?;
        let valid = n >= threshold;
        cache.record(lo, hi, valid);
        if !valid {
            return Ok(false);
        }
    }

    Ok(true)
}
