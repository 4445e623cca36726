//! Two-phase aggregation for sparse per-frame values.
//!
//! Observation accumulates running sums and counts and skips absent or
//! non-finite values. Finalization turns each accumulator into `(mean, std)`
//! and substitutes a default for anything never observed.

use std::collections::BTreeMap;

/// Running sum, sum of squares and count for one quantity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningStats {
    count: usize,
    sum: f64,
    sum_sq: f64,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observation. Non-finite values are ignored.
    pub fn push(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        self.count += 1;
        self.sum += value;
        self.sum_sq += value * value;
    }

    /// Record an optional observation.
    pub fn push_opt(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.push(v);
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Mean, or `None` with no observations.
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    /// Population standard deviation, or `None` with no observations.
    pub fn std(&self) -> Option<f64> {
        self.mean().map(|mean| {
            let variance = self.sum_sq / self.count as f64 - mean * mean;
            variance.max(0.0).sqrt()
        })
    }

    /// Final `(mean, std)`, using `default` for both when unobserved.
    pub fn finish_or(&self, default: f64) -> (f64, f64) {
        match (self.mean(), self.std()) {
            (Some(mean), Some(std)) if mean.is_finite() && std.is_finite() => (mean, std),
            _ => (default, default),
        }
    }
}

impl Extend<f64> for RunningStats {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        for v in iter {
            self.push(v);
        }
    }
}

impl FromIterator<f64> for RunningStats {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut stats = Self::new();
        stats.extend(iter);
        stats
    }
}

/// Per-key running statistics over a fixed, ordered key set.
#[derive(Debug, Clone)]
pub struct KeyedStats<K: Ord + Copy> {
    entries: BTreeMap<K, RunningStats>,
}

impl<K: Ord + Copy> KeyedStats<K> {
    /// Accumulator that will report every key in `keys`, observed or not.
    pub fn with_keys(keys: impl IntoIterator<Item = K>) -> Self {
        Self {
            entries: keys.into_iter().map(|k| (k, RunningStats::new())).collect(),
        }
    }

    /// Record one observation for `key`; unknown keys are added.
    pub fn push(&mut self, key: K, value: f64) {
        self.entries.entry(key).or_default().push(value);
    }

    pub fn get(&self, key: K) -> Option<&RunningStats> {
        self.entries.get(&key)
    }

    /// Finalized `(key, mean, std)` in key order.
    pub fn finish_or(&self, default: f64) -> Vec<(K, f64, f64)> {
        self.entries
            .iter()
            .map(|(k, stats)| {
                let (mean, std) = stats.finish_or(default);
                (*k, mean, std)
            })
            .collect()
    }
}
