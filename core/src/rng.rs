//! Deterministic random number generation for the synthetic data source.
//!
//! RULE: The synthetic generators never call a platform RNG.
//! Each (metric, query key) pair gets its own stream derived from the
//! configured seed, so:
//!   - Re-fetching the same key yields identical data.
//!   - Adding a metric never changes existing metrics' streams.

use crate::{metric::MetricName, query_key::QueryKey};
use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// A named, deterministic RNG for one metric dataset.
pub struct SeriesRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl SeriesRng {
    /// The slot index must never change once assigned.
    pub fn new(master_seed: u64, slot: u64, key_fingerprint: u64) -> Self {
        let derived_seed = master_seed
            ^ slot.wrapping_mul(0x9e37_79b9_7f4a_7c15)
            ^ key_fingerprint.rotate_left(17);
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a float in [lo, hi).
    pub fn range_f64(&mut self, lo: f64, hi: f64) -> f64 {
        lo + self.next_f64() * (hi - lo)
    }

    /// Roll a u64 in [lo, lo + span).
    pub fn range_u64(&mut self, lo: u64, span: u64) -> u64 {
        assert!(span > 0, "span must be > 0");
        lo + self.inner.next_u64() % span
    }

    /// Multiply `base` by a factor in [1 - spread, 1 + spread).
    pub fn jitter(&mut self, base: f64, spread: f64) -> f64 {
        base * self.range_f64(1.0 - spread, 1.0 + spread)
    }
}

/// Hands out per-metric streams for a single configured seed.
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn for_metric(&self, metric: MetricName, key: &QueryKey) -> SeriesRng {
        SeriesRng::new(self.master_seed, metric.slot(), key.fingerprint()).with_name(metric.as_str())
    }
}
