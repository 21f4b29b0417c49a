//! # Metric Module
//!
//! The metric-space capability the index is generic over: any value type
//! with a distance function satisfying non-negativity, symmetry, and the
//! triangle inequality can be indexed by a vantage-point tree.

use crate::core::fingerprint::Fingerprint;

/// A point in a metric space.
///
/// Implementations must satisfy the metric axioms:
/// - `a.distance(&a) == 0`
/// - `a.distance(&b) == b.distance(&a)`
/// - `a.distance(&c) <= a.distance(&b) + b.distance(&c)`
///
/// Index pruning relies on the triangle inequality; an implementation that
/// violates it will silently drop results.
pub trait MetricPoint {
    /// Distance to another point. Total and infallible.
    fn distance(&self, other: &Self) -> u64;

    /// Whether `other` lies within `radius` of `self` (inclusive).
    fn within(&self, other: &Self, radius: u64) -> bool {
        self.distance(other) <= radius
    }
}

/// Hamming distance over the packed words.
///
/// A tree indexes one fingerprint population (same algorithm and length by
/// construction), where this coincides with [`Fingerprint::distance`]. For
/// mixed-length pairs the shorter word array is padded with zeros, which
/// keeps the metric total so the index never needs a fallible distance.
impl MetricPoint for Fingerprint {
    fn distance(&self, other: &Self) -> u64 {
        let (short, long) = if self.words().len() <= other.words().len() {
            (self.words(), other.words())
        } else {
            (other.words(), self.words())
        };
        let shared: u64 = short
            .iter()
            .zip(long.iter())
            .map(|(a, b)| u64::from((a ^ b).count_ones()))
            .sum();
        let surplus: u64 = long[short.len()..]
            .iter()
            .map(|w| u64::from(w.count_ones()))
            .sum();
        shared + surplus
    }
}
