//! # Vantage-Point Tree
//!
//! A static, balanced binary space-partitioning index over a metric space.
//! Enables O(log n) similarity queries instead of O(n) linear scans.
//!
//! ## How It Works
//! 1. Pick a vantage point and measure every other point's distance to it
//! 2. Split at the median distance: closer points left, the rest right
//! 3. Recurse until groups shrink to leaf buckets
//! 4. Queries prune whole subtrees using the triangle inequality - a
//!    subtree whose distance band cannot intersect the query ball is never
//!    visited
//!
//! The tree is immutable after construction; the supported update path is
//! a batch rebuild.

use crate::core::metric::MetricPoint;
use crate::error::QueryError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BinaryHeap;

/// Groups at or below this size become leaf buckets.
const LEAF_CAPACITY: usize = 1;

/// Default seed for vantage-point selection. Fixed so that building the
/// same collection twice yields the same tree.
const DEFAULT_SEED: u64 = 0x5eed_1dba_5e;

/// An indexed point together with its insertion order, which breaks
/// distance ties deterministically in query results.
struct Entry<P> {
    point: P,
    index: usize,
}

enum Node<P> {
    Leaf(Vec<Entry<P>>),
    Inner {
        vantage: Entry<P>,
        /// Median distance from the vantage point at build time: the left
        /// subtree holds points strictly closer than this, the right
        /// subtree the rest (ties right).
        radius: u64,
        left: Option<Box<Node<P>>>,
        right: Option<Box<Node<P>>>,
    },
}

/// A vantage-point tree over a collection of metric points.
pub struct VpTree<P: MetricPoint> {
    root: Option<Box<Node<P>>>,
    len: usize,
}

impl<P: MetricPoint> VpTree<P> {
    /// Build a tree from a collection. An empty collection yields an empty
    /// tree, which answers every query with an empty result.
    pub fn build(points: Vec<P>) -> Self {
        Self::build_seeded(points, DEFAULT_SEED)
    }

    /// Build with an explicit seed for vantage-point selection.
    pub fn build_seeded(points: Vec<P>, seed: u64) -> Self {
        let len = points.len();
        let mut rng = StdRng::seed_from_u64(seed);
        let entries: Vec<Entry<P>> = points
            .into_iter()
            .enumerate()
            .map(|(index, point)| Entry { point, index })
            .collect();
        let root = build_node(entries, &mut rng);
        tracing::debug!(points = len, "built vantage-point tree");
        Self { root, len }
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Every indexed point within `radius` of `query` (inclusive), with its
    /// distance, ascending; distance ties break by insertion order.
    pub fn within<'a>(&'a self, query: &P, radius: u64) -> Vec<(&'a P, u64)> {
        let mut hits: Vec<Hit<'a, P>> = Vec::new();
        if let Some(root) = &self.root {
            search_within(root, query, radius, &mut hits);
        }
        hits.sort_unstable_by_key(|hit| (hit.dist, hit.index));
        hits.into_iter().map(|hit| (hit.point, hit.dist)).collect()
    }

    /// The `k` indexed points nearest to `query`, ascending by distance,
    /// ties by insertion order. Returns fewer than `k` when the tree holds
    /// fewer points; `k == 0` is a validation error.
    pub fn nearest<'a>(&'a self, query: &P, k: usize) -> Result<Vec<(&'a P, u64)>, QueryError> {
        if k == 0 {
            return Err(QueryError::InvalidK);
        }
        let mut best: BinaryHeap<Hit<'a, P>> = BinaryHeap::with_capacity(k + 1);
        if let Some(root) = &self.root {
            search_nearest(root, query, k, &mut best);
        }
        let mut hits = best.into_vec();
        hits.sort_unstable_by_key(|hit| (hit.dist, hit.index));
        Ok(hits.into_iter().map(|hit| (hit.point, hit.dist)).collect())
    }

    /// Iterate over the indexed points in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &P> {
        let mut points = Vec::with_capacity(self.len);
        if let Some(root) = &self.root {
            collect_points(root, &mut points);
        }
        points.into_iter()
    }
}

fn build_node<P: MetricPoint>(mut entries: Vec<Entry<P>>, rng: &mut StdRng) -> Option<Box<Node<P>>> {
    if entries.is_empty() {
        return None;
    }
    if entries.len() <= LEAF_CAPACITY {
        return Some(Box::new(Node::Leaf(entries)));
    }

    let vantage = entries.swap_remove(rng.gen_range(0..entries.len()));
    let mut scored: Vec<(u64, Entry<P>)> = entries
        .into_iter()
        .map(|entry| (vantage.point.distance(&entry.point), entry))
        .collect();

    let mid = scored.len() / 2;
    scored.select_nth_unstable_by_key(mid, |(dist, _)| *dist);
    let radius = scored[mid].0;

    // Strictly-closer points go left; ties go right with the median itself.
    // When every distance equals the median the left side is empty, but the
    // recursion still shrinks because the vantage point was removed.
    let (left, right): (Vec<_>, Vec<_>) = scored.into_iter().partition(|(dist, _)| *dist < radius);
    let left = left.into_iter().map(|(_, entry)| entry).collect();
    let right = right.into_iter().map(|(_, entry)| entry).collect();

    Some(Box::new(Node::Inner {
        vantage,
        radius,
        left: build_node(left, rng),
        right: build_node(right, rng),
    }))
}

/// A query result candidate. Heap-ordered by (distance, insertion index)
/// so the max-heap's top is always the worst kept candidate.
struct Hit<'a, P> {
    dist: u64,
    index: usize,
    point: &'a P,
}

impl<P> PartialEq for Hit<'_, P> {
    fn eq(&self, other: &Self) -> bool {
        (self.dist, self.index) == (other.dist, other.index)
    }
}

impl<P> Eq for Hit<'_, P> {}

impl<P> PartialOrd for Hit<'_, P> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<P> Ord for Hit<'_, P> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.dist, self.index).cmp(&(other.dist, other.index))
    }
}

fn search_within<'a, P: MetricPoint>(
    node: &'a Node<P>,
    query: &P,
    radius: u64,
    hits: &mut Vec<Hit<'a, P>>,
) {
    match node {
        Node::Leaf(entries) => {
            for entry in entries {
                let dist = query.distance(&entry.point);
                if dist <= radius {
                    hits.push(Hit {
                        dist,
                        index: entry.index,
                        point: &entry.point,
                    });
                }
            }
        }
        Node::Inner {
            vantage,
            radius: mu,
            left,
            right,
        } => {
            let dist = query.distance(&vantage.point);
            if dist <= radius {
                hits.push(Hit {
                    dist,
                    index: vantage.index,
                    point: &vantage.point,
                });
            }
            // Triangle-inequality pruning. Both conditions may hold, in
            // which case both children are visited. Subtractions saturate:
            // the only case that changes (mu == 0) has an empty left child.
            if dist.saturating_sub(radius) < *mu {
                if let Some(child) = left {
                    search_within(child, query, radius, hits);
                }
            }
            if dist >= mu.saturating_sub(radius) {
                if let Some(child) = right {
                    search_within(child, query, radius, hits);
                }
            }
        }
    }
}

fn search_nearest<'a, P: MetricPoint>(
    node: &'a Node<P>,
    query: &P,
    k: usize,
    best: &mut BinaryHeap<Hit<'a, P>>,
) {
    match node {
        Node::Leaf(entries) => {
            for entry in entries {
                offer(
                    best,
                    k,
                    Hit {
                        dist: query.distance(&entry.point),
                        index: entry.index,
                        point: &entry.point,
                    },
                );
            }
        }
        Node::Inner {
            vantage,
            radius: mu,
            left,
            right,
        } => {
            let dist = query.distance(&vantage.point);
            offer(
                best,
                k,
                Hit {
                    dist,
                    index: vantage.index,
                    point: &vantage.point,
                },
            );

            // Visit the side containing the query ball's center first so
            // the pruning bound shrinks as early as possible.
            let near_left = dist < *mu;
            let (near, far) = if near_left { (left, right) } else { (right, left) };
            if let Some(child) = near {
                search_nearest(child, query, k, best);
            }

            // Same triangle bound as range search, with the shrinking
            // worst-kept distance in place of a fixed radius. Inclusive,
            // because an equal-distance point can still win a tie on
            // insertion order.
            let bound = pruning_bound(best, k);
            let far_viable = if near_left {
                dist >= mu.saturating_sub(bound)
            } else {
                dist.saturating_sub(bound) <= *mu
            };
            if far_viable {
                if let Some(child) = far {
                    search_nearest(child, query, k, best);
                }
            }
        }
    }
}

/// Current pruning radius: the worst kept distance once `k` candidates
/// have been collected, infinite before that.
fn pruning_bound<P>(best: &BinaryHeap<Hit<'_, P>>, k: usize) -> u64 {
    if best.len() == k {
        best.peek().map(|hit| hit.dist).unwrap_or(u64::MAX)
    } else {
        u64::MAX
    }
}

fn offer<'a, P>(best: &mut BinaryHeap<Hit<'a, P>>, k: usize, candidate: Hit<'a, P>) {
    if best.len() < k {
        best.push(candidate);
    } else if let Some(worst) = best.peek() {
        if candidate < *worst {
            best.pop();
            best.push(candidate);
        }
    }
}

fn collect_points<'a, P>(node: &'a Node<P>, out: &mut Vec<&'a P>) {
    match node {
        Node::Leaf(entries) => out.extend(entries.iter().map(|entry| &entry.point)),
        Node::Inner {
            vantage,
            left,
            right,
            ..
        } => {
            out.push(&vantage.point);
            if let Some(child) = left {
                collect_points(child, out);
            }
            if let Some(child) = right {
                collect_points(child, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fingerprint::Fingerprint;

    /// Bytes under Hamming distance form a metric space.
    impl MetricPoint for u8 {
        fn distance(&self, other: &Self) -> u64 {
            u64::from((self ^ other).count_ones())
        }
    }

    fn pseudo_random_bytes(n: usize, seed: u64) -> Vec<u8> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|_| rng.gen()).collect()
    }

    #[test]
    fn empty_tree_answers_empty() {
        let tree: VpTree<u8> = VpTree::build(Vec::new());
        assert!(tree.is_empty());
        assert!(tree.within(&0x00, 255).is_empty());
        assert!(tree.nearest(&0x00, 3).unwrap().is_empty());
    }

    #[test]
    fn zero_k_is_rejected() {
        let tree = VpTree::build(vec![0x01u8]);
        assert!(matches!(tree.nearest(&0x00, 0), Err(QueryError::InvalidK)));
    }

    #[test]
    fn single_point_tree() {
        let tree = VpTree::build(vec![0xF0u8]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.within(&0xF0, 0), vec![(&0xF0, 0)]);
        assert_eq!(tree.nearest(&0x0F, 1).unwrap(), vec![(&0xF0, 8)]);
    }

    #[test]
    fn range_query_on_small_hash_set() {
        // Points 0x00, 0x01, 0x03, 0xFF; within distance 1 of 0x00 must be
        // exactly {0x00, 0x01}.
        let tree = VpTree::build(vec![0x00u8, 0x01, 0x03, 0xFF]);
        let hits: Vec<u8> = tree.within(&0x00, 1).into_iter().map(|(p, _)| *p).collect();
        assert_eq!(hits, vec![0x00, 0x01]);
    }

    #[test]
    fn within_matches_brute_force() {
        let points = pseudo_random_bytes(200, 7);
        let tree = VpTree::build(points.clone());

        for query in [0x00u8, 0x55, 0xAA, 0xFF, 0x13] {
            for radius in 0..=8u64 {
                let got: Vec<(u8, u64)> = tree
                    .within(&query, radius)
                    .into_iter()
                    .map(|(p, d)| (*p, d))
                    .collect();
                let mut got_sorted = got.clone();
                got_sorted.sort();
                let mut expected: Vec<(u8, u64)> = points
                    .iter()
                    .filter(|p| query.distance(p) <= radius)
                    .map(|p| (*p, query.distance(p)))
                    .collect();
                expected.sort();
                assert_eq!(got_sorted, expected, "query {query:#x} radius {radius}");

                // And the returned order is ascending by distance.
                assert!(got.windows(2).all(|w| w[0].1 <= w[1].1));
            }
        }
    }

    #[test]
    fn nearest_matches_sorted_linear_scan() {
        let points = pseudo_random_bytes(150, 99);
        let tree = VpTree::build(points.clone());

        for query in [0x00u8, 0x42, 0xFF] {
            for k in [1usize, 3, 10, 150, 200] {
                let got: Vec<u64> = tree
                    .nearest(&query, k)
                    .unwrap()
                    .into_iter()
                    .map(|(_, d)| d)
                    .collect();
                let mut expected: Vec<u64> =
                    points.iter().map(|p| query.distance(p)).collect();
                expected.sort_unstable();
                expected.truncate(k);
                assert_eq!(got, expected, "query {query:#x} k {k}");
            }
        }
    }

    #[test]
    fn nearest_breaks_ties_by_insertion_order() {
        // 0x01 and 0x02 are both at distance 1 from 0x00; only two slots.
        let tree = VpTree::build(vec![0x02u8, 0x01, 0x00]);
        let hits = tree.nearest(&0x00, 2).unwrap();
        assert_eq!(hits[0], (&0x00, 0));
        // 0x02 was inserted before 0x01, so it wins the distance tie.
        assert_eq!(hits[1], (&0x02, 1));
    }

    #[test]
    fn builds_are_deterministic_for_a_fixed_seed() {
        let points = pseudo_random_bytes(64, 3);
        let a = VpTree::build_seeded(points.clone(), 42);
        let b = VpTree::build_seeded(points, 42);

        let hits_a: Vec<(u8, u64)> =
            a.within(&0x10, 3).into_iter().map(|(p, d)| (*p, d)).collect();
        let hits_b: Vec<(u8, u64)> =
            b.within(&0x10, 3).into_iter().map(|(p, d)| (*p, d)).collect();
        assert_eq!(hits_a, hits_b);
    }

    #[test]
    fn duplicate_points_are_all_returned() {
        let tree = VpTree::build(vec![0x07u8, 0x07, 0x07]);
        assert_eq!(tree.within(&0x07, 0).len(), 3);
        assert_eq!(tree.nearest(&0x07, 3).unwrap().len(), 3);
    }

    #[test]
    fn iter_visits_every_point() {
        let points = pseudo_random_bytes(40, 11);
        let tree = VpTree::build(points.clone());
        let mut seen: Vec<u8> = tree.iter().copied().collect();
        let mut expected = points;
        seen.sort_unstable();
        expected.sort_unstable();
        assert_eq!(seen, expected);
    }

    #[test]
    fn indexes_fingerprints() {
        let fp = |w: u64| Fingerprint::new("dHash", vec![w], 64).unwrap();
        let tree = VpTree::build(vec![fp(0x00), fp(0x01), fp(0x03), fp(0xFF)]);

        let hits: Vec<u64> = tree
            .within(&fp(0x00), 1)
            .into_iter()
            .map(|(p, _)| p.words()[0])
            .collect();
        assert_eq!(hits, vec![0x00, 0x01]);

        let nearest = tree.nearest(&fp(0xFE), 1).unwrap();
        assert_eq!(nearest[0].0.words()[0], 0xFF);
        assert_eq!(nearest[0].1, 1);
    }
}
