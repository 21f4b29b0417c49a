//! # Index Module
//!
//! Metric-space indexing for sub-linear similarity search over
//! fingerprints (or any [`MetricPoint`](crate::core::metric::MetricPoint)).

mod vptree;

pub use vptree::VpTree;
