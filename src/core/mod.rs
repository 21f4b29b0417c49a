//! # Core Engine
//!
//! The fingerprinting engine, UI-agnostic:
//! - `fingerprint` - the packed bit-vector value type and its text encoding
//! - `hasher` - the hashing-algorithm contract and the dHash reference
//! - `metric` - the metric-space capability the index is generic over
//! - `index` - the vantage-point tree for sub-linear similarity search
//! - `pipeline` - concurrent source -> hash -> sink execution

pub mod fingerprint;
pub mod hasher;
pub mod index;
pub mod metric;
pub mod pipeline;
