//! # Hasher Module
//!
//! The hashing-algorithm contract and its reference implementation.
//!
//! ## Contract
//! A [`HashAlgorithm`] turns pixel content into a [`Fingerprint`]. Hashing
//! is deterministic for a fixed configuration: the same pixels always yield
//! the same bits. Each algorithm carries its own identity tag, output bit
//! length, comparison semantics, and match-tolerance thresholds, and can be
//! reconstructed from a one-line config string.
//!
//! ## Reference algorithm
//! [`DifferenceHasher`] (dHash) compares horizontally adjacent pixels of a
//! small grayscale thumbnail. Fast, and a good balance of robustness and
//! selectivity for near-duplicate detection.

mod algorithms;
pub mod decode;
pub mod resize;

pub use algorithms::DifferenceHasher;

use crate::core::fingerprint::Fingerprint;
use crate::error::{ConfigError, FingerprintError, ImageError};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Match tolerance, strictest to loosest.
///
/// The Hamming-distance threshold each mode maps to is a property of the
/// algorithm, not a universal constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchMode {
    /// Bit-identical only
    Exact,
    /// Nearly identical
    Strict,
    /// Near-duplicates
    Normal,
    /// Loose similarity
    Sloppy,
}

/// Comparison semantics of an algorithm's fingerprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonKind {
    /// Count of differing bit positions
    Hamming,
}

/// A perceptual hashing algorithm.
pub trait HashAlgorithm: Send + Sync {
    /// Identity tag stamped on every fingerprint this algorithm produces.
    fn name(&self) -> &str;

    /// Output fingerprint length in bits.
    fn bit_length(&self) -> u32;

    /// How this algorithm's fingerprints are compared.
    fn comparison(&self) -> ComparisonKind;

    /// Compute a fingerprint from an already-decoded image.
    fn hash_image(&self, image: &DynamicImage) -> Result<Fingerprint, ImageError>;

    /// Compute a fingerprint directly from a file path.
    ///
    /// Decodes with the fast per-format decoders and labels the result with
    /// the path.
    fn hash_file(&self, path: &Path) -> Result<Fingerprint, ImageError> {
        let image = decode::decode(path)?;
        let fingerprint = self.hash_image(&image)?;
        Ok(fingerprint.with_source(path.display().to_string()))
    }

    /// Whether two fingerprints match under the given tolerance.
    ///
    /// Fails when the fingerprints are not comparable.
    fn matches(
        &self,
        a: &Fingerprint,
        b: &Fingerprint,
        mode: MatchMode,
    ) -> Result<bool, FingerprintError>;

    /// One-line config text from which this instance can be rebuilt.
    fn serialize_config(&self) -> String;
}

/// Configuration builder for hashers, mirroring the shape a GUI or CLI
/// feeds in.
#[derive(Debug, Clone)]
pub struct HasherConfig {
    side: u32,
}

impl HasherConfig {
    pub fn new() -> Self {
        Self {
            side: algorithms::DEFAULT_SIDE,
        }
    }

    /// Side length of the comparison grid; the output is `side²` bits.
    ///
    /// - 8: 64 bits, fast, good for most uses
    /// - 16: 256 bits, more selective
    pub fn side(mut self, side: u32) -> Self {
        self.side = side;
        self
    }

    /// Build the hasher. Invalid parameters fail here, never at hash time.
    pub fn build(self) -> Result<Box<dyn HashAlgorithm>, ConfigError> {
        Ok(Box::new(DifferenceHasher::new(self.side)?))
    }
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self::new()
    }
}
