//! # Error Module
//!
//! Error types for fingerprinting, parsing, and index queries.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, field names, offending values
//! - **Fail eagerly** - configuration and parse errors surface at
//!   construction time, never silently defaulted
//! - **Partial failure is normal** - per-image errors in the pipeline are
//!   reported against that item and do not abort the run

use std::path::PathBuf;
use thiserror::Error;

/// Top-level library error
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fingerprint error: {0}")]
    Fingerprint(#[from] FingerprintError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

/// Invalid algorithm parameters, detected at construction time
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid side length {side}: must be at least 1")]
    InvalidSideLength { side: u32 },

    #[error("Side length {side} squared overflows the supported bit length")]
    BitLengthOverflow { side: u32 },

    #[error("Malformed algorithm config {text:?}: {reason}")]
    Malformed { text: String, reason: String },

    #[error("Missing pipeline component: {0}")]
    MissingComponent(&'static str),
}

/// Errors raised by the fingerprint value type
#[derive(Error, Debug)]
pub enum FingerprintError {
    #[error("Algorithm tag {tag:?} contains a reserved character (one of ',', '|', '\"')")]
    ReservedTagCharacter { tag: String },

    #[error("Expected {expected} words for {bit_length} bits, got {found}")]
    WordCountMismatch {
        bit_length: u32,
        expected: usize,
        found: usize,
    },

    #[error("Fingerprints are not comparable: algorithm {left:?} vs {right:?}")]
    IncomparableAlgorithm { left: String, right: String },

    #[error("Fingerprints are not comparable: bit length {left} vs {right}")]
    IncomparableLength { left: u32, right: u32 },
}

/// Malformed canonical text
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Field count: expected at least 3 comma-separated fields, found {found}")]
    MissingFields { found: usize },

    #[error("Bit length field {value:?} is not a decimal integer")]
    InvalidBitLength { value: String },

    #[error("Hex field contains non-hex character {found:?}")]
    InvalidHexCharacter { found: char },

    #[error("Hex field is {found} characters, expected {expected} for {bit_length} bits")]
    HexLengthMismatch {
        bit_length: u32,
        expected: usize,
        found: usize,
    },

    #[error("Algorithm field: {0}")]
    InvalidFingerprint(#[from] FingerprintError),
}

/// A single image failed to load, decode, or resize
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Failed to open image file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode image {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Failed to resize image: {reason}")]
    Resize { reason: String },
}

/// Malformed index query parameters
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("k must be at least 1")]
    InvalidK,
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_error_includes_path() {
        let error = ImageError::Decode {
            path: PathBuf::from("/photos/broken.jpg"),
            reason: "invalid JPEG".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("/photos/broken.jpg"));
        assert!(message.contains("invalid JPEG"));
    }

    #[test]
    fn incomparable_error_names_both_sides() {
        let error = FingerprintError::IncomparableLength {
            left: 64,
            right: 256,
        };
        let message = error.to_string();
        assert!(message.contains("64"));
        assert!(message.contains("256"));
    }

    #[test]
    fn parse_error_names_offending_field() {
        let error = ParseError::InvalidBitLength {
            value: "sixty-four".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("Bit length"));
        assert!(message.contains("sixty-four"));
    }

    #[test]
    fn config_error_names_side() {
        let error = ConfigError::InvalidSideLength { side: 0 };
        assert!(error.to_string().contains("side length 0"));
    }
}
