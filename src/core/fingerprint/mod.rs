//! # Fingerprint Module
//!
//! The fingerprint value type: a fixed-width packed bit vector tagged with
//! the algorithm that produced it, plus optional provenance.
//!
//! ## Comparability
//! Two fingerprints can be distance-compared only when their algorithm tags
//! match (the sentinel tag `"unknown"` is comparable with anything) and
//! their bit lengths agree. Comparing incomparable fingerprints is an
//! error, never a silent result.
//!
//! ## Equality vs. ordering vs. hashing
//! - `Ord`/`PartialEq`/`Eq`: full-field - tag, bit length, source (absent
//!   sorts as empty), then the bit pattern with word 0 most significant.
//!   This is the canonical duplicate/ordering key.
//! - `Hash`: bit words only. Consistent with `Eq` because field-equality
//!   implies bit-equality.
//! - [`Fingerprint::same_bits`]: bit-pattern-only comparison, for callers
//!   that deliberately ignore tag/length/source.

use crate::error::{FingerprintError, ParseError};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Sentinel algorithm tag for fingerprints of unknown origin.
///
/// A fingerprint tagged `"unknown"` is distance-comparable with any tag,
/// as long as the bit lengths agree.
pub const UNKNOWN_ALGORITHM: &str = "unknown";

/// Characters reserved by the canonical text encoding.
const RESERVED_TAG_CHARS: [char; 3] = [',', '|', '"'];

/// Rendered in the source field when the provenance is absent.
const NULL_SOURCE: &str = "null";

/// A perceptual fingerprint: an immutable packed bit vector plus metadata.
///
/// Word `i` holds bits `[64i, 64i+63]`; trailing bits of a partial last
/// word belong to the producing algorithm's packing and are carried
/// verbatim through distance, ordering, and serialization.
#[derive(Debug, Clone)]
pub struct Fingerprint {
    algorithm: String,
    bit_length: u32,
    words: Box<[u64]>,
    source: Option<String>,
}

/// Number of 64-bit words needed for `bit_length` bits.
pub(crate) fn words_for(bit_length: u32) -> usize {
    (bit_length as usize + 63) / 64
}

impl Fingerprint {
    /// Create a fingerprint from packed words.
    ///
    /// Fails if the tag contains a reserved character or the word count
    /// disagrees with the declared bit length.
    pub fn new(
        algorithm: impl Into<String>,
        words: Vec<u64>,
        bit_length: u32,
    ) -> Result<Self, FingerprintError> {
        let algorithm = algorithm.into();
        check_tag(&algorithm)?;

        let expected = words_for(bit_length);
        if words.len() != expected {
            return Err(FingerprintError::WordCountMismatch {
                bit_length,
                expected,
                found: words.len(),
            });
        }

        Ok(Self {
            algorithm,
            bit_length,
            words: words.into_boxed_slice(),
            source: None,
        })
    }

    /// Trusted constructor for algorithm implementations. The tag charset
    /// and word count are the algorithm's own invariants, so they are not
    /// re-checked here.
    pub(crate) fn from_algorithm(algorithm: &str, words: Vec<u64>, bit_length: u32) -> Self {
        debug_assert_eq!(words.len(), words_for(bit_length));
        Self {
            algorithm: algorithm.to_string(),
            bit_length,
            words: words.into_boxed_slice(),
            source: None,
        }
    }

    /// Attach a provenance label, consuming and returning the fingerprint.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attach or overwrite the provenance label in place.
    ///
    /// This is the only mutation the type supports.
    pub fn set_source(&mut self, source: impl Into<String>) {
        self.source = Some(source.into());
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn bit_length(&self) -> u32 {
        self.bit_length
    }

    pub fn words(&self) -> &[u64] {
        &self.words
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Read a single bit, LSB-first within each word. `None` out of range.
    pub fn bit(&self, index: u32) -> Option<bool> {
        if index >= self.bit_length {
            return None;
        }
        let word = self.words[(index / 64) as usize];
        Some(word >> (index % 64) & 1 == 1)
    }

    /// Whether `other` can be distance-compared with `self`.
    pub fn is_comparable(&self, other: &Self) -> bool {
        self.ensure_comparable(other).is_ok()
    }

    fn ensure_comparable(&self, other: &Self) -> Result<(), FingerprintError> {
        // A fingerprint of unknown origin matches any tag.
        let unknown =
            self.algorithm == UNKNOWN_ALGORITHM || other.algorithm == UNKNOWN_ALGORITHM;
        if !unknown && self.algorithm != other.algorithm {
            return Err(FingerprintError::IncomparableAlgorithm {
                left: self.algorithm.clone(),
                right: other.algorithm.clone(),
            });
        }
        if self.bit_length != other.bit_length {
            return Err(FingerprintError::IncomparableLength {
                left: self.bit_length,
                right: other.bit_length,
            });
        }
        Ok(())
    }

    /// Hamming distance: the number of differing bits.
    ///
    /// Counts across the full word arrays. Fails when the fingerprints are
    /// not comparable.
    pub fn distance(&self, other: &Self) -> Result<u32, FingerprintError> {
        self.ensure_comparable(other)?;
        Ok(self
            .words
            .iter()
            .zip(other.words.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum())
    }

    /// Hamming distance as a fraction of the bit length, in `[0, 1]`.
    pub fn percent_distance(&self, other: &Self) -> Result<f64, FingerprintError> {
        let distance = self.distance(other)?;
        Ok(distance as f64 / self.bit_length as f64)
    }

    /// Bit-pattern-only comparison, ignoring tag, length, and source.
    ///
    /// This is deliberately distinct from `==`, which compares all fields.
    pub fn same_bits(&self, other: &Self) -> bool {
        self.words == other.words
    }

    /// The key the total order uses for the source field: absent sorts as
    /// the empty string.
    fn source_key(&self) -> &str {
        self.source.as_deref().unwrap_or("")
    }

    /// Uppercase hex rendering of the bit words: word 0 first,
    /// most-significant nibble of each word first.
    pub fn hex_bits(&self) -> String {
        let mut hex = String::with_capacity(self.words.len() * 16);
        for word in self.words.iter() {
            use fmt::Write;
            // Infallible for String.
            let _ = write!(hex, "{word:016X}");
        }
        hex
    }

    /// Canonical one-line encoding with the source label replaced.
    pub fn to_canonical_string_with_source(&self, source: &str) -> String {
        format!(
            "{},{},{},{}",
            self.algorithm,
            self.bit_length,
            self.hex_bits(),
            source
        )
    }
}

fn check_tag(tag: &str) -> Result<(), FingerprintError> {
    if tag.contains(RESERVED_TAG_CHARS) {
        return Err(FingerprintError::ReservedTagCharacter {
            tag: tag.to_string(),
        });
    }
    Ok(())
}

impl Ord for Fingerprint {
    /// Sort by algorithm tag, then bit length ascending, then source, then
    /// the bit pattern as an unsigned integer (word 0 most significant, so
    /// sorted order agrees with the canonical hex rendering).
    fn cmp(&self, other: &Self) -> Ordering {
        self.algorithm
            .cmp(&other.algorithm)
            .then_with(|| self.bit_length.cmp(&other.bit_length))
            .then_with(|| self.source_key().cmp(other.source_key()))
            .then_with(|| self.words.cmp(&other.words))
    }
}

impl PartialOrd for Fingerprint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Fingerprint {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Fingerprint {}

impl Hash for Fingerprint {
    // Bits only. Field-equal fingerprints are bit-equal, so this is
    // consistent with Eq.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.words.hash(state);
    }
}

impl fmt::Display for Fingerprint {
    /// Canonical text: `algorithm,bit_length,HEXBITS,source`.
    ///
    /// An absent source renders as the literal `null`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.algorithm,
            self.bit_length,
            self.hex_bits(),
            self.source.as_deref().unwrap_or(NULL_SOURCE)
        )
    }
}

impl FromStr for Fingerprint {
    type Err = ParseError;

    /// Parse the canonical text encoding.
    ///
    /// Accepts the three-field form (absent source), the four-field form,
    /// and any longer form where the source itself contains commas - the
    /// trailing fields are rejoined.
    fn from_str(s: &str) -> Result<Self, ParseError> {
        let fields: Vec<&str> = s.trim_end_matches(['\r', '\n']).split(',').collect();
        if fields.len() < 3 {
            return Err(ParseError::MissingFields {
                found: fields.len(),
            });
        }

        let algorithm = fields[0];
        let bit_length: u32 = fields[1]
            .parse()
            .map_err(|_| ParseError::InvalidBitLength {
                value: fields[1].to_string(),
            })?;

        let words = parse_hex_words(fields[2], bit_length)?;

        let source = match fields.len() {
            3 => None,
            4 => match fields[3] {
                NULL_SOURCE => None,
                label => Some(label.to_string()),
            },
            // Commas inside the source (e.g. an embedded URL query string).
            _ => Some(fields[3..].join(",")),
        };

        let mut fingerprint = Fingerprint::new(algorithm, words, bit_length)?;
        if let Some(source) = source {
            fingerprint.set_source(source);
        }
        Ok(fingerprint)
    }
}

fn parse_hex_words(hex: &str, bit_length: u32) -> Result<Vec<u64>, ParseError> {
    let expected = words_for(bit_length) * 16;
    if hex.len() != expected {
        return Err(ParseError::HexLengthMismatch {
            bit_length,
            expected,
            found: hex.len(),
        });
    }
    if let Some(found) = hex.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(ParseError::InvalidHexCharacter { found });
    }

    // Length and alphabet are pre-checked, so from_str_radix cannot fail.
    hex.as_bytes()
        .chunks(16)
        .map(|chunk| {
            let chunk = std::str::from_utf8(chunk).map_err(|_| {
                ParseError::InvalidHexCharacter { found: '\u{fffd}' }
            })?;
            u64::from_str_radix(chunk, 16)
                .map_err(|_| ParseError::HexLengthMismatch {
                    bit_length,
                    expected,
                    found: hex.len(),
                })
        })
        .collect()
}
