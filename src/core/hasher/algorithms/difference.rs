//! Difference hash (dHash).
//!
//! 1. Reduce the image to a grayscale thumbnail of (side+1) x side pixels
//! 2. For each row, compare each pixel to its right neighbor
//! 3. Bit = 1 when the left pixel is strictly darker
//!
//! The extra column exists because `side` comparisons per row need
//! `side + 1` pixels. Bits pack row-major, most significant bit of each
//! 64-bit word first, with the final partial word shifted left so its
//! unused low bits are zero.

use super::super::{resize, ComparisonKind, HashAlgorithm, MatchMode};
use crate::core::fingerprint::{words_for, Fingerprint};
use crate::error::{ConfigError, FingerprintError, ImageError};
use image::DynamicImage;

const HASH_NAME: &str = "dHash";

/// Difference hash, parameterized by the side length of the comparison
/// grid. Produces `side²`-bit fingerprints.
#[derive(Debug, Clone)]
pub struct DifferenceHasher {
    side: u32,
}

impl DifferenceHasher {
    /// Create a dHash hasher. The side length must be at least 1 and its
    /// square must fit the bit-length range; invalid values fail here, not
    /// at hash time.
    pub fn new(side: u32) -> Result<Self, ConfigError> {
        if side == 0 {
            return Err(ConfigError::InvalidSideLength { side });
        }
        side.checked_mul(side)
            .ok_or(ConfigError::BitLengthOverflow { side })?;
        Ok(Self { side })
    }

    /// Rebuild an instance from its config text: the decimal side length.
    pub fn from_config(text: &str) -> Result<Self, ConfigError> {
        let side = text
            .trim()
            .parse::<u32>()
            .map_err(|_| ConfigError::Malformed {
                text: text.to_string(),
                reason: "expected one integer value".to_string(),
            })?;
        Self::new(side)
    }

    pub fn side(&self) -> u32 {
        self.side
    }
}

impl Default for DifferenceHasher {
    fn default() -> Self {
        // The default side is statically valid.
        Self {
            side: super::DEFAULT_SIDE,
        }
    }
}

impl HashAlgorithm for DifferenceHasher {
    fn name(&self) -> &str {
        HASH_NAME
    }

    fn bit_length(&self) -> u32 {
        self.side * self.side
    }

    fn comparison(&self) -> ComparisonKind {
        ComparisonKind::Hamming
    }

    fn hash_image(&self, image: &DynamicImage) -> Result<Fingerprint, ImageError> {
        // One extra column for the rightmost comparison of each row.
        let thumb = resize::grayscale_thumbnail(image, self.side + 1, self.side)?;

        let bit_length = self.bit_length();
        let mut words = vec![0u64; words_for(bit_length)];
        let mut word_idx = 0;
        let mut bits_in_word = 0u32;

        for y in 0..self.side {
            for x in 0..self.side {
                if bits_in_word == 64 {
                    word_idx += 1;
                    bits_in_word = 0;
                }
                let left = thumb.get_pixel(x, y)[0];
                let right = thumb.get_pixel(x + 1, y)[0];
                words[word_idx] = (words[word_idx] << 1) | u64::from(left < right);
                bits_in_word += 1;
            }
        }

        // Shift the final partial word up so unused low bits are zero.
        if bits_in_word < 64 {
            words[word_idx] <<= 64 - bits_in_word;
        }

        Ok(Fingerprint::from_algorithm(HASH_NAME, words, bit_length))
    }

    fn matches(
        &self,
        a: &Fingerprint,
        b: &Fingerprint,
        mode: MatchMode,
    ) -> Result<bool, FingerprintError> {
        let distance = a.distance(b)?;
        Ok(match mode {
            MatchMode::Exact => distance == 0,
            MatchMode::Strict => distance < 2,
            MatchMode::Normal => distance < 5,
            MatchMode::Sloppy => distance < 8,
        })
    }

    fn serialize_config(&self) -> String {
        self.side.to_string()
    }
}
