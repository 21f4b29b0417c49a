//! Concrete hash algorithm implementations.

mod difference;

pub use difference::DifferenceHasher;

/// Side length used when none is configured: 8x8 = 64-bit fingerprints.
pub(crate) const DEFAULT_SIDE: u32 = 8;
