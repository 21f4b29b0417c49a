//! # Image Fingerprint
//!
//! Compact perceptual fingerprints from images, and fast near-duplicate
//! search over large fingerprint collections.
//!
//! ## Architecture
//! The library is split into a core engine (GUI-agnostic) and presentation
//! layers:
//! - `core` - fingerprints, hash algorithms, the vantage-point tree index,
//!   and the concurrent hashing pipeline
//! - `events` - event-driven progress and per-item error reporting
//! - `error` - the error taxonomy
//!
//! ## Quick start
//! ```rust,ignore
//! use image_fingerprint::core::hasher::{HasherConfig, MatchMode};
//!
//! let hasher = HasherConfig::new().side(8).build()?;
//! let a = hasher.hash_file(&path_a)?;
//! let b = hasher.hash_file(&path_b)?;
//! if hasher.matches(&a, &b, MatchMode::Normal)? {
//!     println!("near-duplicates, distance {}", a.distance(&b)?);
//! }
//! ```

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{Error, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point (CLI or GUI).
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default tracing subscriber");
}
