//! Event type definitions.

use serde::{Deserialize, Serialize};

/// All events emitted by the hashing pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Per-image hashing events
    Hash(HashEvent),
    /// Run-level events
    Pipeline(PipelineEvent),
}

/// Events for individual images
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HashEvent {
    /// An image was hashed and its fingerprint delivered to the sink
    Hashed {
        /// Provenance of the image, when the source provided one
        source: Option<String>,
    },
    /// One image failed; the run continues
    Error {
        source: Option<String>,
        message: String,
    },
}

/// Run-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Workers are starting to drain the source
    Started { workers: usize },
    /// Cancellation was requested; no further items will be pulled
    Cancelled,
    /// The source is drained and all workers have finished
    Completed { hashed: usize, errors: usize },
}
