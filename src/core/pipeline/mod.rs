//! # Pipeline Module
//!
//! Drains a source of images through a hash algorithm on a fixed-width
//! worker pool, delivering fingerprints to a shared sink.
//!
//! ## Contract
//! - Every image the source yields is processed before `run` returns
//! - A malformed image is reported against that item; the run continues
//! - Pulls from the source are serialized; no image reaches two workers
//! - The sink must tolerate concurrent stores; no ordering is guaranteed
//!   between workers (sort afterwards with the fingerprint total order)
//! - Cancellation stops further pulls and lets in-flight work finish

mod executor;
pub mod sink;
pub mod source;

pub use executor::{CancelToken, HashingPipeline, PipelineBuilder, PipelineResult};
pub use sink::{CollectionSink, FingerprintSink, TreeSink, WriterSink};
pub use source::{DirectorySource, ImageSource, SingleImageSource, SourcedImage, VecSource};
