//! # Events Module
//!
//! Progress and per-item error reporting for the hashing pipeline.
//!
//! The pipeline pushes [`Event`]s into a channel as it works; any consumer
//! (CLI progress bar, GUI, test harness) reads from the other end. The
//! `HashEvent::Error` stream is the per-item error channel: one event per
//! failed image, while the run itself continues.

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::{Event, HashEvent, PipelineEvent};
