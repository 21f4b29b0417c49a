//! Pipeline execution: a fixed-width worker pool draining one source.

use super::sink::FingerprintSink;
use super::source::ImageSource;
use crate::core::hasher::HashAlgorithm;
use crate::error::{ConfigError, Error};
use crate::events::{Event, EventSender, HashEvent, PipelineEvent};
use crate::events::null_sender;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

/// Matches the original deployment's work-stealing pool width; hashing is
/// CPU-bound but sources often block on IO, so this runs a little wider
/// than typical core counts.
const DEFAULT_WORKERS: usize = 15;

/// Cooperative cancellation handle.
///
/// Cancelling stops further pulls from the source; in-flight hash
/// computations always finish. Cloning shares the same flag.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Outcome of a pipeline run.
#[derive(Debug)]
pub struct PipelineResult {
    /// Fingerprints delivered to the sink
    pub hashed: usize,
    /// Per-item failures (non-fatal)
    pub errors: Vec<String>,
    /// Whether the run stopped early because of cancellation
    pub cancelled: bool,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

/// Builder for [`HashingPipeline`].
pub struct PipelineBuilder {
    source: Option<Box<dyn ImageSource>>,
    hasher: Option<Box<dyn HashAlgorithm>>,
    sink: Option<Arc<dyn FingerprintSink>>,
    workers: usize,
    label_sources: bool,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            source: None,
            hasher: None,
            sink: None,
            workers: DEFAULT_WORKERS,
            label_sources: true,
        }
    }

    pub fn source(mut self, source: impl ImageSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn hasher(mut self, hasher: Box<dyn HashAlgorithm>) -> Self {
        self.hasher = Some(hasher);
        self
    }

    /// Shared sink; keep a clone of the `Arc` to read results afterwards.
    pub fn sink(mut self, sink: Arc<dyn FingerprintSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Worker pool width. Values below 1 are clamped to 1.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Whether to stamp each fingerprint with its image's provenance
    /// string (on by default).
    pub fn label_sources(mut self, label: bool) -> Self {
        self.label_sources = label;
        self
    }

    pub fn build(self) -> Result<HashingPipeline, ConfigError> {
        Ok(HashingPipeline {
            source: Mutex::new(
                self.source
                    .ok_or(ConfigError::MissingComponent("source"))?,
            ),
            hasher: self.hasher.ok_or(ConfigError::MissingComponent("hasher"))?,
            sink: self.sink.ok_or(ConfigError::MissingComponent("sink"))?,
            workers: self.workers,
            label_sources: self.label_sources,
            cancel: CancelToken::new(),
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The hashing pipeline: source -> (parallel) hash -> sink.
pub struct HashingPipeline {
    source: Mutex<Box<dyn ImageSource>>,
    hasher: Box<dyn HashAlgorithm>,
    sink: Arc<dyn FingerprintSink>,
    workers: usize,
    label_sources: bool,
    cancel: CancelToken,
}

impl HashingPipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Handle for cancelling this pipeline from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run without progress reporting.
    pub fn run(&self) -> Result<PipelineResult, Error> {
        self.run_with_events(&null_sender())
    }

    /// Drain the source, hashing on `workers` threads. Returns once every
    /// yielded image has been processed (which for an infinite source is
    /// never, by design) or cancellation takes effect.
    pub fn run_with_events(&self, events: &EventSender) -> Result<PipelineResult, Error> {
        let start = Instant::now();
        let hashed = AtomicUsize::new(0);
        let errors: Mutex<Vec<String>> = Mutex::new(Vec::new());

        events.send(Event::Pipeline(PipelineEvent::Started {
            workers: self.workers,
        }));
        tracing::info!(workers = self.workers, algorithm = self.hasher.name(), "pipeline started");

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| Error::WorkerPool(e.to_string()))?;

        pool.scope(|scope| {
            for _ in 0..self.workers {
                scope.spawn(|_| self.worker_loop(&hashed, &errors, events));
            }
        });

        // All workers are done; release whatever the source still holds.
        lock_unpoisoned(&self.source).close();

        let cancelled = self.cancel.is_cancelled();
        if cancelled {
            events.send(Event::Pipeline(PipelineEvent::Cancelled));
        }

        let hashed = hashed.load(Ordering::SeqCst);
        let errors = std::mem::take(&mut *lock_unpoisoned(&errors));
        events.send(Event::Pipeline(PipelineEvent::Completed {
            hashed,
            errors: errors.len(),
        }));
        tracing::info!(hashed, errors = errors.len(), cancelled, "pipeline finished");

        Ok(PipelineResult {
            hashed,
            errors,
            cancelled,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn worker_loop(
        &self,
        hashed: &AtomicUsize,
        errors: &Mutex<Vec<String>>,
        events: &EventSender,
    ) {
        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            // The pull is the only synchronized section: decode and hash
            // run outside the lock.
            let item = lock_unpoisoned(&self.source).next_image();

            match item {
                None => break,
                Some(Err(error)) => {
                    let message = error.to_string();
                    events.send(Event::Hash(HashEvent::Error {
                        source: None,
                        message: message.clone(),
                    }));
                    lock_unpoisoned(errors).push(message);
                }
                Some(Ok(sourced)) => match self.hasher.hash_image(&sourced.image) {
                    Ok(mut fingerprint) => {
                        if self.label_sources {
                            if let Some(label) = &sourced.source {
                                fingerprint.set_source(label.clone());
                            }
                        }
                        self.sink.store(fingerprint);
                        hashed.fetch_add(1, Ordering::SeqCst);
                        events.send(Event::Hash(HashEvent::Hashed {
                            source: sourced.source,
                        }));
                    }
                    Err(error) => {
                        let message = match &sourced.source {
                            Some(label) => format!("{label}: {error}"),
                            None => error.to_string(),
                        };
                        events.send(Event::Hash(HashEvent::Error {
                            source: sourced.source.clone(),
                            message: message.clone(),
                        }));
                        lock_unpoisoned(errors).push(message);
                    }
                },
            }
        }
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
