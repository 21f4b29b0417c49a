//! Fingerprint sinks: anything that can accept one fingerprint at a time
//! from concurrently running workers.

use crate::core::fingerprint::Fingerprint;
use crate::core::index::VpTree;
use std::io::Write;
use std::sync::Mutex;

/// A destination for computed fingerprints.
///
/// `store` is called concurrently from every pipeline worker, so
/// implementations guard their state internally.
pub trait FingerprintSink: Send + Sync {
    fn store(&self, fingerprint: Fingerprint);
}

/// Recover a poisoned mutex: a panicking worker leaves the collection in a
/// consistent state here (push is all-or-nothing), so the data is usable.
fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Collects fingerprints into an in-memory vector.
#[derive(Default)]
pub struct CollectionSink {
    items: Mutex<Vec<Fingerprint>>,
}

impl CollectionSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock_unpoisoned(&self.items).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drain the collected fingerprints.
    pub fn take(&self) -> Vec<Fingerprint> {
        std::mem::take(&mut *lock_unpoisoned(&self.items))
    }
}

impl FingerprintSink for CollectionSink {
    fn store(&self, fingerprint: Fingerprint) {
        lock_unpoisoned(&self.items).push(fingerprint);
    }
}

/// Streams fingerprints as canonical text, one line each.
pub struct WriterSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Flush and give the writer back.
    pub fn into_inner(self) -> std::io::Result<W> {
        let mut writer = self.writer.into_inner().unwrap_or_else(|p| p.into_inner());
        writer.flush()?;
        Ok(writer)
    }
}

impl<W: Write + Send> FingerprintSink for WriterSink<W> {
    fn store(&self, fingerprint: Fingerprint) {
        let mut writer = lock_unpoisoned(&self.writer);
        if let Err(error) = writeln!(writer, "{fingerprint}") {
            tracing::warn!(%error, "failed to write fingerprint line");
        }
    }
}

/// Buffers fingerprints and batch-builds a vantage-point tree once the run
/// is over. The tree has no concurrent-insert semantics, so the build
/// happens strictly after all workers finish.
#[derive(Default)]
pub struct TreeSink {
    buffer: Mutex<Vec<Fingerprint>>,
}

impl TreeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock_unpoisoned(&self.buffer).len()
    }

    /// Build the index over everything stored so far.
    pub fn into_tree(self) -> VpTree<Fingerprint> {
        let points = self.buffer.into_inner().unwrap_or_else(|p| p.into_inner());
        VpTree::build(points)
    }
}

impl FingerprintSink for TreeSink {
    fn store(&self, fingerprint: Fingerprint) {
        lock_unpoisoned(&self.buffer).push(fingerprint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn fp(word: u64) -> Fingerprint {
        Fingerprint::new("dHash", vec![word], 64).unwrap()
    }

    #[test]
    fn collection_sink_collects() {
        let sink = CollectionSink::new();
        sink.store(fp(1));
        sink.store(fp(2));
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.take().len(), 2);
        assert!(sink.is_empty());
    }

    #[test]
    fn collection_sink_tolerates_concurrent_stores() {
        let sink = Arc::new(CollectionSink::new());
        let mut handles = Vec::new();
        for t in 0..8u64 {
            let sink = Arc::clone(&sink);
            handles.push(thread::spawn(move || {
                for i in 0..100u64 {
                    sink.store(fp(t * 1000 + i));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(sink.len(), 800);
    }

    #[test]
    fn writer_sink_emits_canonical_lines() {
        let sink = WriterSink::new(Vec::new());
        sink.store(fp(0xFF).with_source("a.png"));
        sink.store(fp(0x00));

        let bytes = sink.into_inner().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "dHash,64,00000000000000FF,a.png");
        // Each line parses back.
        for line in lines {
            line.parse::<Fingerprint>().unwrap();
        }
    }

    #[test]
    fn tree_sink_builds_after_the_fact() {
        let sink = TreeSink::new();
        for word in [0x00u64, 0x01, 0x03, 0xFF] {
            sink.store(fp(word));
        }
        assert_eq!(sink.len(), 4);

        let tree = sink.into_tree();
        assert_eq!(tree.len(), 4);
        let hits = tree.within(&fp(0x00), 1);
        assert_eq!(hits.len(), 2);
    }
}
