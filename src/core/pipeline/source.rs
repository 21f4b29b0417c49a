//! Image sources: pull-based suppliers of (image, provenance) pairs.
//!
//! A source is not assumed safe for unsynchronized concurrent pulls; the
//! pipeline serializes access behind one mutex. Closing a source discards
//! whatever it has left, and closing twice is a harmless no-op.

use crate::core::hasher::decode;
use crate::error::ImageError;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File extensions the directory source treats as images.
const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "webp", "tif", "tiff",
];

/// An image together with where it came from.
#[derive(Debug, Clone)]
pub struct SourcedImage {
    pub image: DynamicImage,
    /// Provenance: a file path, URL, or other free-text label.
    pub source: Option<String>,
}

/// A pull-based stream of images.
///
/// `next_image` yields `None` when drained or closed. Per-item failures
/// (an unreadable or undecodable file) are yielded as `Some(Err(..))`:
/// one bad item never ends the stream.
pub trait ImageSource: Send {
    fn next_image(&mut self) -> Option<Result<SourcedImage, ImageError>>;

    /// Discard remaining items. Idempotent.
    fn close(&mut self);
}

/// The degenerate single-image source.
pub struct SingleImageSource {
    item: Option<SourcedImage>,
}

impl SingleImageSource {
    pub fn new(image: DynamicImage, source: impl Into<String>) -> Self {
        Self {
            item: Some(SourcedImage {
                image,
                source: Some(source.into()),
            }),
        }
    }

    pub fn unlabeled(image: DynamicImage) -> Self {
        Self {
            item: Some(SourcedImage { image, source: None }),
        }
    }
}

impl ImageSource for SingleImageSource {
    fn next_image(&mut self) -> Option<Result<SourcedImage, ImageError>> {
        self.item.take().map(Ok)
    }

    fn close(&mut self) {
        self.item = None;
    }
}

/// An in-memory batch of images.
pub struct VecSource {
    items: std::vec::IntoIter<SourcedImage>,
}

impl VecSource {
    pub fn new(items: Vec<SourcedImage>) -> Self {
        Self {
            items: items.into_iter(),
        }
    }
}

impl ImageSource for VecSource {
    fn next_image(&mut self) -> Option<Result<SourcedImage, ImageError>> {
        self.items.next().map(Ok)
    }

    fn close(&mut self) {
        self.items = Vec::new().into_iter();
    }
}

/// Enumerates image files under a directory tree, decoding one file per
/// pull. Files are visited in sorted path order so runs are reproducible.
pub struct DirectorySource {
    paths: std::vec::IntoIter<PathBuf>,
}

impl DirectorySource {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, ImageError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(ImageError::Io {
                path: root.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "not a readable directory",
                ),
            });
        }

        let mut paths: Vec<PathBuf> = WalkDir::new(root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| has_image_extension(path))
            .collect();
        paths.sort();

        tracing::debug!(root = %root.display(), files = paths.len(), "enumerated image files");
        Ok(Self {
            paths: paths.into_iter(),
        })
    }

    /// Number of files left to yield.
    pub fn remaining(&self) -> usize {
        self.paths.len()
    }
}

impl ImageSource for DirectorySource {
    fn next_image(&mut self) -> Option<Result<SourcedImage, ImageError>> {
        let path = self.paths.next()?;
        let label = path.display().to_string();
        Some(decode::decode(&path).map(|image| SourcedImage {
            image,
            source: Some(label),
        }))
    }

    fn close(&mut self) {
        self.paths = Vec::new().into_iter();
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}
