//! End-to-end tests: hash images, build a vantage-point tree, query it.
//!
//! Covers the perceptual scenarios the system exists for:
//! - A black image and its 180-degree rotation fingerprint identically
//! - A single-pixel perturbation moves the fingerprint by exactly one bit
//! - Pipeline output feeds a tree that answers similarity queries

use image_fingerprint::core::fingerprint::Fingerprint;
use image_fingerprint::core::hasher::{DifferenceHasher, HashAlgorithm, HasherConfig, MatchMode};
use image_fingerprint::core::index::VpTree;
use image_fingerprint::core::pipeline::{DirectorySource, HashingPipeline, TreeSink};
use image::{DynamicImage, ImageBuffer, Rgb};
use std::sync::Arc;
use tempfile::TempDir;

fn solid_black(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(ImageBuffer::from_fn(width, height, |_, _| Rgb([0, 0, 0])))
}

#[test]
fn black_image_and_its_180_rotation_are_identical() {
    let hasher = DifferenceHasher::new(8).unwrap();
    let base = solid_black(64, 64);
    let flipped = base.rotate180();

    let a = hasher.hash_image(&base).unwrap();
    let b = hasher.hash_image(&flipped).unwrap();

    assert_eq!(a.distance(&b).unwrap(), 0);
    assert!(hasher.matches(&a, &b, MatchMode::Exact).unwrap());
}

#[test]
fn single_pixel_perturbation_flips_exactly_one_bit() {
    // A 9x8 source maps 1:1 onto the 8x8 hash's thumbnail, so the effect
    // of one pixel is exact. Brightening pixel (1, 0) flips the row-0
    // comparison between columns 0 and 1 and nothing else: the (1, 2)
    // comparison stays false in both versions.
    let hasher = DifferenceHasher::new(8).unwrap();
    let base = solid_black(9, 8);

    let mut perturbed = base.to_rgb8();
    perturbed.put_pixel(1, 0, Rgb([255, 255, 255]));
    let perturbed = DynamicImage::ImageRgb8(perturbed);

    let a = hasher.hash_image(&base).unwrap();
    let b = hasher.hash_image(&perturbed).unwrap();

    assert_eq!(a.distance(&b).unwrap(), 1);
    assert!(hasher.matches(&a, &b, MatchMode::Strict).unwrap());
    assert!(!hasher.matches(&a, &b, MatchMode::Exact).unwrap());
}

#[test]
fn pipeline_output_builds_a_queryable_tree() {
    let dir = TempDir::new().unwrap();
    for i in 0..12u32 {
        let img = ImageBuffer::from_fn(32, 32, |x, y| {
            Rgb([((x + i) * 7) as u8, (y * 9) as u8, (i * 17) as u8])
        });
        DynamicImage::ImageRgb8(img)
            .save(dir.path().join(format!("img_{i:02}.png")))
            .unwrap();
    }

    let sink = Arc::new(TreeSink::new());
    let pipeline = HashingPipeline::builder()
        .source(DirectorySource::new(dir.path()).unwrap())
        .hasher(HasherConfig::new().build().unwrap())
        .sink(sink.clone())
        .workers(4)
        .build()
        .unwrap();
    pipeline.run().unwrap();
    assert_eq!(sink.len(), 12);

    // The pipeline holds the other Arc clone of the sink.
    drop(pipeline);
    let sink = Arc::into_inner(sink).unwrap();
    let tree = sink.into_tree();
    assert_eq!(tree.len(), 12);

    // Querying with one of the indexed images finds it at distance zero.
    let hasher = DifferenceHasher::new(8).unwrap();
    let query = hasher.hash_file(&dir.path().join("img_05.png")).unwrap();
    let exact = tree.within(&query, 0);
    assert!(!exact.is_empty());
    assert!(exact
        .iter()
        .any(|(f, d)| *d == 0 && f.source().is_some_and(|s| s.contains("img_05.png"))));

    // The nearest neighbor of any indexed point is itself.
    let nearest = tree.nearest(&query, 1).unwrap();
    assert_eq!(nearest[0].1, 0);
}

#[test]
fn canonical_lines_round_trip_into_a_searchable_index() {
    // Persist fingerprints as canonical text, parse them back, and verify
    // the rebuilt index answers the {0x00, 0x01, 0x03, 0xFF} scenario.
    let stored: Vec<String> = [0x00u64, 0x01, 0x03, 0xFF]
        .iter()
        .map(|w| {
            Fingerprint::new("dHash", vec![*w], 64)
                .unwrap()
                .with_source(format!("img/{w:02X}.png"))
                .to_string()
        })
        .collect();

    let parsed: Vec<Fingerprint> = stored.iter().map(|line| line.parse().unwrap()).collect();
    let tree = VpTree::build(parsed);

    let query = Fingerprint::new("dHash", vec![0x00], 64).unwrap();
    let hits: Vec<u64> = tree
        .within(&query, 1)
        .into_iter()
        .map(|(f, _)| f.words()[0])
        .collect();
    assert_eq!(hits, vec![0x00, 0x01]);

    let nearest: Vec<u64> = tree
        .nearest(&query, 3)
        .unwrap()
        .into_iter()
        .map(|(_, d)| d)
        .collect();
    assert_eq!(nearest, vec![0, 1, 2]);
}
