//! # CLI Module
//!
//! Command-line interface for fingerprinting and similarity search.
//!
//! ## Usage
//! ```bash
//! # Fingerprint every image under a directory, one canonical line each
//! fp-index hash ~/Photos --out fingerprints.txt
//!
//! # Find stored fingerprints near a query image
//! fp-index search fingerprints.txt --image query.jpg --radius 5
//! fp-index search fingerprints.txt --image query.jpg -k 10
//!
//! # Compare two images directly
//! fp-index match a.jpg b.jpg --mode normal
//! ```

use image_fingerprint::core::fingerprint::Fingerprint;
use image_fingerprint::core::hasher::{DifferenceHasher, HashAlgorithm, HasherConfig, MatchMode};
use image_fingerprint::core::index::VpTree;
use image_fingerprint::core::pipeline::{CollectionSink, DirectorySource, HashingPipeline};
use image_fingerprint::error::{ConfigError, Error, ImageError, ParseError, Result};
use image_fingerprint::events::{Event, EventChannel, HashEvent};
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

/// Perceptual image fingerprints with fast similarity search
#[derive(Parser, Debug)]
#[command(name = "fp-index")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fingerprint every image under the given directories
    Hash {
        /// Directories to scan
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Hash grid side length (output is side² bits)
        #[arg(short, long, default_value = "8")]
        side: u32,

        /// Worker pool width
        #[arg(short, long, default_value = "15")]
        workers: usize,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,

        /// Write fingerprint lines to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Search a fingerprint file for entries near a query image
    Search {
        /// File of canonical fingerprint lines (from `hash`)
        index: PathBuf,

        /// Query image
        #[arg(short, long)]
        image: PathBuf,

        /// Return everything within this Hamming distance
        #[arg(short, long, conflicts_with = "k")]
        radius: Option<u64>,

        /// Return the k nearest entries
        #[arg(short)]
        k: Option<usize>,
    },

    /// Compare two images under a match tolerance
    Match {
        a: PathBuf,
        b: PathBuf,

        /// Match tolerance
        #[arg(short, long, default_value = "normal")]
        mode: Mode,

        /// Hash grid side length
        #[arg(short, long, default_value = "8")]
        side: u32,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable summary plus fingerprint lines
    Pretty,
    /// JSON for scripting
    Json,
    /// Fingerprint lines only
    Lines,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Exact,
    Strict,
    Normal,
    Sloppy,
}

impl From<Mode> for MatchMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Exact => MatchMode::Exact,
            Mode::Strict => MatchMode::Strict,
            Mode::Normal => MatchMode::Normal,
            Mode::Sloppy => MatchMode::Sloppy,
        }
    }
}

/// Entry point called by main
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Hash {
            paths,
            side,
            workers,
            output,
            out,
        } => cmd_hash(paths, side, workers, output, out),
        Commands::Search {
            index,
            image,
            radius,
            k,
        } => cmd_search(index, image, radius, k),
        Commands::Match { a, b, mode, side } => cmd_match(a, b, mode.into(), side),
    }
}

fn cmd_hash(
    paths: Vec<PathBuf>,
    side: u32,
    workers: usize,
    output: OutputFormat,
    out: Option<PathBuf>,
) -> Result<()> {
    let sink = Arc::new(CollectionSink::new());
    let mut total_errors = Vec::new();

    for path in &paths {
        let source = DirectorySource::new(path)?;
        let total = source.remaining();

        let pipeline = HashingPipeline::builder()
            .source(source)
            .hasher(HasherConfig::new().side(side).build()?)
            .sink(sink.clone())
            .workers(workers)
            .build()?;

        let (sender, receiver) = EventChannel::new();
        let progress = match output {
            OutputFormat::Pretty => {
                let bar = ProgressBar::new(total as u64);
                bar.set_style(
                    ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_bar()),
                );
                Some(bar)
            }
            _ => None,
        };

        let reporter = {
            let progress = progress.clone();
            thread::spawn(move || {
                for event in receiver.iter() {
                    if let Event::Hash(HashEvent::Hashed { .. } | HashEvent::Error { .. }) = event {
                        if let Some(bar) = &progress {
                            bar.inc(1);
                        }
                    }
                }
            })
        };

        let result = pipeline.run_with_events(&sender)?;
        drop(sender);
        let _ = reporter.join();
        if let Some(bar) = progress {
            bar.finish_and_clear();
        }
        total_errors.extend(result.errors);
    }

    // No cross-worker ordering exists, so impose the canonical one.
    let mut fingerprints = sink.take();
    fingerprints.sort();

    let lines: Vec<String> = fingerprints.iter().map(ToString::to_string).collect();

    if let Some(out) = &out {
        let mut file = fs::File::create(out).map_err(|e| {
            Error::Image(ImageError::Io {
                path: out.clone(),
                source: e,
            })
        })?;
        for line in &lines {
            let _ = writeln!(file, "{line}");
        }
    }

    match output {
        OutputFormat::Lines => {
            if out.is_none() {
                for line in &lines {
                    println!("{line}");
                }
            }
        }
        OutputFormat::Json => {
            let report = serde_json::json!({
                "hashed": lines.len(),
                "errors": total_errors,
                "fingerprints": lines,
            });
            println!("{report}");
        }
        OutputFormat::Pretty => {
            if out.is_none() {
                for line in &lines {
                    println!("{line}");
                }
            }
            eprintln!(
                "{} {} fingerprints, {} errors",
                style("done:").green().bold(),
                lines.len(),
                total_errors.len()
            );
            for error in &total_errors {
                eprintln!("  {} {error}", style("error:").red());
            }
        }
    }
    Ok(())
}

fn cmd_search(
    index: PathBuf,
    image: PathBuf,
    radius: Option<u64>,
    k: Option<usize>,
) -> Result<()> {
    let entries = load_fingerprint_lines(&index)?;
    if entries.is_empty() {
        eprintln!("{} index file is empty", style("note:").yellow());
        return Ok(());
    }

    let hasher = hasher_for(&entries[0])?;
    let query = hasher.hash_file(&image)?;
    let tree = VpTree::build(entries);

    let hits: Vec<(String, u64)> = match (radius, k) {
        (Some(radius), _) => tree
            .within(&query, radius)
            .into_iter()
            .map(|(f, d)| (f.to_string(), d))
            .collect(),
        (None, k) => tree
            .nearest(&query, k.unwrap_or(10))
            .map_err(Error::Query)?
            .into_iter()
            .map(|(f, d)| (f.to_string(), d))
            .collect(),
    };

    for (line, distance) in &hits {
        println!("{distance}\t{line}");
    }
    eprintln!(
        "{} {} of {} entries",
        style("matched:").green().bold(),
        hits.len(),
        tree.len()
    );
    Ok(())
}

fn cmd_match(a: PathBuf, b: PathBuf, mode: MatchMode, side: u32) -> Result<()> {
    let hasher = DifferenceHasher::new(side).map_err(Error::Config)?;
    let fa = hasher.hash_file(&a).map_err(Error::Image)?;
    let fb = hasher.hash_file(&b).map_err(Error::Image)?;

    let distance = fa.distance(&fb).map_err(Error::Fingerprint)?;
    let percent = fa.percent_distance(&fb).map_err(Error::Fingerprint)?;
    let matched = hasher.matches(&fa, &fb, mode).map_err(Error::Fingerprint)?;

    println!(
        "distance {} ({:.1}% of {} bits): {}",
        distance,
        percent * 100.0,
        fa.bit_length(),
        if matched {
            style("match").green().bold()
        } else {
            style("no match").red().bold()
        }
    );

    if !matched {
        std::process::exit(1);
    }
    Ok(())
}

/// Parse a file of canonical fingerprint lines; blank lines are skipped,
/// anything else malformed is an error naming the line number.
fn load_fingerprint_lines(path: &PathBuf) -> Result<Vec<Fingerprint>> {
    let text = fs::read_to_string(path).map_err(|e| {
        Error::Image(ImageError::Io {
            path: path.clone(),
            source: e,
        })
    })?;

    let mut entries = Vec::new();
    for (number, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fingerprint: Fingerprint = line.parse().map_err(|e: ParseError| {
            tracing::warn!(line = number + 1, "bad fingerprint line");
            Error::Parse(e)
        })?;
        entries.push(fingerprint);
    }
    Ok(entries)
}

/// Rebuild a hasher matching the index entries: the side length is implied
/// by the stored bit length.
fn hasher_for(entry: &Fingerprint) -> Result<DifferenceHasher> {
    let bits = entry.bit_length();
    let side = (f64::from(bits)).sqrt().round() as u32;
    if side * side != bits {
        return Err(Error::Config(ConfigError::Malformed {
            text: bits.to_string(),
            reason: "stored bit length is not a square".to_string(),
        }));
    }
    DifferenceHasher::new(side).map_err(Error::Config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_maps_onto_match_mode() {
        assert_eq!(MatchMode::from(Mode::Exact), MatchMode::Exact);
        assert_eq!(MatchMode::from(Mode::Sloppy), MatchMode::Sloppy);
    }

    #[test]
    fn hasher_for_derives_side_from_bit_length() {
        let entry = Fingerprint::new("dHash", vec![0, 0, 0, 0], 256).unwrap();
        let hasher = hasher_for(&entry).unwrap();
        assert_eq!(hasher.side(), 16);
    }

    #[test]
    fn hasher_for_rejects_non_square_lengths() {
        let entry = Fingerprint::new("dHash", vec![0, 0], 96).unwrap();
        assert!(hasher_for(&entry).is_err());
    }

    #[test]
    fn load_rejects_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.txt");
        fs::write(&path, "dHash,64,0000000000000000,a.png\nnot a line\n").unwrap();
        assert!(load_fingerprint_lines(&path).is_err());
    }

    #[test]
    fn load_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.txt");
        fs::write(&path, "dHash,64,0000000000000000,a.png\n\n").unwrap();
        let entries = load_fingerprint_lines(&path).unwrap();
        assert_eq!(entries.len(), 1);
    }
}
