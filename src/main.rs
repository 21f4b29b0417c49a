//! # fp-index CLI
//!
//! Command-line interface for image fingerprinting and similarity search.
//!
//! ## Usage
//! ```bash
//! fp-index hash ~/Photos --out fingerprints.txt
//! fp-index search fingerprints.txt --image query.jpg --radius 5
//! fp-index match a.jpg b.jpg --mode strict
//! ```

mod cli;

use image_fingerprint::Result;

fn main() -> Result<()> {
    image_fingerprint::init_tracing();
    cli::run()
}
