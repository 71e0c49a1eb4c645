//! # photo-bucket CLI
//!
//! Command-line interface for the photo bucket sorter.
//!
//! ## Usage
//! ```bash
//! photo-bucket ~/Pictures/inbox ~/Pictures/sorted
//! photo-bucket ~/Pictures/inbox ~/Pictures/sorted --threads 4 --output json
//! ```

mod cli;

use photo_bucket::Result;

fn main() -> Result<()> {
    cli::run()
}
