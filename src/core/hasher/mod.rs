//! # Hasher Module
//!
//! Computes content fingerprints for deduplication.
//!
//! A fingerprint is the lowercase hex SHA-256 of the file's full byte
//! content. Two files with the same fingerprint are treated as the same
//! photo, wherever they live in the tree.
//!
//! ## Example
//! ```rust,ignore
//! use photo_bucket::core::hasher::fingerprint_file;
//!
//! let fingerprint = fingerprint_file(&path)?;
//! println!("{}", fingerprint);
//! ```

use crate::error::ProcessError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

/// Hex-encoded SHA-256 digest of a file's content
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// The hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_digest(hasher: Sha256) -> Self {
        Fingerprint(format!("{:x}", hasher.finalize()))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprint an in-memory buffer
pub fn fingerprint_bytes(bytes: &[u8]) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    Fingerprint::from_digest(hasher)
}

/// Fingerprint a file by streaming its content through the digest.
///
/// Produces the same value as `fingerprint_bytes` over the whole file
/// without holding it in memory.
pub fn fingerprint_file(path: &Path) -> Result<Fingerprint, ProcessError> {
    let to_error = |source: io::Error| ProcessError::Fingerprint {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(to_error)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher).map_err(to_error)?;

    Ok(Fingerprint::from_digest(hasher))
}
