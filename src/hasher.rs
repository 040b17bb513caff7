//! Content hashing utilities.
//!
//! This module provides [`ContentHasher`], which computes stable SHA-256
//! digests. Backends use them to shorten over-long object file names, and
//! the output writer compares digests to leave unchanged build files alone.
//!
//! # Examples
//!
//! ```
//! use kiln::hasher::ContentHasher;
//!
//! let digest = ContentHasher::digest_parts(["a", "bc"]);
//! assert_ne!(digest, ContentHasher::digest_parts(["ab", "c"]));
//! ```

use sha2::{Digest, Sha256};

/// Computes stable digests for generated content.
pub struct ContentHasher;

impl ContentHasher {
    /// Hex digest of raw bytes.
    #[must_use]
    pub fn digest(content: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content);
        format!("{:x}", hasher.finalize())
    }

    /// Hex digest of a sequence of strings.
    ///
    /// Every part is length-prefixed so `["a", "bc"]` and `["ab", "c"]`
    /// hash differently.
    #[must_use]
    pub fn digest_parts<'a, I>(parts: I) -> String
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut hasher = Sha256::new();
        for part in parts {
            Self::update_with_len(&mut hasher, part.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }

    /// The first `len` hex characters of the digest of `name`.
    #[must_use]
    pub fn short(name: &str, len: usize) -> String {
        Self::digest_parts([name]).chars().take(len).collect()
    }

    fn update_with_len(hasher: &mut Sha256, bytes: &[u8]) {
        let len = bytes.len();
        hasher.update(format!("{len}:").as_bytes());
        hasher.update(bytes);
    }
}
