//! Content fingerprints for cache invalidation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 128-bit content fingerprint computed using XXH3.
///
/// Fingerprints identify the *inputs* of a relocation step (archive bytes,
/// namespace, coordinates). They are not used as integrity digests for
/// outputs; those are cryptographic and live in `relo_cache`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Computes a fingerprint from a byte slice using XXH3-128.
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = xxhash_rust::xxh3::xxh3_128(data);
        Self(hash.to_le_bytes())
    }

    /// Parses the 32-character lowercase hex form produced by `Display`.
    ///
    /// Returns `None` for anything else, including surrounding whitespace.
    pub fn from_hex(text: &str) -> Option<Self> {
        if text.len() != 32 || !text.is_ascii() {
            return None;
        }
        let mut bytes = [0u8; 16];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&text[i * 2..i * 2 + 2], 16).ok()?;
        }
        Some(Self(bytes))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

/// Incremental builder for a [`ContentHash`] over several inputs.
///
/// Each field is length-prefixed before hashing so that `("ab", "c")` and
/// `("a", "bc")` produce different fingerprints.
pub struct ContentHasher {
    state: xxhash_rust::xxh3::Xxh3,
}

impl ContentHasher {
    /// Creates an empty hasher.
    pub fn new() -> Self {
        Self {
            state: xxhash_rust::xxh3::Xxh3::new(),
        }
    }

    /// Feeds one length-prefixed field.
    pub fn field(&mut self, data: &[u8]) -> &mut Self {
        self.state.update(&(data.len() as u64).to_le_bytes());
        self.state.update(data);
        self
    }

    /// Feeds one length-prefixed string field.
    pub fn str_field(&mut self, data: &str) -> &mut Self {
        self.field(data.as_bytes())
    }

    /// Feeds a previously computed fingerprint.
    pub fn hash_field(&mut self, hash: &ContentHash) -> &mut Self {
        self.field(&hash.0)
    }

    /// Returns the fingerprint of everything fed so far.
    pub fn finish(&self) -> ContentHash {
        ContentHash(self.state.digest128().to_le_bytes())
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}
