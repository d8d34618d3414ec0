//! Output digests and input fingerprints.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;

use relo_common::ContentHash;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};

use crate::error::CacheError;

/// Cryptographic digest used for integrity sidecars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-256, sidecar extension `.sha256`.
    Sha256,
    /// SHA-512, sidecar extension `.sha512`.
    #[default]
    Sha512,
}

impl HashAlgorithm {
    /// File extension of the sidecar, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha512 => "sha512",
        }
    }

    /// Starts an incremental digest.
    pub fn digester(self) -> Digester {
        match self {
            HashAlgorithm::Sha256 => Digester::Sha256(Sha256::new()),
            HashAlgorithm::Sha512 => Digester::Sha512(Sha512::new()),
        }
    }

    /// Hex digest of a byte slice.
    pub fn digest_bytes(self, data: &[u8]) -> String {
        let mut d = self.digester();
        d.update(data);
        d.finish_hex()
    }

    /// Hex digest of a file's contents, read in chunks.
    pub fn digest_file(self, path: &Path) -> io::Result<String> {
        let mut file = File::open(path)?;
        let mut d = self.digester();
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            d.update(&buf[..n]);
        }
        Ok(d.finish_hex())
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(HashAlgorithm::Sha256),
            "sha512" | "sha-512" => Ok(HashAlgorithm::Sha512),
            other => Err(format!(
                "unknown hash algorithm `{other}` (expected sha256 or sha512)"
            )),
        }
    }
}

/// An in-progress digest.
#[derive(Clone)]
pub enum Digester {
    /// SHA-256 state.
    Sha256(Sha256),
    /// SHA-512 state.
    Sha512(Sha512),
}

impl Digester {
    /// Feeds bytes.
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Digester::Sha256(h) => h.update(data),
            Digester::Sha512(h) => h.update(data),
        }
    }

    /// Finishes and returns the lowercase hex digest.
    pub fn finish_hex(self) -> String {
        match self {
            Digester::Sha256(h) => hex::encode(h.finalize()),
            Digester::Sha512(h) => hex::encode(h.finalize()),
        }
    }
}

/// Fingerprints a file's contents for input stamps.
pub fn fingerprint_file(path: &Path) -> Result<ContentHash, CacheError> {
    let content = std::fs::read(path).map_err(|e| CacheError::io(path, e))?;
    Ok(ContentHash::from_bytes(&content))
}
