//! Up-to-date checks for generated outputs.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use relo_common::ContentHash;

use crate::digest::HashAlgorithm;
use crate::error::CacheError;
use crate::staged::StagedOutput;
use crate::stamp::{append_extension, InputStamp};

/// Result of an up-to-date check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// The target, its sidecar and its stamp all agree; nothing to do.
    UpToDate,
    /// The target must be regenerated.
    Stale(StaleReason),
}

impl Freshness {
    /// Returns `true` for [`Freshness::UpToDate`].
    pub fn is_up_to_date(self) -> bool {
        self == Freshness::UpToDate
    }
}

/// Why a target must be regenerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    /// The target file does not exist or cannot be read.
    MissingOutput,
    /// The digest sidecar is missing or unreadable.
    MissingRecord,
    /// The input stamp is missing or records different inputs.
    InputsChanged,
    /// The target's digest differs from its sidecar.
    DigestMismatch,
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StaleReason::MissingOutput => "output missing",
            StaleReason::MissingRecord => "integrity record missing",
            StaleReason::InputsChanged => "inputs changed",
            StaleReason::DigestMismatch => "output digest mismatch",
        })
    }
}

/// Integrity-record discipline for one output repository.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegrityCache {
    algorithm: HashAlgorithm,
}

impl IntegrityCache {
    /// Creates a cache using `algorithm` for sidecars.
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    /// The sidecar digest algorithm.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Path of the digest sidecar belonging to `target`.
    pub fn sidecar_path(&self, target: &Path) -> PathBuf {
        append_extension(target, self.algorithm.extension())
    }

    /// Checks whether `target` was completely written from inputs with the
    /// given fingerprint. Never fails: any I/O problem makes the target stale.
    pub fn check(&self, target: &Path, fingerprint: &ContentHash) -> Freshness {
        let freshness = self.check_inner(target, fingerprint);
        if let Freshness::Stale(reason) = freshness {
            tracing::debug!(path = %target.display(), %reason, "output is stale");
        }
        freshness
    }

    fn check_inner(&self, target: &Path, fingerprint: &ContentHash) -> Freshness {
        if !target.is_file() {
            return Freshness::Stale(StaleReason::MissingOutput);
        }
        let recorded = match std::fs::read_to_string(self.sidecar_path(target)) {
            Ok(text) => text.trim().to_ascii_lowercase(),
            Err(_) => return Freshness::Stale(StaleReason::MissingRecord),
        };
        match InputStamp::load(target) {
            Some(stamp) if stamp.matches(fingerprint) => {}
            _ => return Freshness::Stale(StaleReason::InputsChanged),
        }
        match self.algorithm.digest_file(target) {
            Ok(actual) if actual == recorded => Freshness::UpToDate,
            Ok(_) => Freshness::Stale(StaleReason::DigestMismatch),
            Err(_) => Freshness::Stale(StaleReason::MissingOutput),
        }
    }

    /// Starts a staged write of `target`.
    pub fn stage(&self, target: &Path) -> Result<StagedOutput, CacheError> {
        StagedOutput::create(target, self.algorithm)
    }

    /// Writes `data` to `target` and records its integrity sidecar and stamp.
    pub fn write(
        &self,
        target: &Path,
        data: &[u8],
        fingerprint: &ContentHash,
    ) -> Result<String, CacheError> {
        let mut staged = self.stage(target)?;
        staged
            .write_all(data)
            .map_err(|e| CacheError::io(target, e))?;
        staged.commit(fingerprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, IntegrityCache, PathBuf, ContentHash) {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("g/a/1.0/a-1.0.jar");
        (
            dir,
            IntegrityCache::new(HashAlgorithm::Sha512),
            target,
            ContentHash::from_bytes(b"inputs"),
        )
    }

    #[test]
    fn missing_output_is_stale() {
        let (_dir, cache, target, fp) = setup();
        assert_eq!(
            cache.check(&target, &fp),
            Freshness::Stale(StaleReason::MissingOutput)
        );
    }

    #[test]
    fn written_output_is_up_to_date() {
        let (_dir, cache, target, fp) = setup();
        cache.write(&target, b"jar bytes", &fp).unwrap();
        assert!(cache.check(&target, &fp).is_up_to_date());
        assert!(cache.sidecar_path(&target).ends_with("a-1.0.jar.sha512"));
    }

    #[test]
    fn changed_inputs_are_stale() {
        let (_dir, cache, target, fp) = setup();
        cache.write(&target, b"jar bytes", &fp).unwrap();
        let other = ContentHash::from_bytes(b"other inputs");
        assert_eq!(
            cache.check(&target, &other),
            Freshness::Stale(StaleReason::InputsChanged)
        );
    }

    #[test]
    fn tampered_output_is_stale() {
        let (_dir, cache, target, fp) = setup();
        cache.write(&target, b"jar bytes", &fp).unwrap();
        std::fs::write(&target, b"truncated").unwrap();
        assert_eq!(
            cache.check(&target, &fp),
            Freshness::Stale(StaleReason::DigestMismatch)
        );
    }

    #[test]
    fn missing_sidecar_is_stale() {
        let (_dir, cache, target, fp) = setup();
        cache.write(&target, b"jar bytes", &fp).unwrap();
        std::fs::remove_file(cache.sidecar_path(&target)).unwrap();
        assert_eq!(
            cache.check(&target, &fp),
            Freshness::Stale(StaleReason::MissingRecord)
        );
    }

    #[test]
    fn unreadable_sidecar_is_stale_not_an_error() {
        let (_dir, cache, target, fp) = setup();
        cache.write(&target, b"jar bytes", &fp).unwrap();
        let sidecar = cache.sidecar_path(&target);
        std::fs::remove_file(&sidecar).unwrap();
        std::fs::create_dir(&sidecar).unwrap();
        assert!(!cache.check(&target, &fp).is_up_to_date());
    }

    #[test]
    fn other_algorithm_does_not_see_record() {
        let (_dir, cache, target, fp) = setup();
        cache.write(&target, b"jar bytes", &fp).unwrap();
        let sha256 = IntegrityCache::new(HashAlgorithm::Sha256);
        assert_eq!(
            sha256.check(&target, &fp),
            Freshness::Stale(StaleReason::MissingRecord)
        );
    }

    #[test]
    fn stale_reason_display() {
        assert_eq!(StaleReason::InputsChanged.to_string(), "inputs changed");
    }
}
