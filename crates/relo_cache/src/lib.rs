//! Integrity records and staged writes for relocated artifacts.
//!
//! Every generated file gets two companions: a `.sha256`/`.sha512` sidecar
//! holding the digest of the file as written, and an `.inputs` stamp holding
//! the fingerprint of everything that produced it. A target is up to date only
//! when both agree with the current state. Outputs are staged in a temporary
//! file next to the target and renamed into place, so a failed or interrupted
//! write never leaves a validated partial file behind.

#![warn(missing_docs)]

pub mod cache;
pub mod digest;
pub mod error;
pub mod staged;
pub mod stamp;

pub use cache::{Freshness, IntegrityCache, StaleReason};
pub use digest::HashAlgorithm;
pub use error::CacheError;
pub use staged::StagedOutput;
pub use stamp::InputStamp;
