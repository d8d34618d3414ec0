//! JAR/ZIP container codec.
//!
//! Reads the end-of-central-directory record, the central directory and each
//! entry's local header; writes archives with known sizes up front. Only the
//! `stored` and `deflate` methods are supported, which covers every JAR
//! produced by the standard JDK tooling.

#![warn(missing_docs)]

pub mod entry;
pub mod error;
pub mod format;
pub mod reader;
pub mod writer;

pub use entry::Entry;
pub use error::ArchiveError;
pub use format::{CompressionMethod, DosDateTime};
pub use reader::ArchiveReader;
pub use writer::ArchiveWriter;
