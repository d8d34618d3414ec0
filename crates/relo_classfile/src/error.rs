//! Error types for class-file decoding and rewriting.

/// Errors produced while parsing, rewriting or serializing a class file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassFileError {
    /// The input ended before a structure was complete.
    #[error("truncated class file: needed {needed} bytes at offset {offset}")]
    Truncated {
        /// Offset at which the read started.
        offset: usize,
        /// Number of bytes requested.
        needed: usize,
    },

    /// The file does not start with `0xCAFEBABE`.
    #[error("bad magic number {0:#010x}")]
    BadMagic(u32),

    /// A constant-pool entry has an unknown tag.
    #[error("unknown constant tag {tag} at pool index {index}")]
    BadConstantTag {
        /// Pool index of the entry.
        index: u16,
        /// The unknown tag byte.
        tag: u8,
    },

    /// A pool index is out of range or refers to the wrong kind of entry.
    #[error("constant pool index {index} is not a valid {expected} entry")]
    BadConstantIndex {
        /// The offending index.
        index: u16,
        /// The kind of entry that was expected.
        expected: &'static str,
    },

    /// A `Utf8` constant is not valid modified UTF-8.
    #[error("constant pool index {index} is not valid modified UTF-8")]
    InvalidUtf8 {
        /// Pool index of the entry.
        index: u16,
    },

    /// A descriptor could not be parsed.
    #[error("malformed descriptor `{descriptor}`: {reason}")]
    BadDescriptor {
        /// The descriptor text.
        descriptor: String,
        /// What was wrong.
        reason: String,
    },

    /// Appending constants would exceed the 65535-slot limit.
    #[error("constant pool overflow: more than 65535 slots required")]
    PoolOverflow,

    /// An attribute's contents are inconsistent with its declared structure.
    #[error("malformed `{attribute}` attribute: {reason}")]
    BadAttribute {
        /// Attribute name.
        attribute: String,
        /// What was wrong.
        reason: String,
    },

    /// Extra bytes follow the end of the class structure.
    #[error("{0} trailing bytes after class file")]
    TrailingBytes(usize),
}
