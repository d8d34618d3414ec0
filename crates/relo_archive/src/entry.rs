//! Central directory entries.

use crate::format::{CompressionMethod, DosDateTime};

/// Metadata of one archive entry, as recorded in the central directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Slash-separated entry path; directories end with `/`.
    pub name: String,
    /// Storage method of the entry data.
    pub method: CompressionMethod,
    /// Last-modified timestamp.
    pub modified: DosDateTime,
    /// CRC-32 of the uncompressed data.
    pub crc32: u32,
    /// Size of the stored (possibly compressed) data.
    pub compressed_size: u64,
    /// Size of the uncompressed data.
    pub uncompressed_size: u64,
    /// Host-specific file attributes.
    pub external_attributes: u32,
    pub(crate) local_header_offset: u64,
}

impl Entry {
    /// Returns `true` for directory entries.
    pub fn is_dir(&self) -> bool {
        self.name.ends_with('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_detection() {
        let mut e = Entry {
            name: "com/acme/".into(),
            method: CompressionMethod::Stored,
            modified: DosDateTime::EPOCH,
            crc32: 0,
            compressed_size: 0,
            uncompressed_size: 0,
            external_attributes: 0,
            local_header_offset: 0,
        };
        assert!(e.is_dir());
        e.name = "com/acme/Foo.class".into();
        assert!(!e.is_dir());
    }
}
