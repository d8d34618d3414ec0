//! Archive writer.

use std::collections::HashSet;
use std::io::Write;

use flate2::write::DeflateEncoder;
use flate2::{Compression, Crc};

use crate::error::ArchiveError;
use crate::format::{
    CompressionMethod, DosDateTime, CENTRAL_HEADER_SIG, DOS_DIRECTORY_ATTR, EOCD_SIG, FLAG_UTF8,
    LOCAL_HEADER_SIG, VERSION_DEFLATE, VERSION_STORED,
};

struct CentralRecord {
    name: String,
    flags: u16,
    method: CompressionMethod,
    modified: DosDateTime,
    crc32: u32,
    compressed_size: u32,
    uncompressed_size: u32,
    external_attributes: u32,
    offset: u32,
}

/// Sequential archive writer.
///
/// Entries are written in the order they are added, each fully buffered so
/// sizes and checksums are known when the local header is emitted. Call
/// [`ArchiveWriter::finish`] to append the central directory.
pub struct ArchiveWriter<W: Write> {
    inner: W,
    offset: u64,
    records: Vec<CentralRecord>,
    names: HashSet<String>,
}

impl<W: Write> ArchiveWriter<W> {
    /// Creates a writer that emits to `inner`.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            offset: 0,
            records: Vec::new(),
            names: HashSet::new(),
        }
    }

    /// Adds a directory entry. A trailing `/` is appended if missing.
    pub fn add_directory(&mut self, name: &str, modified: DosDateTime) -> Result<(), ArchiveError> {
        let name = if name.ends_with('/') {
            name.to_string()
        } else {
            format!("{name}/")
        };
        self.add_entry(name, &[], CompressionMethod::Stored, modified, DOS_DIRECTORY_ATTR)
    }

    /// Adds a file entry, compressing `data` with `method`.
    pub fn add_file(
        &mut self,
        name: &str,
        data: &[u8],
        method: CompressionMethod,
        modified: DosDateTime,
    ) -> Result<(), ArchiveError> {
        self.add_entry(name.to_string(), data, method, modified, 0)
    }

    /// Adds an entry with explicit external attributes.
    pub fn add_entry(
        &mut self,
        name: String,
        data: &[u8],
        method: CompressionMethod,
        modified: DosDateTime,
        external_attributes: u32,
    ) -> Result<(), ArchiveError> {
        if !self.names.insert(name.clone()) {
            return Err(ArchiveError::DuplicateEntry(name));
        }
        if name.len() > usize::from(u16::MAX) {
            return Err(ArchiveError::unsupported(name, "entry name longer than 65535 bytes"));
        }

        let mut crc = Crc::new();
        crc.update(data);
        let stored = match method {
            CompressionMethod::Stored => data.to_vec(),
            CompressionMethod::Deflated => {
                let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(data)?;
                encoder.finish()?
            }
        };

        let (Ok(compressed_size), Ok(uncompressed_size), Ok(offset)) = (
            u32::try_from(stored.len()),
            u32::try_from(data.len()),
            u32::try_from(self.offset),
        ) else {
            return Err(ArchiveError::unsupported(name, "ZIP64"));
        };

        let flags = if name.is_ascii() { 0 } else { FLAG_UTF8 };
        let record = CentralRecord {
            name,
            flags,
            method,
            modified,
            crc32: crc.sum(),
            compressed_size,
            uncompressed_size,
            external_attributes,
            offset,
        };

        let mut header = Vec::with_capacity(30 + record.name.len());
        header.extend_from_slice(&LOCAL_HEADER_SIG.to_le_bytes());
        header.extend_from_slice(&method.version_needed().to_le_bytes());
        header.extend_from_slice(&record.flags.to_le_bytes());
        header.extend_from_slice(&method.code().to_le_bytes());
        header.extend_from_slice(&record.modified.time.to_le_bytes());
        header.extend_from_slice(&record.modified.date.to_le_bytes());
        header.extend_from_slice(&record.crc32.to_le_bytes());
        header.extend_from_slice(&record.compressed_size.to_le_bytes());
        header.extend_from_slice(&record.uncompressed_size.to_le_bytes());
        header.extend_from_slice(&(record.name.len() as u16).to_le_bytes());
        header.extend_from_slice(&0u16.to_le_bytes());
        header.extend_from_slice(record.name.as_bytes());

        self.write(&header)?;
        self.write(&stored)?;
        self.records.push(record);
        Ok(())
    }

    /// Returns the number of entries written so far.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no entries were written.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Writes the central directory and end record, returning the sink.
    pub fn finish(mut self) -> Result<W, ArchiveError> {
        let count = u16::try_from(self.records.len())
            .map_err(|_| ArchiveError::unsupported("<archive>", "more than 65535 entries"))?;
        let cd_start = self.offset;

        let mut directory = Vec::new();
        for r in &self.records {
            let version = match r.method {
                CompressionMethod::Stored => VERSION_STORED,
                CompressionMethod::Deflated => VERSION_DEFLATE,
            };
            directory.extend_from_slice(&CENTRAL_HEADER_SIG.to_le_bytes());
            directory.extend_from_slice(&VERSION_DEFLATE.to_le_bytes());
            directory.extend_from_slice(&version.to_le_bytes());
            directory.extend_from_slice(&r.flags.to_le_bytes());
            directory.extend_from_slice(&r.method.code().to_le_bytes());
            directory.extend_from_slice(&r.modified.time.to_le_bytes());
            directory.extend_from_slice(&r.modified.date.to_le_bytes());
            directory.extend_from_slice(&r.crc32.to_le_bytes());
            directory.extend_from_slice(&r.compressed_size.to_le_bytes());
            directory.extend_from_slice(&r.uncompressed_size.to_le_bytes());
            directory.extend_from_slice(&(r.name.len() as u16).to_le_bytes());
            directory.extend_from_slice(&0u16.to_le_bytes()); // extra
            directory.extend_from_slice(&0u16.to_le_bytes()); // comment
            directory.extend_from_slice(&0u16.to_le_bytes()); // disk
            directory.extend_from_slice(&0u16.to_le_bytes()); // internal attributes
            directory.extend_from_slice(&r.external_attributes.to_le_bytes());
            directory.extend_from_slice(&r.offset.to_le_bytes());
            directory.extend_from_slice(r.name.as_bytes());
        }

        let (Ok(cd_offset), Ok(cd_size)) =
            (u32::try_from(cd_start), u32::try_from(directory.len()))
        else {
            return Err(ArchiveError::unsupported("<archive>", "ZIP64"));
        };

        let mut end = Vec::with_capacity(22);
        end.extend_from_slice(&EOCD_SIG.to_le_bytes());
        end.extend_from_slice(&0u16.to_le_bytes());
        end.extend_from_slice(&0u16.to_le_bytes());
        end.extend_from_slice(&count.to_le_bytes());
        end.extend_from_slice(&count.to_le_bytes());
        end.extend_from_slice(&cd_size.to_le_bytes());
        end.extend_from_slice(&cd_offset.to_le_bytes());
        end.extend_from_slice(&0u16.to_le_bytes());

        self.write(&directory)?;
        self.write(&end)?;
        self.inner.flush()?;
        Ok(self.inner)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), ArchiveError> {
        self.inner.write_all(bytes)?;
        self.offset += bytes.len() as u64;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::ArchiveReader;
    use std::io::Cursor;

    #[test]
    fn empty_archive_is_just_an_end_record() {
        let bytes = ArchiveWriter::new(Vec::new()).finish().unwrap();
        assert_eq!(bytes.len(), 22);
        let r = ArchiveReader::new(Cursor::new(bytes)).unwrap();
        assert!(r.is_empty());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut w = ArchiveWriter::new(Vec::new());
        w.add_file("a.txt", b"1", CompressionMethod::Stored, DosDateTime::EPOCH)
            .unwrap();
        let err = w
            .add_file("a.txt", b"2", CompressionMethod::Stored, DosDateTime::EPOCH)
            .unwrap_err();
        assert!(matches!(err, ArchiveError::DuplicateEntry(name) if name == "a.txt"));
    }

    #[test]
    fn directory_gets_trailing_slash() {
        let mut w = ArchiveWriter::new(Vec::new());
        w.add_directory("com/acme", DosDateTime::EPOCH).unwrap();
        let bytes = w.finish().unwrap();
        let r = ArchiveReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(r.entries()[0].name, "com/acme/");
        assert_eq!(r.entries()[0].external_attributes, DOS_DIRECTORY_ATTR);
    }

    #[test]
    fn deflate_shrinks_repetitive_data() {
        let data = vec![b'x'; 4096];
        let mut w = ArchiveWriter::new(Vec::new());
        w.add_file("x.txt", &data, CompressionMethod::Deflated, DosDateTime::EPOCH)
            .unwrap();
        let bytes = w.finish().unwrap();
        assert!(bytes.len() < 1024);

        let mut r = ArchiveReader::new(Cursor::new(bytes)).unwrap();
        let entry = &r.entries()[0];
        assert_eq!(entry.method, CompressionMethod::Deflated);
        assert_eq!(entry.uncompressed_size, 4096);
        assert_eq!(r.read(0).unwrap(), data);
    }

    #[test]
    fn utf8_names_survive() {
        let mut w = ArchiveWriter::new(Vec::new());
        w.add_file("données/é.txt", b"ok", CompressionMethod::Stored, DosDateTime::EPOCH)
            .unwrap();
        let bytes = w.finish().unwrap();
        let r = ArchiveReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(r.entries()[0].name, "données/é.txt");
    }

    #[test]
    fn rewrite_preserves_entry_metadata() {
        let when = DosDateTime::from_parts(2019, 11, 2, 8, 30, 10);
        let mut w = ArchiveWriter::new(Vec::new());
        w.add_file("res/a.properties", b"k=v\n", CompressionMethod::Deflated, when)
            .unwrap();
        w.add_file("res/b.bin", &[0, 1, 2], CompressionMethod::Stored, when)
            .unwrap();
        let original = w.finish().unwrap();

        let mut r = ArchiveReader::new(Cursor::new(original)).unwrap();
        let entries = r.entries().to_vec();
        let mut copy = ArchiveWriter::new(Vec::new());
        for (i, e) in entries.iter().enumerate() {
            let data = r.read(i).unwrap();
            copy.add_entry(e.name.clone(), &data, e.method, e.modified, e.external_attributes)
                .unwrap();
        }
        let rebuilt = copy.finish().unwrap();
        let r2 = ArchiveReader::new(Cursor::new(rebuilt)).unwrap();
        assert_eq!(r2.entries(), entries.as_slice());
    }
}
