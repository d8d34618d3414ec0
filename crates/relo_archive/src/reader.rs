//! Archive reader.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use flate2::read::DeflateDecoder;
use flate2::Crc;

use crate::entry::Entry;
use crate::error::ArchiveError;
use crate::format::{
    le16, le32, CompressionMethod, DosDateTime, CENTRAL_HEADER_LEN, CENTRAL_HEADER_SIG, EOCD_LEN,
    EOCD_SIG, FLAG_ENCRYPTED, FLAG_UTF8, LOCAL_HEADER_LEN, LOCAL_HEADER_SIG, MAX_COMMENT_LEN,
    ZIP64_LOCATOR_LEN, ZIP64_LOCATOR_SIG,
};

/// Upper bound on the buffer reserved up front for an inflated entry.
const MAX_PREALLOC: u64 = 1 << 20;

/// Random-access reader over a ZIP container.
///
/// The central directory is decoded eagerly by [`ArchiveReader::new`]; entry
/// data is read and verified on demand.
#[derive(Debug)]
pub struct ArchiveReader<R> {
    inner: R,
    /// Start of the central directory; entry data must end before it.
    data_end: u64,
    entries: Vec<Entry>,
    by_name: HashMap<String, usize>,
}

impl ArchiveReader<BufReader<File>> {
    /// Opens the archive at `path`.
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        let file = File::open(path).map_err(|source| ArchiveError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> ArchiveReader<R> {
    /// Decodes the central directory of the archive in `inner`.
    pub fn new(mut inner: R) -> Result<Self, ArchiveError> {
        let len = inner.seek(SeekFrom::End(0))?;
        let (eocd_offset, eocd) = find_eocd(&mut inner, len)?;

        if eocd_offset >= ZIP64_LOCATOR_LEN as u64 {
            let mut sig = [0u8; 4];
            inner.seek(SeekFrom::Start(eocd_offset - ZIP64_LOCATOR_LEN as u64))?;
            inner.read_exact(&mut sig)?;
            if le32(&sig, 0) == ZIP64_LOCATOR_SIG {
                return Err(ArchiveError::unsupported("<archive>", "ZIP64"));
            }
        }

        let disk = le16(&eocd, 4);
        let cd_disk = le16(&eocd, 6);
        let count = le16(&eocd, 10);
        let cd_size = le32(&eocd, 12);
        let cd_offset = le32(&eocd, 16);
        if disk != 0 || cd_disk != 0 {
            return Err(ArchiveError::unsupported("<archive>", "multi-disk archive"));
        }
        if count == u16::MAX || cd_size == u32::MAX || cd_offset == u32::MAX {
            return Err(ArchiveError::unsupported("<archive>", "ZIP64"));
        }
        if u64::from(cd_offset) + u64::from(cd_size) > eocd_offset {
            return Err(ArchiveError::malformed(
                "central directory extends past end record",
            ));
        }

        let mut directory = vec![0u8; cd_size as usize];
        inner.seek(SeekFrom::Start(u64::from(cd_offset)))?;
        inner.read_exact(&mut directory)?;

        let mut entries = Vec::with_capacity(usize::from(count));
        let mut by_name = HashMap::with_capacity(usize::from(count));
        let mut pos = 0usize;
        for _ in 0..count {
            let (entry, next) = parse_central_header(&directory, pos)?;
            pos = next;
            by_name.insert(entry.name.clone(), entries.len());
            entries.push(entry);
        }

        Ok(Self {
            inner,
            data_end: u64::from(cd_offset),
            entries,
            by_name,
        })
    }

    /// All entries, in central directory order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the archive has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up an entry index by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Reads and verifies the uncompressed data of entry `index`.
    pub fn read(&mut self, index: usize) -> Result<Vec<u8>, ArchiveError> {
        let entry = self
            .entries
            .get(index)
            .ok_or_else(|| ArchiveError::EntryNotFound(format!("#{index}")))?;

        if entry.local_header_offset + LOCAL_HEADER_LEN as u64 > self.data_end {
            return Err(ArchiveError::malformed(format!(
                "local header of `{}` lies past the entry data",
                entry.name
            )));
        }
        let mut header = [0u8; LOCAL_HEADER_LEN];
        self.inner.seek(SeekFrom::Start(entry.local_header_offset))?;
        self.inner.read_exact(&mut header)?;
        if le32(&header, 0) != LOCAL_HEADER_SIG {
            return Err(ArchiveError::malformed(format!(
                "bad local header signature for `{}`",
                entry.name
            )));
        }
        if le16(&header, 6) & FLAG_ENCRYPTED != 0 {
            return Err(ArchiveError::unsupported(&entry.name, "encryption"));
        }
        let skip = u64::from(le16(&header, 26)) + u64::from(le16(&header, 28));
        let data_start = entry.local_header_offset + LOCAL_HEADER_LEN as u64 + skip;
        if data_start + entry.compressed_size > self.data_end {
            return Err(ArchiveError::malformed(format!(
                "data of `{}` extends past the central directory",
                entry.name
            )));
        }
        self.inner.seek(SeekFrom::Start(data_start))?;

        let mut stored = vec![0u8; entry.compressed_size as usize];
        self.inner.read_exact(&mut stored)?;

        let data = match entry.method {
            CompressionMethod::Stored => stored,
            CompressionMethod::Deflated => {
                // One byte past the recorded size is enough to detect a mismatch.
                let reserve = entry.uncompressed_size.min(MAX_PREALLOC) as usize;
                let mut out = Vec::with_capacity(reserve);
                DeflateDecoder::new(stored.as_slice())
                    .take(entry.uncompressed_size + 1)
                    .read_to_end(&mut out)?;
                out
            }
        };

        if data.len() as u64 != entry.uncompressed_size {
            return Err(ArchiveError::SizeMismatch {
                entry: entry.name.clone(),
                expected: entry.uncompressed_size,
                actual: data.len() as u64,
            });
        }
        let mut crc = Crc::new();
        crc.update(&data);
        if crc.sum() != entry.crc32 {
            return Err(ArchiveError::CrcMismatch {
                entry: entry.name.clone(),
                expected: entry.crc32,
                actual: crc.sum(),
            });
        }
        Ok(data)
    }

    /// Reads the entry called `name`.
    pub fn read_by_name(&mut self, name: &str) -> Result<Vec<u8>, ArchiveError> {
        let index = self
            .index_of(name)
            .ok_or_else(|| ArchiveError::EntryNotFound(name.to_string()))?;
        self.read(index)
    }
}

/// Locates the end of central directory record, scanning backwards over a
/// possible archive comment.
fn find_eocd<R: Read + Seek>(
    inner: &mut R,
    len: u64,
) -> Result<(u64, [u8; EOCD_LEN]), ArchiveError> {
    if len < EOCD_LEN as u64 {
        return Err(ArchiveError::malformed("file too short for an end record"));
    }
    let window = len.min((EOCD_LEN + MAX_COMMENT_LEN) as u64);
    let start = len - window;
    let mut tail = vec![0u8; window as usize];
    inner.seek(SeekFrom::Start(start))?;
    inner.read_exact(&mut tail)?;

    for pos in (0..=tail.len() - EOCD_LEN).rev() {
        if le32(&tail, pos) != EOCD_SIG {
            continue;
        }
        let comment_len = usize::from(le16(&tail, pos + 20));
        if pos + EOCD_LEN + comment_len != tail.len() {
            continue;
        }
        let mut record = [0u8; EOCD_LEN];
        record.copy_from_slice(&tail[pos..pos + EOCD_LEN]);
        return Ok((start + pos as u64, record));
    }
    Err(ArchiveError::malformed("end of central directory not found"))
}

fn parse_central_header(directory: &[u8], pos: usize) -> Result<(Entry, usize), ArchiveError> {
    if pos + CENTRAL_HEADER_LEN > directory.len() {
        return Err(ArchiveError::malformed("truncated central directory"));
    }
    let h = &directory[pos..];
    if le32(h, 0) != CENTRAL_HEADER_SIG {
        return Err(ArchiveError::malformed(format!(
            "bad central header signature at offset {pos}"
        )));
    }
    let flags = le16(h, 8);
    let method_code = le16(h, 10);
    let name_len = usize::from(le16(h, 28));
    let extra_len = usize::from(le16(h, 30));
    let comment_len = usize::from(le16(h, 32));
    let end = pos + CENTRAL_HEADER_LEN + name_len + extra_len + comment_len;
    if end > directory.len() {
        return Err(ArchiveError::malformed("truncated central directory entry"));
    }

    let raw_name = &h[CENTRAL_HEADER_LEN..CENTRAL_HEADER_LEN + name_len];
    let name = if flags & FLAG_UTF8 != 0 {
        String::from_utf8(raw_name.to_vec())
            .map_err(|_| ArchiveError::malformed("entry name is not valid UTF-8"))?
    } else {
        String::from_utf8_lossy(raw_name).into_owned()
    };

    if flags & FLAG_ENCRYPTED != 0 {
        return Err(ArchiveError::unsupported(name, "encryption"));
    }
    let method = CompressionMethod::from_code(method_code)
        .ok_or_else(|| ArchiveError::unsupported(&name, format!("compression method {method_code}")))?;

    let compressed_size = le32(h, 20);
    let uncompressed_size = le32(h, 24);
    let local_header_offset = le32(h, 42);
    if compressed_size == u32::MAX || uncompressed_size == u32::MAX || local_header_offset == u32::MAX
    {
        return Err(ArchiveError::unsupported(name, "ZIP64"));
    }

    let entry = Entry {
        name,
        method,
        modified: DosDateTime {
            time: le16(h, 12),
            date: le16(h, 14),
        },
        crc32: le32(h, 16),
        compressed_size: u64::from(compressed_size),
        uncompressed_size: u64::from(uncompressed_size),
        external_attributes: le32(h, 38),
        local_header_offset: u64::from(local_header_offset),
    };
    Ok((entry, end))
}
