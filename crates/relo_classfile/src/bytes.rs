//! Big-endian cursor over class-file bytes.

use crate::error::ClassFileError;

/// A bounds-checked big-endian reader.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a reader positioned at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Reads `n` bytes.
    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8], ClassFileError> {
        if self.remaining() < n {
            return Err(ClassFileError::Truncated {
                offset: self.pos,
                needed: n,
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Reads one byte.
    pub fn u8(&mut self) -> Result<u8, ClassFileError> {
        Ok(self.bytes(1)?[0])
    }

    /// Reads a big-endian `u16`.
    pub fn u16(&mut self) -> Result<u16, ClassFileError> {
        let b = self.bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    /// Reads a big-endian `u32`.
    pub fn u32(&mut self) -> Result<u32, ClassFileError> {
        let b = self.bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Reads a big-endian `u64`.
    pub fn u64(&mut self) -> Result<u64, ClassFileError> {
        let hi = self.u32()?;
        let lo = self.u32()?;
        Ok((u64::from(hi) << 32) | u64::from(lo))
    }

    /// Advances past `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<(), ClassFileError> {
        self.bytes(n).map(|_| ())
    }
}

/// Reads a big-endian `u16` at `at` in a mutable attribute body.
pub(crate) fn get_u16(buf: &[u8], at: usize) -> Result<u16, ClassFileError> {
    match buf.get(at..at + 2) {
        Some(b) => Ok(u16::from_be_bytes([b[0], b[1]])),
        None => Err(ClassFileError::Truncated {
            offset: at,
            needed: 2,
        }),
    }
}

/// Overwrites the big-endian `u16` at `at`.
pub(crate) fn put_u16(buf: &mut [u8], at: usize, value: u16) -> Result<(), ClassFileError> {
    match buf.get_mut(at..at + 2) {
        Some(b) => {
            b.copy_from_slice(&value.to_be_bytes());
            Ok(())
        }
        None => Err(ClassFileError::Truncated {
            offset: at,
            needed: 2,
        }),
    }
}

/// Reads a big-endian `u32` at `at`.
pub(crate) fn get_u32(buf: &[u8], at: usize) -> Result<u32, ClassFileError> {
    match buf.get(at..at + 4) {
        Some(b) => Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]])),
        None => Err(ClassFileError::Truncated {
            offset: at,
            needed: 4,
        }),
    }
}
