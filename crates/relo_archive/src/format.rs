//! On-disk constants and small value types of the ZIP container format.

/// Local file header signature (`PK\x03\x04`).
pub(crate) const LOCAL_HEADER_SIG: u32 = 0x0403_4b50;
/// Central directory file header signature (`PK\x01\x02`).
pub(crate) const CENTRAL_HEADER_SIG: u32 = 0x0201_4b50;
/// End of central directory record signature (`PK\x05\x06`).
pub(crate) const EOCD_SIG: u32 = 0x0605_4b50;
/// ZIP64 end of central directory locator signature (`PK\x06\x07`).
pub(crate) const ZIP64_LOCATOR_SIG: u32 = 0x0706_4b50;

/// Fixed part of a local file header.
pub(crate) const LOCAL_HEADER_LEN: usize = 30;
/// Fixed part of a central directory header.
pub(crate) const CENTRAL_HEADER_LEN: usize = 46;
/// Fixed part of the end of central directory record.
pub(crate) const EOCD_LEN: usize = 22;
/// Size of the ZIP64 end of central directory locator.
pub(crate) const ZIP64_LOCATOR_LEN: usize = 20;
/// Largest possible archive comment.
pub(crate) const MAX_COMMENT_LEN: usize = u16::MAX as usize;

/// General purpose flag: entry is encrypted.
pub(crate) const FLAG_ENCRYPTED: u16 = 1 << 0;
/// General purpose flag: name is UTF-8.
pub(crate) const FLAG_UTF8: u16 = 1 << 11;

/// "Version needed to extract" for stored entries and directories.
pub(crate) const VERSION_STORED: u16 = 10;
/// "Version needed to extract" for deflated entries.
pub(crate) const VERSION_DEFLATE: u16 = 20;

/// MS-DOS directory attribute, stored in the external attributes.
pub(crate) const DOS_DIRECTORY_ATTR: u32 = 0x10;

/// How an entry's bytes are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionMethod {
    /// No compression (method 0).
    Stored,
    /// Raw deflate (method 8).
    Deflated,
}

impl CompressionMethod {
    /// Decodes a method code.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(Self::Stored),
            8 => Some(Self::Deflated),
            _ => None,
        }
    }

    /// Returns the on-disk method code.
    pub fn code(self) -> u16 {
        match self {
            Self::Stored => 0,
            Self::Deflated => 8,
        }
    }

    pub(crate) fn version_needed(self) -> u16 {
        match self {
            Self::Stored => VERSION_STORED,
            Self::Deflated => VERSION_DEFLATE,
        }
    }
}

/// An MS-DOS packed date and time, as stored in ZIP headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DosDateTime {
    /// Packed time: hour << 11 | minute << 5 | second / 2.
    pub time: u16,
    /// Packed date: (year - 1980) << 9 | month << 5 | day.
    pub date: u16,
}

impl DosDateTime {
    /// 1980-01-01 00:00:00, the earliest representable timestamp.
    pub const EPOCH: DosDateTime = DosDateTime {
        time: 0,
        date: (1 << 5) | 1,
    };

    /// Packs calendar fields. Values outside the DOS range are clamped.
    pub fn from_parts(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        let year = year.clamp(1980, 2107) - 1980;
        let month = u16::from(month.clamp(1, 12));
        let day = u16::from(day.clamp(1, 31));
        let hour = u16::from(hour.min(23));
        let minute = u16::from(minute.min(59));
        let second = u16::from(second.min(59)) / 2;
        Self {
            time: (hour << 11) | (minute << 5) | second,
            date: (year << 9) | (month << 5) | day,
        }
    }

    /// Returns `(year, month, day)`.
    pub fn ymd(self) -> (u16, u8, u8) {
        (
            1980 + (self.date >> 9),
            ((self.date >> 5) & 0x0f) as u8,
            (self.date & 0x1f) as u8,
        )
    }
}

impl Default for DosDateTime {
    fn default() -> Self {
        Self::EPOCH
    }
}

pub(crate) fn le16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

pub(crate) fn le32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_codes() {
        assert_eq!(CompressionMethod::from_code(0), Some(CompressionMethod::Stored));
        assert_eq!(CompressionMethod::from_code(8), Some(CompressionMethod::Deflated));
        assert_eq!(CompressionMethod::from_code(12), None);
        assert_eq!(CompressionMethod::Deflated.code(), 8);
    }

    #[test]
    fn dos_date_packing() {
        let t = DosDateTime::from_parts(2024, 3, 15, 13, 45, 30);
        assert_eq!(t.ymd(), (2024, 3, 15));
        assert_eq!(t.time >> 11, 13);
        assert_eq!((t.time >> 5) & 0x3f, 45);
        assert_eq!((t.time & 0x1f) * 2, 30);
    }

    #[test]
    fn epoch_is_1980() {
        assert_eq!(DosDateTime::EPOCH.ymd(), (1980, 1, 1));
        assert_eq!(DosDateTime::default(), DosDateTime::EPOCH);
    }

    #[test]
    fn little_endian_helpers() {
        let buf = [0x50, 0x4b, 0x03, 0x04];
        assert_eq!(le16(&buf, 0), 0x4b50);
        assert_eq!(le32(&buf, 0), LOCAL_HEADER_SIG);
    }
}
