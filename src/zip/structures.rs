use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use crate::error::{Error, Result};

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }
}

/// End of Central Directory (EOCD) - 22 bytes minimum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(Error::archive("invalid end of central directory"));
        }

        // Skip the signature, disk numbers and the per-disk entry count
        let mut cursor = Cursor::new(&data[10..Self::SIZE]);
        Self::read_fields(&mut cursor)
            .map_err(|_| Error::archive("truncated end of central directory"))
    }

    fn read_fields(cursor: &mut Cursor<&[u8]>) -> std::io::Result<Self> {
        Ok(Self {
            total_entries: cursor.read_u16::<LittleEndian>()?,
            cd_size: cursor.read_u32::<LittleEndian>()?,
            cd_offset: cursor.read_u32::<LittleEndian>()?,
            comment_len: cursor.read_u16::<LittleEndian>()?,
        })
    }

    /// First byte past the central directory as declared by this record.
    pub fn cd_end(&self) -> u64 {
        self.cd_offset as u64 + self.cd_size as u64
    }
}

/// Central Directory File Header (CDFH) - 46 bytes minimum
pub const CDFH_SIGNATURE: &[u8] = b"PK\x01\x02";
pub const CDFH_MIN_SIZE: usize = 46;

/// Local File Header (LFH) - 30 bytes
pub const LFH_SIGNATURE: &[u8] = b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;

/// Name and local header location of one central directory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralDirectoryEntry {
    pub entry_name: String,
    pub local_header_offset: u64,
}

/// The parts of a local file header needed to slice out an entry's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalFileHeader {
    pub compression_method: CompressionMethod,
    /// Zero when the size was deferred to a data descriptor.
    pub compressed_size: u64,
    pub data_offset: u64,
}

impl LocalFileHeader {
    /// Byte range of the entry's compressed data within a buffer of `buf_len` bytes.
    ///
    /// A declared size of zero is taken to mean the data runs to the end of the
    /// buffer. This approximates the data-descriptor case without locating the
    /// descriptor record itself.
    pub fn data_range(&self, buf_len: u64) -> Result<std::ops::Range<usize>> {
        let end = if self.compressed_size == 0 {
            buf_len
        } else {
            self.data_offset + self.compressed_size
        };
        if end > buf_len {
            return Err(Error::archive("entry data extends past end of archive"));
        }
        Ok(self.data_offset as usize..end as usize)
    }
}
