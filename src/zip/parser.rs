//! Low-level ZIP archive parser.
//!
//! This module handles the binary parsing of ZIP file structures from an
//! in-memory buffer.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD) near the buffer's end
//! 2. Walk the Central Directory to find the wanted entry's name
//! 3. Read that entry's Local File Header to find where its data begins

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;
use tracing::debug;

use crate::error::{Error, Result};

use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: usize = 65535;

/// Low-level ZIP parser over a borrowed byte buffer.
///
/// ## Example
///
/// ```ignore
/// let parser = ZipParser::new(&bytes);
/// let entry = parser.find_entry("word/document.xml")?;
/// let header = parser.read_local_header(entry.local_header_offset)?;
/// ```
pub struct ZipParser<'a> {
    data: &'a [u8],
}

impl<'a> ZipParser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Locate the End of Central Directory record.
    ///
    /// Scans backwards from `len - 22` over at most one maximal comment's
    /// worth of bytes. The first signature met from the tail wins, so a
    /// comment that happens to contain the signature shadows the real record;
    /// [`central_directory`](Self::central_directory) guards against that.
    ///
    /// Returns `None` when the buffer holds no EOCD signature in range.
    pub fn locate_end_of_central_directory(&self) -> Option<u64> {
        let last = self.data.len().checked_sub(EndOfCentralDirectory::SIZE)?;
        let first = last.saturating_sub(MAX_COMMENT_SIZE + 1);

        (first..=last)
            .rev()
            .find(|&i| &self.data[i..i + 4] == EndOfCentralDirectory::SIGNATURE)
            .map(|i| i as u64)
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// # Returns
    ///
    /// A tuple of (EOCD record, offset of EOCD in buffer).
    pub fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64)> {
        let offset = self
            .locate_end_of_central_directory()
            .ok_or_else(|| Error::archive("end of central directory not found"))?;
        let eocd = EndOfCentralDirectory::from_bytes(&self.data[offset as usize..])?;
        debug!(
            offset,
            entries = eocd.total_entries,
            cd_offset = eocd.cd_offset,
            cd_size = eocd.cd_size,
            "found end of central directory"
        );
        Ok((eocd, offset))
    }

    /// Walk the Central Directory described by `eocd`.
    ///
    /// The walk stops at whichever comes first: the declared entry count, the
    /// declared end of the directory, or a record whose signature does not
    /// match. Records after a mismatch are never parsed.
    pub fn central_directory(&self, eocd: &EndOfCentralDirectory) -> Vec<CentralDirectoryEntry> {
        let start = eocd.cd_offset as usize;
        let end = (eocd.cd_end() as usize).min(self.data.len());
        if start >= end {
            return Vec::new();
        }

        let directory = &self.data[start..end];
        let mut entries = Vec::with_capacity(eocd.total_entries as usize);
        let mut pos = 0usize;

        for index in 0..eocd.total_entries {
            match parse_cdfh(&directory[pos..]) {
                Some((entry, record_len)) => {
                    entries.push(entry);
                    pos += record_len;
                }
                None => {
                    debug!(index, offset = start + pos, "central directory walk stopped");
                    break;
                }
            }
        }

        entries
    }

    /// Find the central directory record for `name`.
    pub fn find_entry(&self, name: &str) -> Result<CentralDirectoryEntry> {
        let (eocd, _) = self.find_eocd()?;
        self.central_directory(&eocd)
            .into_iter()
            .find(|e| e.entry_name == name)
            .ok_or_else(|| Error::EntryNotFound(name.to_string()))
    }

    /// Read the Local File Header at `offset`.
    ///
    /// The header's name and extra field lengths may differ from the Central
    /// Directory copy, so the data offset is computed from this header.
    pub fn read_local_header(&self, offset: u64) -> Result<LocalFileHeader> {
        let start = offset as usize;
        let header = self
            .data
            .get(start..start.saturating_add(LFH_SIZE))
            .ok_or_else(|| Error::archive("local file header out of bounds"))?;

        // Verify LFH signature (PK\x03\x04)
        if &header[0..4] != LFH_SIGNATURE {
            return Err(Error::archive("local header signature mismatch"));
        }

        let (compression_method, compressed_size, file_name_length, extra_field_length) =
            local_header_fields(header)
                .map_err(|_| Error::archive("truncated local file header"))?;

        // Data starts after: LFH (30 bytes) + filename + extra field
        let data_offset = offset + LFH_SIZE as u64 + file_name_length + extra_field_length;
        if data_offset > self.data.len() as u64 {
            return Err(Error::archive("local file header overruns archive"));
        }

        Ok(LocalFileHeader {
            compression_method: CompressionMethod::from_u16(compression_method),
            compressed_size,
            data_offset,
        })
    }

    pub(crate) fn data(&self) -> &'a [u8] {
        self.data
    }
}

/// Method, compressed size, name length and extra length of a local header.
fn local_header_fields(header: &[u8]) -> std::io::Result<(u16, u64, u64, u64)> {
    let mut cursor = Cursor::new(header);
    cursor.set_position(8);
    let compression_method = cursor.read_u16::<LittleEndian>()?;
    cursor.set_position(18);
    let compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    cursor.set_position(26);
    let file_name_length = cursor.read_u16::<LittleEndian>()? as u64;
    let extra_field_length = cursor.read_u16::<LittleEndian>()? as u64;
    Ok((compression_method, compressed_size, file_name_length, extra_field_length))
}

/// Parse one Central Directory File Header at the start of `record`.
///
/// Returns the entry and the record's total length, or `None` when the
/// signature does not match or the record does not fit in `record`.
fn parse_cdfh(record: &[u8]) -> Option<(CentralDirectoryEntry, usize)> {
    if record.len() < CDFH_MIN_SIZE || &record[0..4] != CDFH_SIGNATURE {
        return None;
    }

    // Fixed fields from the name length onwards; the bounds check above makes
    // these reads infallible
    let mut cursor = Cursor::new(&record[28..CDFH_MIN_SIZE]);
    let file_name_length = cursor.read_u16::<LittleEndian>().ok()? as usize;
    let extra_field_length = cursor.read_u16::<LittleEndian>().ok()? as usize;
    let file_comment_length = cursor.read_u16::<LittleEndian>().ok()? as usize;
    let _disk_number_start = cursor.read_u16::<LittleEndian>().ok()?;
    let _internal_attrs = cursor.read_u16::<LittleEndian>().ok()?;
    let _external_attrs = cursor.read_u32::<LittleEndian>().ok()?;
    let local_header_offset = cursor.read_u32::<LittleEndian>().ok()? as u64;

    let name_end = CDFH_MIN_SIZE + file_name_length;
    let record_len = name_end + extra_field_length + file_comment_length;
    if record.len() < record_len {
        return None;
    }

    // Use lossy conversion to handle non-UTF8 filenames gracefully
    let entry_name = String::from_utf8_lossy(&record[CDFH_MIN_SIZE..name_end]).into_owned();

    Some((
        CentralDirectoryEntry {
            entry_name,
            local_header_offset,
        },
        record_len,
    ))
}
