//! Builds small archives byte by byte for tests.

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::Compression;
use flate2::write::{DeflateEncoder, ZlibEncoder};
use std::io::Write;

use super::structures::{CDFH_SIGNATURE, EndOfCentralDirectory, LFH_SIGNATURE};

pub(crate) fn deflate_raw(data: &[u8]) -> Vec<u8> {
    let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

pub(crate) fn deflate_zlib(data: &[u8]) -> Vec<u8> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

struct Entry {
    name: String,
    method: u16,
    payload: Vec<u8>,
}

#[derive(Default)]
pub(crate) struct ArchiveBuilder {
    entries: Vec<Entry>,
    comment: Vec<u8>,
    deferred_sizes: bool,
}

impl ArchiveBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn stored(self, name: &str, data: &[u8]) -> Self {
        self.with_method(name, 0, data)
    }

    pub(crate) fn deflated(self, name: &str, data: &[u8]) -> Self {
        self.with_method(name, 8, &deflate_raw(data))
    }

    pub(crate) fn zlib_wrapped(self, name: &str, data: &[u8]) -> Self {
        self.with_method(name, 8, &deflate_zlib(data))
    }

    /// Add an entry whose payload is written as-is under `method`.
    pub(crate) fn with_method(mut self, name: &str, method: u16, payload: &[u8]) -> Self {
        self.entries.push(Entry {
            name: name.to_string(),
            method,
            payload: payload.to_vec(),
        });
        self
    }

    pub(crate) fn comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    /// Write zero sizes into local headers, as streaming writers do.
    pub(crate) fn deferred_sizes(mut self) -> Self {
        self.deferred_sizes = true;
        self
    }

    pub(crate) fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut offsets = Vec::with_capacity(self.entries.len());

        for e in &self.entries {
            offsets.push(out.len() as u32);
            let size = if self.deferred_sizes { 0 } else { e.payload.len() as u32 };
            out.extend_from_slice(LFH_SIGNATURE);
            out.write_u16::<LittleEndian>(20).unwrap(); // version needed
            out.write_u16::<LittleEndian>(0).unwrap(); // flags
            out.write_u16::<LittleEndian>(e.method).unwrap();
            out.write_u32::<LittleEndian>(0).unwrap(); // time + date
            out.write_u32::<LittleEndian>(0).unwrap(); // crc32
            out.write_u32::<LittleEndian>(size).unwrap();
            out.write_u32::<LittleEndian>(size).unwrap();
            out.write_u16::<LittleEndian>(e.name.len() as u16).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap(); // extra
            out.extend_from_slice(e.name.as_bytes());
            out.extend_from_slice(&e.payload);
        }

        let cd_offset = out.len() as u32;
        for (e, offset) in self.entries.iter().zip(&offsets) {
            out.extend_from_slice(CDFH_SIGNATURE);
            out.write_u16::<LittleEndian>(20).unwrap(); // version made by
            out.write_u16::<LittleEndian>(20).unwrap(); // version needed
            out.write_u16::<LittleEndian>(0).unwrap(); // flags
            out.write_u16::<LittleEndian>(e.method).unwrap();
            out.write_u32::<LittleEndian>(0).unwrap(); // time + date
            out.write_u32::<LittleEndian>(0).unwrap(); // crc32
            out.write_u32::<LittleEndian>(e.payload.len() as u32).unwrap();
            out.write_u32::<LittleEndian>(e.payload.len() as u32).unwrap();
            out.write_u16::<LittleEndian>(e.name.len() as u16).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap(); // extra
            out.write_u16::<LittleEndian>(0).unwrap(); // comment
            out.write_u16::<LittleEndian>(0).unwrap(); // disk start
            out.write_u16::<LittleEndian>(0).unwrap(); // internal attrs
            out.write_u32::<LittleEndian>(0).unwrap(); // external attrs
            out.write_u32::<LittleEndian>(*offset).unwrap();
            out.extend_from_slice(e.name.as_bytes());
        }
        let cd_size = out.len() as u32 - cd_offset;

        out.extend_from_slice(EndOfCentralDirectory::SIGNATURE);
        out.write_u16::<LittleEndian>(0).unwrap(); // disk number
        out.write_u16::<LittleEndian>(0).unwrap(); // disk with cd
        out.write_u16::<LittleEndian>(self.entries.len() as u16).unwrap();
        out.write_u16::<LittleEndian>(self.entries.len() as u16).unwrap();
        out.write_u32::<LittleEndian>(cd_size).unwrap();
        out.write_u32::<LittleEndian>(cd_offset).unwrap();
        out.write_u16::<LittleEndian>(self.comment.len() as u16).unwrap();
        out.extend_from_slice(&self.comment);
        out
    }
}
