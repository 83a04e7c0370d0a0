use flate2::read::{DeflateDecoder, ZlibDecoder};
use std::io::Read;
use tracing::debug;

use crate::error::{Error, Result};

use super::parser::ZipParser;
use super::structures::CompressionMethod;

/// Decompress an entry's data according to its declared method.
///
/// DEFLATE data is tried as a raw stream first, as ZIP stores it, and then as
/// a zlib-wrapped stream for writers that add the framing. When both fail the
/// zlib error is returned.
pub fn decompress(data: &[u8], method: CompressionMethod) -> Result<Vec<u8>> {
    match method {
        CompressionMethod::Stored => Ok(data.to_vec()),
        CompressionMethod::Deflate => {
            let mut out = Vec::new();
            match DeflateDecoder::new(data).read_to_end(&mut out) {
                Ok(_) => Ok(out),
                Err(raw_err) => {
                    debug!(error = %raw_err, "raw deflate failed, retrying with zlib framing");
                    let mut out = Vec::new();
                    ZlibDecoder::new(data)
                        .read_to_end(&mut out)
                        .map_err(Error::Decompression)?;
                    Ok(out)
                }
            }
        }
        CompressionMethod::Unknown(m) => Err(Error::UnsupportedCompressionMethod(m)),
    }
}

/// Reads single named entries out of an in-memory archive.
pub struct ZipExtractor<'a> {
    parser: ZipParser<'a>,
}

impl<'a> ZipExtractor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            parser: ZipParser::new(data),
        }
    }

    /// Extract the named entry's decompressed bytes.
    pub fn extract(&self, name: &str) -> Result<Vec<u8>> {
        let entry = self.parser.find_entry(name)?;
        let header = self.parser.read_local_header(entry.local_header_offset)?;

        let data = self.parser.data();
        let range = header.data_range(data.len() as u64)?;
        debug!(
            entry = name,
            method = header.compression_method.as_u16(),
            len = range.len(),
            "extracting archive entry"
        );

        decompress(&data[range], header.compression_method)
    }
}
