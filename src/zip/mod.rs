//! ZIP archive reading for document attachments.
//!
//! Only what is needed to pull one named entry out of an in-memory archive:
//!
//! - [`structures`]: record layouts (EOCD, central and local file headers)
//! - [`parser`]: locating the EOCD, walking the Central Directory, reading
//!   Local File Headers
//! - [`extractor`]: method dispatch between STORED and DEFLATE
//!
//! ## Limitations
//!
//! - No ZIP64, encryption or multi-disk support
//! - Entries whose local header defers sizes to a data descriptor are read to
//!   the end of the buffer rather than to the descriptor

mod extractor;
mod parser;
mod structures;

#[cfg(test)]
pub(crate) mod fixture;

pub use extractor::{ZipExtractor, decompress};
pub use parser::ZipParser;
pub use structures::*;
