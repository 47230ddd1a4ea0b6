//! A library for writing ZIP64 archives in a single pass.
//!
//! The archive is produced in order on any [`std::io::Write`] sink: the sink
//! is never sought, so sockets, pipes and HTTP response bodies all work.
//! Every entry is deflated, and every archive carries the ZIP64 trailer, so
//! there is no limit on entry sizes or on the number of entries.
//!
//! ```
//! use std::io::Write;
//! use zip64_stream::{Compression, WriterOptions, ZipStreamWriter};
//!
//! # fn main() -> zip64_stream::result::ZipResult<()> {
//! let options = WriterOptions::default().compression_level(Compression::best());
//! let mut zip = ZipStreamWriter::with_options(Vec::new(), options);
//!
//! zip.start_entry("a.txt")?;
//! zip.write_all(b"AAA")?;
//! zip.start_entry("b.txt")?;
//! zip.write_payload(b"xxBBBxx", 2, 3)?;
//!
//! let archive = zip.close()?;
//! assert_eq!(&archive[archive.len() - 22..][..4], b"PK\x05\x06");
//! # Ok(())
//! # }
//! ```
//!
//! Entries carry no modification time, comment or permissions, and are never
//! encrypted. Reading archives is out of scope.
//!
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub use crate::compression::{CompressionMethod, Compressor, Deflater};
pub use crate::crc32::Checksum;
pub use crate::types::ZipEntry;
pub use crate::write::{WriterOptions, ZipStreamWriter};
pub use flate2::Compression;

mod compression;
mod crc32;
mod extra_fields;
pub mod result;
mod spec;
mod types;
pub mod write;
