//! Possible ZIP compression methods, and the compressor that produces entry data.

use std::fmt;
use std::io::{self, Write};

use flate2::{Compress, Compression, FlushCompress, Status};

/// Identifies the storage format used to compress a file within a ZIP archive.
///
/// Every entry this crate writes is deflated.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[non_exhaustive]
pub enum CompressionMethod {
    /// Compress the file using Deflate
    Deflated,
}

impl CompressionMethod {
    /// Method number of deflate in archive headers
    pub const DEFLATE: u16 = 8;

    /// Converts a CompressionMethod to a u16 as stored in the archive headers
    pub const fn to_u16(self) -> u16 {
        match self {
            CompressionMethod::Deflated => Self::DEFLATE,
        }
    }
}

impl fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Just duplicate what the Debug format looks like, i.e, the enum key:
        write!(f, "{self:?}")
    }
}

/// An incremental, push-based compressor.
///
/// Compressed bytes are handed to the supplied writer as soon as they are
/// produced. One instance is reused for every entry of an archive: after
/// [`finish`](Compressor::finish) the writer calls [`reset`](Compressor::reset)
/// before the next entry starts.
pub trait Compressor {
    /// Feeds `input` to the compressor, writing any output produced so far to `out`.
    fn compress<W: Write>(&mut self, input: &[u8], out: &mut W) -> io::Result<()>;

    /// Flushes all pending input and ends the stream, writing the remaining output to `out`.
    fn finish<W: Write>(&mut self, out: &mut W) -> io::Result<()>;

    /// Total number of uncompressed bytes fed since the last reset.
    fn total_in(&self) -> u64;

    /// Total number of compressed bytes produced since the last reset.
    fn total_out(&self) -> u64;

    /// Clears the counters and prepares for a new stream.
    fn reset(&mut self);
}

const OUTPUT_BUFFER_SIZE: usize = 32 * 1024;

/// Raw deflate (no zlib wrapper) backed by [`flate2::Compress`].
#[derive(Debug)]
pub struct Deflater {
    inner: Compress,
    level: Compression,
    pending_level: Compression,
    buffer: Vec<u8>,
}

impl Deflater {
    /// Creates a fresh stream at the given level.
    pub fn new(level: Compression) -> Self {
        Deflater {
            inner: Compress::new(level, false),
            level,
            pending_level: level,
            buffer: Vec::with_capacity(OUTPUT_BUFFER_SIZE),
        }
    }

    /// Sets the compression level.
    ///
    /// A stream that has already consumed input keeps its level; the new one
    /// applies from the next [`reset`](Compressor::reset) on.
    pub fn set_level(&mut self, level: Compression) {
        self.pending_level = level;
        if self.inner.total_in() == 0 && self.inner.total_out() == 0 {
            self.reset();
        }
    }

    /// Level of the current stream.
    pub fn level(&self) -> Compression {
        self.level
    }

    fn run<W: Write>(
        &mut self,
        input: &[u8],
        flush: FlushCompress,
        out: &mut W,
    ) -> io::Result<(usize, Status)> {
        self.buffer.clear();
        let before = self.inner.total_in();
        let status = self
            .inner
            .compress_vec(input, &mut self.buffer, flush)
            .map_err(io::Error::other)?;
        out.write_all(&self.buffer)?;
        Ok(((self.inner.total_in() - before) as usize, status))
    }
}

impl Default for Deflater {
    fn default() -> Self {
        Self::new(Compression::default())
    }
}

impl Compressor for Deflater {
    fn compress<W: Write>(&mut self, mut input: &[u8], out: &mut W) -> io::Result<()> {
        while !input.is_empty() {
            let (consumed, _) = self.run(input, FlushCompress::None, out)?;
            if consumed == 0 && self.buffer.is_empty() {
                return Err(io::Error::other("deflate made no progress"));
            }
            input = &input[consumed..];
        }
        Ok(())
    }

    fn finish<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        loop {
            let (_, status) = self.run(&[], FlushCompress::Finish, out)?;
            if matches!(status, Status::StreamEnd) {
                return Ok(());
            }
        }
    }

    fn total_in(&self) -> u64 {
        self.inner.total_in()
    }

    fn total_out(&self) -> u64 {
        self.inner.total_out()
    }

    fn reset(&mut self) {
        if self.pending_level == self.level {
            self.inner.reset();
        } else {
            self.level = self.pending_level;
            self.inner = Compress::new(self.level, false);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use flate2::read::DeflateDecoder;
    use std::io::Read;

    fn inflate(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        DeflateDecoder::new(data)
            .read_to_end(&mut out)
            .expect("inflate");
        out
    }

    #[test]
    fn to_u16() {
        assert_eq!(CompressionMethod::Deflated.to_u16(), 8);
        assert_eq!(format!("{}", CompressionMethod::Deflated), "Deflated");
    }

    #[test]
    fn deflate_roundtrip_and_counters() {
        let mut deflater = Deflater::default();
        let mut out = Vec::new();
        let data = b"hello hello hello hello hello".repeat(100);
        for chunk in data.chunks(7) {
            deflater.compress(chunk, &mut out).unwrap();
        }
        deflater.finish(&mut out).unwrap();

        assert_eq!(deflater.total_in(), data.len() as u64);
        assert_eq!(deflater.total_out(), out.len() as u64);
        assert_eq!(inflate(&out), data);
    }

    #[test]
    fn empty_stream_still_terminates() {
        let mut deflater = Deflater::default();
        let mut out = Vec::new();
        deflater.finish(&mut out).unwrap();
        assert_eq!(deflater.total_in(), 0);
        assert!(!out.is_empty());
        assert!(inflate(&out).is_empty());
    }

    #[test]
    fn large_output_is_drained() {
        // Incompressible input larger than the output buffer.
        let mut data = vec![0u8; 200_000];
        getrandom::fill(&mut data).unwrap();
        let mut deflater = Deflater::new(Compression::fast());
        let mut out = Vec::new();
        deflater.compress(&data, &mut out).unwrap();
        deflater.finish(&mut out).unwrap();
        assert_eq!(deflater.total_out(), out.len() as u64);
        assert_eq!(inflate(&out), data);
    }

    #[test]
    fn reset_clears_counters_and_applies_level() {
        let mut deflater = Deflater::new(Compression::best());
        let mut out = Vec::new();
        deflater.compress(b"abc", &mut out).unwrap();
        deflater.set_level(Compression::none());
        assert_eq!(deflater.level(), Compression::best());
        deflater.finish(&mut out).unwrap();
        deflater.reset();

        assert_eq!(deflater.level(), Compression::none());
        assert_eq!(deflater.total_in(), 0);
        assert_eq!(deflater.total_out(), 0);

        let mut second = Vec::new();
        deflater.compress(b"xyz", &mut second).unwrap();
        deflater.finish(&mut second).unwrap();
        assert_eq!(inflate(&second), b"xyz");
    }
}
