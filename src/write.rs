//! Single-pass writer for ZIP64 archives

use crate::compression::{Compressor, Deflater};
use crate::crc32::Checksum;
use crate::result::{ZipError, ZipResult};
use crate::spec::{CentralDirectoryEnd, Zip64CentralDirectoryEnd, Zip64CentralDirectoryEndLocator};
use crate::types::ZipEntry;
use crc32fast::Hasher;
use flate2::Compression;
use log::{debug, error, trace};
use std::io;
use std::io::prelude::*;

/// Options for the archive being written
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WriterOptions {
    compression_level: Compression,
}

impl WriterOptions {
    /// Set the deflate level used for the entries of the archive.
    ///
    /// The default is [`Compression::default`].
    #[must_use]
    pub const fn compression_level(mut self, level: Compression) -> Self {
        self.compression_level = level;
        self
    }
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            compression_level: Compression::default(),
        }
    }
}

/// Generator for ZIP64 archives on a non-seekable sink.
///
/// Every entry is deflated while it is written, so the crc and sizes of an
/// entry are only known once it is closed. They are recorded in a data
/// descriptor after the entry data and in the central directory; the local
/// header only carries placeholders.
///
/// ```
/// use std::io::Write;
///
/// # fn main() -> zip64_stream::result::ZipResult<()> {
/// let mut zip = zip64_stream::ZipStreamWriter::new(Vec::new());
///
/// zip.start_entry("hello_world.txt")?;
/// zip.write_all(b"Hello, World!")?;
///
/// let bytes = zip.close()?;
/// assert_eq!(&bytes[..4], b"PK\x03\x04");
/// # Ok(())
/// # }
/// ```
///
/// The archive is only valid once [`finish`](ZipStreamWriter::finish) or
/// [`close`](ZipStreamWriter::close) has completed. A writer that is dropped
/// before that finishes the archive on a best-effort basis, unless an earlier
/// write to the underlying writer has already failed.
#[derive(Debug)]
pub struct ZipStreamWriter<W: Write, C: Compressor = Deflater, K: Checksum = Hasher> {
    inner: Option<W>,
    compressor: C,
    checksum: K,
    files: Vec<ZipEntry>,
    writing_to_file: bool,
    position: u64,
    finished: bool,
    failed: bool,
}

fn get_plain<W>(inner: &mut Option<W>) -> ZipResult<&mut W> {
    inner
        .as_mut()
        .ok_or(ZipError::IllegalState("the writer has been closed"))
}

impl<W: Write> ZipStreamWriter<W> {
    /// Initializes the writer with the default deflate level.
    ///
    /// Before writing to this object, [`start_entry`](ZipStreamWriter::start_entry)
    /// should be called.
    pub fn new(inner: W) -> Self {
        Self::with_options(inner, WriterOptions::default())
    }

    /// Initializes the writer with the given options.
    pub fn with_options(inner: W, options: WriterOptions) -> Self {
        Self::with_parts(inner, Deflater::new(options.compression_level), Hasher::new())
    }
}

impl<W: Write, K: Checksum> ZipStreamWriter<W, Deflater, K> {
    /// Changes the deflate level for entries started from now on.
    ///
    /// An entry that is currently open keeps the level it was started with.
    pub fn set_level(&mut self, level: Compression) {
        self.compressor.set_level(level);
    }
}

impl<W: Write, C: Compressor, K: Checksum> ZipStreamWriter<W, C, K> {
    /// Builds a writer around a custom compressor and checksum.
    ///
    /// Both are used as fresh streams: they must not have been fed any data.
    pub fn with_parts(inner: W, compressor: C, checksum: K) -> Self {
        ZipStreamWriter {
            inner: Some(inner),
            compressor,
            checksum,
            files: Vec::new(),
            writing_to_file: false,
            position: 0,
            finished: false,
            failed: false,
        }
    }

    /// Number of bytes written to the underlying writer so far.
    ///
    /// While an entry is open this does not include its compressed data yet;
    /// the data is accounted for when the entry is closed.
    pub const fn position(&self) -> u64 {
        self.position
    }

    /// The entries started so far, in the order they were started.
    pub fn entries(&self) -> &[ZipEntry] {
        &self.files
    }

    /// Whether an entry is open and accepting data.
    pub const fn is_writing_entry(&self) -> bool {
        self.writing_to_file
    }

    /// Whether the central directory has been written.
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether writing to the underlying writer or compressing has failed.
    ///
    /// The archive is broken at that point, and dropping the writer no longer
    /// attempts to finish it.
    pub const fn has_failed(&self) -> bool {
        self.failed
    }

    fn track<T>(&mut self, result: ZipResult<T>) -> ZipResult<T> {
        if let Err(ZipError::Io(e)) = &result {
            trace!("writer failed at offset {}: {e}", self.position);
            self.failed = true;
        }
        result
    }

    /// Start a new entry, closing the current one first if there is one.
    ///
    /// Names are stored one byte per character; characters outside of ASCII
    /// are written as `?`. Names are not checked for emptiness or uniqueness.
    pub fn start_entry<S: AsRef<str>>(&mut self, name: S) -> ZipResult<()> {
        let result = self.begin_entry(name.as_ref());
        self.track(result)
    }

    fn begin_entry(&mut self, name: &str) -> ZipResult<()> {
        if self.finished {
            return Err(ZipError::IllegalState("the archive is already finished"));
        }
        let mut file = ZipEntry::new(name, 0)?;

        if self.writing_to_file {
            self.close_entry()?;
        }

        let writer = get_plain(&mut self.inner)?;
        file.header_start = self.position;
        let written = file.write_local_header(writer)?;
        trace!("local header: {written} bytes at offset {}", self.position);
        self.position += written;
        debug!(
            "started entry {:?} at offset {}",
            file.file_name, file.header_start
        );

        self.files.push(file);
        self.writing_to_file = true;
        Ok(())
    }

    /// Feeds `len` bytes of `buf`, starting at `offset`, to the open entry.
    ///
    /// An out of range `offset`/`len` pair fails without touching any state. A
    /// zero `len` succeeds without doing anything, even with no entry open.
    pub fn write_payload(&mut self, buf: &[u8], offset: usize, len: usize) -> ZipResult<()> {
        let end = offset
            .checked_add(len)
            .filter(|&end| end <= buf.len())
            .ok_or(ZipError::OutOfBounds {
                offset,
                len,
                buf_len: buf.len(),
            })?;
        if len == 0 {
            return Ok(());
        }
        if !self.writing_to_file {
            return Err(ZipError::IllegalState("no entry is open"));
        }

        let result = self.feed(&buf[offset..end]);
        self.track(result)
    }

    fn feed(&mut self, data: &[u8]) -> ZipResult<()> {
        let writer = get_plain(&mut self.inner)?;
        self.compressor.compress(data, writer)?;
        self.checksum.update(data);
        Ok(())
    }

    /// Ends the open entry: drains the compressor and writes the data descriptor.
    pub fn close_entry(&mut self) -> ZipResult<()> {
        let result = self.end_entry();
        self.track(result)
    }

    fn end_entry(&mut self) -> ZipResult<()> {
        if !self.writing_to_file {
            return Err(ZipError::IllegalState("no entry is open"));
        }
        let file = self
            .files
            .last_mut()
            .ok_or(ZipError::IllegalState("no entry is open"))?;
        let writer = get_plain(&mut self.inner)?;

        self.compressor.finish(writer)?;

        file.uncompressed_size = self.compressor.total_in();
        file.compressed_size = self.compressor.total_out();
        file.crc32 = self.checksum.value();

        self.position += file.compressed_size;
        let written = file.data_descriptor().write(writer)?;
        trace!("data descriptor: {written} bytes at offset {}", self.position);
        self.position += written;
        debug!(
            "closed entry {:?}: {} bytes, {} compressed, crc {:#010x}",
            file.file_name, file.uncompressed_size, file.compressed_size, file.crc32
        );

        self.compressor.reset();
        self.checksum.reset();
        self.writing_to_file = false;
        Ok(())
    }

    /// Closes the open entry, if any, and writes the central directory followed
    /// by the ZIP64 end of central directory record, its locator, and the end
    /// of central directory record.
    ///
    /// Calling this again once it has succeeded does nothing.
    pub fn finish(&mut self) -> ZipResult<()> {
        let result = self.write_trailer();
        self.track(result)
    }

    fn write_trailer(&mut self) -> ZipResult<()> {
        if self.finished {
            return Ok(());
        }
        if self.writing_to_file {
            self.close_entry()?;
        }

        let writer = get_plain(&mut self.inner)?;
        let number_of_files = self.files.len() as u64;

        let central_start = self.position;
        for file in &self.files {
            self.position += file.write_central_header(writer)?;
        }
        let central_size = self.position - central_start;
        trace!("central directory: {central_size} bytes at offset {central_start}");

        let zip64_footer_start = self.position;
        trace!("zip64 end of central directory at offset {zip64_footer_start}");
        self.position += Zip64CentralDirectoryEnd::new(number_of_files, central_size, central_start)
            .write(writer)?;
        self.position += Zip64CentralDirectoryEndLocator::at(zip64_footer_start).write(writer)?;
        self.position +=
            CentralDirectoryEnd::clamped(number_of_files, central_size, central_start).write(writer)?;
        writer.flush()?;

        self.finished = true;
        debug!(
            "finished archive: {number_of_files} entries, {} bytes",
            self.position
        );
        Ok(())
    }

    /// Finishes the archive and returns the underlying writer.
    ///
    /// The writer is released whether or not finishing succeeds; on failure it
    /// is dropped together with the error being returned.
    pub fn close(mut self) -> ZipResult<W> {
        let result = self.finish();
        let inner = self.inner.take();
        result?;
        inner.ok_or(ZipError::IllegalState("the writer has been closed"))
    }
}

impl<W: Write, C: Compressor, K: Checksum> Write for ZipStreamWriter<W, C, K> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_payload(buf, 0, buf.len())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        get_plain(&mut self.inner)?.flush()
    }
}

impl<W: Write, C: Compressor, K: Checksum> Drop for ZipStreamWriter<W, C, K> {
    fn drop(&mut self) {
        if self.inner.is_some() && !self.finished && !self.failed {
            if let Err(e) = self.finish() {
                error!("ZipStreamWriter drop failed: {e:?}");
            }
        }
    }
}
