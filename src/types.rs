//! Types that specify what is contained in a ZIP.

use std::io::Write;

use crate::compression::CompressionMethod;
use crate::extra_fields::Zip64ExtendedInformation;
use crate::result::{invalid_archive, ZipResult};
use crate::spec::{self, Block, DataDescriptor};

/// Byte substituted for characters that have no single-byte encoding.
const UNMAPPABLE_CHAR: u8 = b'?';

/// Structure representing a single entry of the archive being written.
///
/// The crc and sizes stay zero while the entry is open and are filled in once
/// its payload has been fully compressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipEntry {
    /// Name of the file
    pub file_name: Box<str>,
    /// Name as it is stored in the archive, one byte per character.
    pub(crate) file_name_raw: Box<[u8]>,
    /// CRC32 checksum
    pub crc32: u32,
    /// Size of the file in the ZIP
    pub compressed_size: u64,
    /// Size of the file when extracted
    pub uncompressed_size: u64,
    /// Specifies where the local header of the file starts
    pub header_start: u64,
}

impl ZipEntry {
    pub(crate) fn new(name: &str, header_start: u64) -> ZipResult<Self> {
        let file_name_raw: Box<[u8]> = name
            .chars()
            .map(|c| if c.is_ascii() { c as u8 } else { UNMAPPABLE_CHAR })
            .collect();
        if file_name_raw.len() > u16::MAX as usize {
            return invalid_archive("File name is too long");
        }
        Ok(ZipEntry {
            file_name: name.into(),
            file_name_raw,
            crc32: 0,
            compressed_size: 0,
            uncompressed_size: 0,
            header_start,
        })
    }

    /// The name bytes exactly as they are written to the archive.
    pub fn file_name_raw(&self) -> &[u8] {
        &self.file_name_raw
    }

    /// Whether the central directory describes this entry through the ZIP64 extra field.
    ///
    /// Only the uncompressed size decides; the compressed size and header offset
    /// follow it into the extra field.
    pub const fn zip64_extension(&self) -> bool {
        self.uncompressed_size > spec::ZIP64_BYTES_THR
    }

    /// "Version needed to extract" advertised by the central directory header.
    pub const fn version_needed(&self) -> u16 {
        if self.zip64_extension() {
            spec::VERSION_NEEDED_ZIP64
        } else {
            spec::VERSION_NEEDED_DEFAULT
        }
    }

    #[inline(always)]
    fn file_name_length(&self) -> u16 {
        // bounded by `ZipEntry::new`
        self.file_name_raw.len() as u16
    }

    pub(crate) fn local_block(&self) -> ZipLocalEntryBlock {
        ZipLocalEntryBlock {
            magic: spec::LOCAL_FILE_HEADER_SIGNATURE,
            // Always 4.5: the header carries a ZIP64 extra field no matter how
            // large the entry turns out to be.
            version_made_by: spec::VERSION_NEEDED_ZIP64,
            flags: spec::FLAG_DATA_DESCRIPTOR,
            compression_method: CompressionMethod::Deflated.to_u16(),
            last_mod_time: 0,
            last_mod_date: 0,
            crc32: 0,
            compressed_size: spec::ZIP64_BYTES_THR as u32,
            uncompressed_size: spec::ZIP64_BYTES_THR as u32,
            file_name_length: self.file_name_length(),
            extra_field_length: Zip64ExtendedInformation::FULL_SIZE,
        }
    }

    pub(crate) fn block(&self) -> ZipEntryBlock {
        let zip64 = self.zip64_extension();
        let inline = |value: u64| {
            if zip64 {
                spec::ZIP64_BYTES_THR as u32
            } else {
                value as u32
            }
        };
        ZipEntryBlock {
            magic: spec::CENTRAL_DIRECTORY_HEADER_SIGNATURE,
            version_made_by: spec::VERSION_NEEDED_ZIP64,
            version_to_extract: self.version_needed(),
            flags: spec::FLAG_DATA_DESCRIPTOR,
            compression_method: CompressionMethod::Deflated.to_u16(),
            last_mod_time: 0,
            last_mod_date: 0,
            crc32: self.crc32,
            compressed_size: inline(self.compressed_size),
            uncompressed_size: inline(self.uncompressed_size),
            file_name_length: self.file_name_length(),
            extra_field_length: if zip64 {
                Zip64ExtendedInformation::FULL_SIZE
            } else {
                0
            },
            file_comment_length: 0,
            disk_number: 0,
            internal_file_attributes: 0,
            external_file_attributes: 0,
            offset: inline(self.header_start),
        }
    }

    /// Writes the local file header, with placeholder crc and sizes, and
    /// returns the number of bytes written.
    pub(crate) fn write_local_header<W: Write>(&self, writer: &mut W) -> ZipResult<u64> {
        let mut written = self.local_block().write(writer)?;
        writer.write_all(&self.file_name_raw)?;
        written += self.file_name_raw.len() as u64;
        let extra = Zip64ExtendedInformation::local_header().serialize();
        writer.write_all(&extra)?;
        written += extra.len() as u64;
        Ok(written)
    }

    pub(crate) fn data_descriptor(&self) -> DataDescriptor {
        DataDescriptor {
            crc32: self.crc32,
            compressed_size: self.compressed_size,
            uncompressed_size: self.uncompressed_size,
        }
    }

    /// Writes the central directory header and returns the number of bytes written.
    pub(crate) fn write_central_header<W: Write>(&self, writer: &mut W) -> ZipResult<u64> {
        let mut written = self.block().write(writer)?;
        writer.write_all(&self.file_name_raw)?;
        written += self.file_name_raw.len() as u64;
        if self.zip64_extension() {
            let extra = Zip64ExtendedInformation::central_header(
                self.uncompressed_size,
                self.compressed_size,
                self.header_start,
            )
            .serialize();
            writer.write_all(&extra)?;
            written += extra.len() as u64;
        }
        Ok(written)
    }
}

#[derive(Copy, Clone, Debug)]
#[repr(packed)]
pub(crate) struct ZipEntryBlock {
    pub magic: spec::Magic,
    pub version_made_by: u16,
    pub version_to_extract: u16,
    pub flags: u16,
    pub compression_method: u16,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name_length: u16,
    pub extra_field_length: u16,
    pub file_comment_length: u16,
    pub disk_number: u16,
    pub internal_file_attributes: u16,
    pub external_file_attributes: u32,
    pub offset: u32,
}

impl ZipEntryBlock {
    #[cfg(test)]
    #[inline(always)]
    fn from_le(mut self) -> Self {
        from_le![
            self,
            [
                (magic, spec::Magic),
                (version_made_by, u16),
                (version_to_extract, u16),
                (flags, u16),
                (compression_method, u16),
                (last_mod_time, u16),
                (last_mod_date, u16),
                (crc32, u32),
                (compressed_size, u32),
                (uncompressed_size, u32),
                (file_name_length, u16),
                (extra_field_length, u16),
                (file_comment_length, u16),
                (disk_number, u16),
                (internal_file_attributes, u16),
                (external_file_attributes, u32),
                (offset, u32),
            ]
        ];
        self
    }

    #[inline(always)]
    fn to_le(mut self) -> Self {
        to_le![
            self,
            [
                (magic, spec::Magic),
                (version_made_by, u16),
                (version_to_extract, u16),
                (flags, u16),
                (compression_method, u16),
                (last_mod_time, u16),
                (last_mod_date, u16),
                (crc32, u32),
                (compressed_size, u32),
                (uncompressed_size, u32),
                (file_name_length, u16),
                (extra_field_length, u16),
                (file_comment_length, u16),
                (disk_number, u16),
                (internal_file_attributes, u16),
                (external_file_attributes, u32),
                (offset, u32),
            ]
        ];
        self
    }
}

impl_block!(
    ZipEntryBlock,
    spec::CENTRAL_DIRECTORY_HEADER_SIGNATURE,
    "Invalid Central Directory header"
);

#[derive(Copy, Clone, Debug)]
#[repr(packed)]
pub(crate) struct ZipLocalEntryBlock {
    pub magic: spec::Magic,
    pub version_made_by: u16,
    pub flags: u16,
    pub compression_method: u16,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name_length: u16,
    pub extra_field_length: u16,
}

impl ZipLocalEntryBlock {
    #[cfg(test)]
    #[inline(always)]
    fn from_le(mut self) -> Self {
        from_le![
            self,
            [
                (magic, spec::Magic),
                (version_made_by, u16),
                (flags, u16),
                (compression_method, u16),
                (last_mod_time, u16),
                (last_mod_date, u16),
                (crc32, u32),
                (compressed_size, u32),
                (uncompressed_size, u32),
                (file_name_length, u16),
                (extra_field_length, u16),
            ]
        ];
        self
    }

    #[inline(always)]
    fn to_le(mut self) -> Self {
        to_le![
            self,
            [
                (magic, spec::Magic),
                (version_made_by, u16),
                (flags, u16),
                (compression_method, u16),
                (last_mod_time, u16),
                (last_mod_date, u16),
                (crc32, u32),
                (compressed_size, u32),
                (uncompressed_size, u32),
                (file_name_length, u16),
                (extra_field_length, u16),
            ]
        ];
        self
    }
}

impl_block!(
    ZipLocalEntryBlock,
    spec::LOCAL_FILE_HEADER_SIGNATURE,
    "Invalid local file header"
);
