#![macro_use]
//! Fixed-size records of the ZIP64 trailer and the per-entry data descriptor.

use crate::result::ZipResult;
use std::io::prelude::*;

pub(crate) type Magic = u32;

pub(crate) const LOCAL_FILE_HEADER_SIGNATURE: Magic = 0x04034b50;
pub(crate) const DATA_DESCRIPTOR_SIGNATURE: Magic = 0x08074b50;
pub(crate) const CENTRAL_DIRECTORY_HEADER_SIGNATURE: Magic = 0x02014b50;
pub(crate) const CENTRAL_DIRECTORY_END_SIGNATURE: Magic = 0x06054b50;
pub(crate) const ZIP64_CENTRAL_DIRECTORY_END_SIGNATURE: Magic = 0x06064b50;
pub(crate) const ZIP64_CENTRAL_DIRECTORY_END_LOCATOR_SIGNATURE: Magic = 0x07064b50;

pub(crate) const ZIP64_BYTES_THR: u64 = u32::MAX as u64;
pub(crate) const ZIP64_ENTRY_THR: usize = u16::MAX as usize;

/// "Version needed to extract" for entries that fit the legacy 32-bit fields.
pub(crate) const VERSION_NEEDED_DEFAULT: u16 = 20;
/// "Version needed to extract" once ZIP64 structures are involved.
pub(crate) const VERSION_NEEDED_ZIP64: u16 = 45;

/// General purpose flag bit 3: crc and sizes follow the data in a data descriptor.
pub(crate) const FLAG_DATA_DESCRIPTOR: u16 = 1 << 3;

pub(crate) trait Block: Sized + Copy {
    #[cfg(test)]
    fn interpret(bytes: Box<[u8]>) -> ZipResult<Self>;

    #[cfg(test)]
    fn deserialize(block: &[u8]) -> Self {
        assert_eq!(block.len(), size_of::<Self>());
        let block_ptr: *const Self = block.as_ptr().cast();
        unsafe { block_ptr.read_unaligned() }
    }

    #[cfg(test)]
    fn parse<T: Read>(reader: &mut T) -> ZipResult<Self> {
        let mut block = vec![0u8; size_of::<Self>()];
        reader.read_exact(&mut block)?;
        Self::interpret(block.into_boxed_slice())
    }

    fn encode(self) -> Box<[u8]>;

    fn serialize(self) -> Box<[u8]> {
        let mut out_block = vec![0u8; size_of::<Self>()];
        let out_view: &mut [u8] = out_block.as_mut();
        let out_ptr: *mut Self = out_view.as_mut_ptr().cast();
        unsafe {
            out_ptr.write_unaligned(self);
        }
        out_block.into_boxed_slice()
    }

    /// Writes the encoded block and returns the number of bytes written.
    fn write<T: Write>(self, writer: &mut T) -> ZipResult<u64> {
        let block = self.encode();
        writer.write_all(&block)?;
        Ok(block.len() as u64)
    }
}

/// Convert all the fields of a struct *from* little-endian representations.
#[cfg(test)]
macro_rules! from_le {
    ($obj:ident, $field:ident, $type:ty) => {
        $obj.$field = <$type>::from_le($obj.$field);
    };
    ($obj:ident, [($field:ident, $type:ty) $(,)?]) => {
        from_le![$obj, $field, $type];
    };
    ($obj:ident, [($field:ident, $type:ty), $($rest:tt),+ $(,)?]) => {
        from_le![$obj, $field, $type];
        from_le!($obj, [$($rest),+]);
    };
}

/// Convert all the fields of a struct *into* little-endian representations.
macro_rules! to_le {
    ($obj:ident, $field:ident, $type:ty) => {
        $obj.$field = <$type>::to_le($obj.$field);
    };
    ($obj:ident, [($field:ident, $type:ty) $(,)?]) => {
        to_le![$obj, $field, $type];
    };
    ($obj:ident, [($field:ident, $type:ty), $($rest:tt),+ $(,)?]) => {
        to_le![$obj, $field, $type];
        to_le!($obj, [$($rest),+]);
    };
}

/// Implements [`Block`] for a packed record whose first field is its signature.
macro_rules! impl_block {
    ($block:ty, $signature:expr, $error:literal) => {
        impl Block for $block {
            #[cfg(test)]
            fn interpret(bytes: Box<[u8]>) -> ZipResult<Self> {
                let block = Self::deserialize(&bytes).from_le();

                if block.magic != $signature {
                    return crate::result::invalid_archive($error);
                }

                Ok(block)
            }

            fn encode(self) -> Box<[u8]> {
                self.to_le().serialize()
            }
        }
    };
}

#[derive(Copy, Clone, Debug)]
#[repr(packed)]
pub(crate) struct DataDescriptorBlock {
    pub(crate) magic: Magic,
    pub(crate) crc32: u32,
    pub(crate) compressed_size: u64,
    pub(crate) uncompressed_size: u64,
}

impl DataDescriptorBlock {
    #[cfg(test)]
    #[inline(always)]
    fn from_le(mut self) -> Self {
        from_le![
            self,
            [
                (magic, Magic),
                (crc32, u32),
                (compressed_size, u64),
                (uncompressed_size, u64),
            ]
        ];
        self
    }

    #[inline(always)]
    fn to_le(mut self) -> Self {
        to_le![
            self,
            [
                (magic, Magic),
                (crc32, u32),
                (compressed_size, u64),
                (uncompressed_size, u64),
            ]
        ];
        self
    }
}

impl_block!(
    DataDescriptorBlock,
    DATA_DESCRIPTOR_SIGNATURE,
    "Invalid data descriptor signature"
);

/// Trailing per-entry record carrying the crc and sizes that were unknown when
/// the local header was written. Sizes are always stored as 8-byte values.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct DataDescriptor {
    pub(crate) crc32: u32,
    pub(crate) compressed_size: u64,
    pub(crate) uncompressed_size: u64,
}

impl DataDescriptor {
    #[cfg(test)]
    pub(crate) fn parse<T: Read>(reader: &mut T) -> ZipResult<DataDescriptor> {
        let DataDescriptorBlock {
            crc32,
            compressed_size,
            uncompressed_size,
            ..
        } = DataDescriptorBlock::parse(reader)?;
        Ok(DataDescriptor {
            crc32,
            compressed_size,
            uncompressed_size,
        })
    }

    pub(crate) fn block(self) -> DataDescriptorBlock {
        let Self {
            crc32,
            compressed_size,
            uncompressed_size,
        } = self;
        DataDescriptorBlock {
            magic: DATA_DESCRIPTOR_SIGNATURE,
            crc32,
            compressed_size,
            uncompressed_size,
        }
    }

    pub(crate) fn write<T: Write>(self, writer: &mut T) -> ZipResult<u64> {
        self.block().write(writer)
    }
}

#[derive(Copy, Clone, Debug)]
#[repr(packed)]
pub(crate) struct CDEBlock {
    pub(crate) magic: Magic,
    pub(crate) disk_number: u16,
    pub(crate) disk_with_central_directory: u16,
    pub(crate) number_of_files_on_this_disk: u16,
    pub(crate) number_of_files: u16,
    pub(crate) central_directory_size: u32,
    pub(crate) central_directory_offset: u32,
    pub(crate) zip_file_comment_length: u16,
}

impl CDEBlock {
    #[cfg(test)]
    #[inline(always)]
    fn from_le(mut self) -> Self {
        from_le![
            self,
            [
                (magic, Magic),
                (disk_number, u16),
                (disk_with_central_directory, u16),
                (number_of_files_on_this_disk, u16),
                (number_of_files, u16),
                (central_directory_size, u32),
                (central_directory_offset, u32),
                (zip_file_comment_length, u16)
            ]
        ];
        self
    }

    #[inline(always)]
    fn to_le(mut self) -> Self {
        to_le![
            self,
            [
                (magic, Magic),
                (disk_number, u16),
                (disk_with_central_directory, u16),
                (number_of_files_on_this_disk, u16),
                (number_of_files, u16),
                (central_directory_size, u32),
                (central_directory_offset, u32),
                (zip_file_comment_length, u16)
            ]
        ];
        self
    }
}

impl_block!(
    CDEBlock,
    CENTRAL_DIRECTORY_END_SIGNATURE,
    "Invalid digital signature header"
);

/// Legacy end of central directory record.
///
/// Written after the ZIP64 trailer as a compatibility stub: values that do not
/// fit the legacy field widths are clamped, and the true values only live in
/// the [`Zip64CentralDirectoryEnd`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct CentralDirectoryEnd {
    pub(crate) disk_number: u16,
    pub(crate) disk_with_central_directory: u16,
    pub(crate) number_of_files_on_this_disk: u16,
    pub(crate) number_of_files: u16,
    pub(crate) central_directory_size: u32,
    pub(crate) central_directory_offset: u32,
}

impl CentralDirectoryEnd {
    /// Builds the record for a single-disk archive, saturating every value at
    /// the width of its legacy field.
    pub(crate) fn clamped(
        number_of_files: u64,
        central_directory_size: u64,
        central_directory_offset: u64,
    ) -> CentralDirectoryEnd {
        let number_of_files = number_of_files.min(ZIP64_ENTRY_THR as u64) as u16;
        CentralDirectoryEnd {
            disk_number: 0,
            disk_with_central_directory: 0,
            number_of_files_on_this_disk: number_of_files,
            number_of_files,
            central_directory_size: central_directory_size.min(ZIP64_BYTES_THR) as u32,
            central_directory_offset: central_directory_offset.min(ZIP64_BYTES_THR) as u32,
        }
    }

    #[cfg(test)]
    pub(crate) fn parse<T: Read>(reader: &mut T) -> ZipResult<CentralDirectoryEnd> {
        let CDEBlock {
            // magic,
            disk_number,
            disk_with_central_directory,
            number_of_files_on_this_disk,
            number_of_files,
            central_directory_size,
            central_directory_offset,
            ..
        } = CDEBlock::parse(reader)?;

        Ok(CentralDirectoryEnd {
            disk_number,
            disk_with_central_directory,
            number_of_files_on_this_disk,
            number_of_files,
            central_directory_size,
            central_directory_offset,
        })
    }

    pub(crate) fn block(self) -> CDEBlock {
        let Self {
            disk_number,
            disk_with_central_directory,
            number_of_files_on_this_disk,
            number_of_files,
            central_directory_size,
            central_directory_offset,
        } = self;
        CDEBlock {
            magic: CENTRAL_DIRECTORY_END_SIGNATURE,
            disk_number,
            disk_with_central_directory,
            number_of_files_on_this_disk,
            number_of_files,
            central_directory_size,
            central_directory_offset,
            zip_file_comment_length: 0,
        }
    }

    pub(crate) fn write<T: Write>(self, writer: &mut T) -> ZipResult<u64> {
        self.block().write(writer)
    }
}

#[derive(Copy, Clone, Debug)]
#[repr(packed)]
pub(crate) struct Zip64CDELocatorBlock {
    pub(crate) magic: Magic,
    pub(crate) disk_with_central_directory: u32,
    pub(crate) end_of_central_directory_offset: u64,
    pub(crate) number_of_disks: u32,
}

impl Zip64CDELocatorBlock {
    #[cfg(test)]
    #[inline(always)]
    fn from_le(mut self) -> Self {
        from_le![
            self,
            [
                (magic, Magic),
                (disk_with_central_directory, u32),
                (end_of_central_directory_offset, u64),
                (number_of_disks, u32),
            ]
        ];
        self
    }

    #[inline(always)]
    fn to_le(mut self) -> Self {
        to_le![
            self,
            [
                (magic, Magic),
                (disk_with_central_directory, u32),
                (end_of_central_directory_offset, u64),
                (number_of_disks, u32),
            ]
        ];
        self
    }
}

impl_block!(
    Zip64CDELocatorBlock,
    ZIP64_CENTRAL_DIRECTORY_END_LOCATOR_SIGNATURE,
    "Invalid zip64 locator digital signature header"
);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Zip64CentralDirectoryEndLocator {
    pub(crate) disk_with_central_directory: u32,
    pub(crate) end_of_central_directory_offset: u64,
    pub(crate) number_of_disks: u32,
}

impl Zip64CentralDirectoryEndLocator {
    /// Locator for a single-disk archive whose ZIP64 end record starts at `offset`.
    pub(crate) fn at(offset: u64) -> Zip64CentralDirectoryEndLocator {
        Zip64CentralDirectoryEndLocator {
            disk_with_central_directory: 0,
            end_of_central_directory_offset: offset,
            number_of_disks: 1,
        }
    }

    #[cfg(test)]
    pub(crate) fn parse<T: Read>(reader: &mut T) -> ZipResult<Zip64CentralDirectoryEndLocator> {
        let Zip64CDELocatorBlock {
            // magic,
            disk_with_central_directory,
            end_of_central_directory_offset,
            number_of_disks,
            ..
        } = Zip64CDELocatorBlock::parse(reader)?;

        Ok(Zip64CentralDirectoryEndLocator {
            disk_with_central_directory,
            end_of_central_directory_offset,
            number_of_disks,
        })
    }

    pub(crate) fn block(self) -> Zip64CDELocatorBlock {
        let Self {
            disk_with_central_directory,
            end_of_central_directory_offset,
            number_of_disks,
        } = self;
        Zip64CDELocatorBlock {
            magic: ZIP64_CENTRAL_DIRECTORY_END_LOCATOR_SIGNATURE,
            disk_with_central_directory,
            end_of_central_directory_offset,
            number_of_disks,
        }
    }

    pub(crate) fn write<T: Write>(self, writer: &mut T) -> ZipResult<u64> {
        self.block().write(writer)
    }
}

#[derive(Copy, Clone, Debug)]
#[repr(packed)]
pub(crate) struct Zip64CDEBlock {
    pub(crate) magic: Magic,
    pub(crate) record_size: u64,
    pub(crate) version_made_by: u16,
    pub(crate) version_needed_to_extract: u16,
    pub(crate) disk_number: u32,
    pub(crate) disk_with_central_directory: u32,
    pub(crate) number_of_files_on_this_disk: u64,
    pub(crate) number_of_files: u64,
    pub(crate) central_directory_size: u64,
    pub(crate) central_directory_offset: u64,
}

impl Zip64CDEBlock {
    /// Size of the record, not counting the leading signature and size fields.
    pub(crate) const RECORD_SIZE: u64 = (size_of::<Self>() - 12) as u64;

    #[cfg(test)]
    #[inline(always)]
    fn from_le(mut self) -> Self {
        from_le![
            self,
            [
                (magic, Magic),
                (record_size, u64),
                (version_made_by, u16),
                (version_needed_to_extract, u16),
                (disk_number, u32),
                (disk_with_central_directory, u32),
                (number_of_files_on_this_disk, u64),
                (number_of_files, u64),
                (central_directory_size, u64),
                (central_directory_offset, u64),
            ]
        ];
        self
    }

    #[inline(always)]
    fn to_le(mut self) -> Self {
        to_le![
            self,
            [
                (magic, Magic),
                (record_size, u64),
                (version_made_by, u16),
                (version_needed_to_extract, u16),
                (disk_number, u32),
                (disk_with_central_directory, u32),
                (number_of_files_on_this_disk, u64),
                (number_of_files, u64),
                (central_directory_size, u64),
                (central_directory_offset, u64),
            ]
        ];
        self
    }
}

impl_block!(
    Zip64CDEBlock,
    ZIP64_CENTRAL_DIRECTORY_END_SIGNATURE,
    "Invalid digital signature header"
);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Zip64CentralDirectoryEnd {
    pub(crate) record_size: u64,
    pub(crate) version_made_by: u16,
    pub(crate) version_needed_to_extract: u16,
    pub(crate) disk_number: u32,
    pub(crate) disk_with_central_directory: u32,
    pub(crate) number_of_files_on_this_disk: u64,
    pub(crate) number_of_files: u64,
    pub(crate) central_directory_size: u64,
    pub(crate) central_directory_offset: u64,
    //pub extensible_data_sector: Vec<u8>, <-- never written.
}

impl Zip64CentralDirectoryEnd {
    /// End record for a single-disk archive holding `number_of_files` entries.
    pub(crate) fn new(
        number_of_files: u64,
        central_directory_size: u64,
        central_directory_offset: u64,
    ) -> Zip64CentralDirectoryEnd {
        Zip64CentralDirectoryEnd {
            record_size: Zip64CDEBlock::RECORD_SIZE,
            version_made_by: VERSION_NEEDED_ZIP64,
            version_needed_to_extract: VERSION_NEEDED_ZIP64,
            disk_number: 0,
            disk_with_central_directory: 0,
            number_of_files_on_this_disk: number_of_files,
            number_of_files,
            central_directory_size,
            central_directory_offset,
        }
    }

    #[cfg(test)]
    pub(crate) fn parse<T: Read>(reader: &mut T) -> ZipResult<Zip64CentralDirectoryEnd> {
        let Zip64CDEBlock {
            record_size,
            version_made_by,
            version_needed_to_extract,
            disk_number,
            disk_with_central_directory,
            number_of_files_on_this_disk,
            number_of_files,
            central_directory_size,
            central_directory_offset,
            ..
        } = Zip64CDEBlock::parse(reader)?;
        Ok(Self {
            record_size,
            version_made_by,
            version_needed_to_extract,
            disk_number,
            disk_with_central_directory,
            number_of_files_on_this_disk,
            number_of_files,
            central_directory_size,
            central_directory_offset,
        })
    }

    pub(crate) fn block(self) -> Zip64CDEBlock {
        let Self {
            record_size,
            version_made_by,
            version_needed_to_extract,
            disk_number,
            disk_with_central_directory,
            number_of_files_on_this_disk,
            number_of_files,
            central_directory_size,
            central_directory_offset,
        } = self;
        Zip64CDEBlock {
            magic: ZIP64_CENTRAL_DIRECTORY_END_SIGNATURE,
            record_size,
            version_made_by,
            version_needed_to_extract,
            disk_number,
            disk_with_central_directory,
            number_of_files_on_this_disk,
            number_of_files,
            central_directory_size,
            central_directory_offset,
        }
    }

    pub(crate) fn write<T: Write>(self, writer: &mut T) -> ZipResult<u64> {
        self.block().write(writer)
    }
}
