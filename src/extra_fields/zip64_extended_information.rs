//! 4.5.3 -Zip64 Extended Information Extra Field (0x0001)
//!
//! | Value                  | Size    | Description                                  |
//! | ---------------------- | ------- | -------------------------------------------- |
//! | `0x0001`               | 2 bytes | Tag for this "extra" block type              |
//! | Size                   | 2 bytes | Size of this "extra" block                   |
//! | Original Size          | 8 bytes | Original uncompressed file size              |
//! | Compressed Size        | 8 bytes | Size of compressed data                      |
//! | Relative Header Offset | 8 bytes | Offset of local header record                |
//! | Disk Start Number      | 4 bytes | Number of the disk on which this file starts |
//!
//! This crate always writes all four values, so the block has a fixed size.

use crate::extra_fields::UsedExtraField;

/// Zip64 extended information extra field
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Zip64ExtendedInformation {
    uncompressed_size: u64,
    compressed_size: u64,
    header_start: u64,
    disk_start: u32,
}

impl Zip64ExtendedInformation {
    const MAGIC: UsedExtraField = UsedExtraField::Zip64ExtendedInfo;

    /// Size of the data portion, not counting the tag and size fields.
    pub(crate) const DATA_SIZE: u16 = (3 * size_of::<u64>() + size_of::<u32>()) as u16;

    /// Size of the whole block as it appears in a header.
    pub(crate) const FULL_SIZE: u16 =
        Self::DATA_SIZE + (size_of::<UsedExtraField>() + size_of::<u16>()) as u16;

    /// Placeholder block for a local header: the real values are not known yet
    /// and only reach the archive through the data descriptor and central header.
    pub(crate) const fn local_header() -> Self {
        Self::central_header(0, 0, 0)
    }

    pub(crate) const fn central_header(
        uncompressed_size: u64,
        compressed_size: u64,
        header_start: u64,
    ) -> Self {
        Self {
            uncompressed_size,
            compressed_size,
            header_start,
            disk_start: 0,
        }
    }

    /// Get the full size of the block
    pub(crate) const fn full_size(&self) -> usize {
        Self::FULL_SIZE as usize
    }

    /// Serialize the block
    pub(crate) fn serialize(self) -> Box<[u8]> {
        let Self {
            uncompressed_size,
            compressed_size,
            header_start,
            disk_start,
        } = self;

        let mut ret = Vec::with_capacity(self.full_size());
        ret.extend(Self::MAGIC.to_le_bytes());
        ret.extend(Self::DATA_SIZE.to_le_bytes());
        ret.extend(uncompressed_size.to_le_bytes());
        ret.extend(compressed_size.to_le_bytes());
        ret.extend(header_start.to_le_bytes());
        ret.extend(disk_start.to_le_bytes());
        debug_assert_eq!(ret.len(), self.full_size());

        ret.into_boxed_slice()
    }
}
