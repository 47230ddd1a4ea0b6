//! Helpers to check what the writer produced: contents are read back through
//! the `zip` crate, and a byte-level walk of the records checks the layout.
#![allow(dead_code)]

use flate2::read::DeflateDecoder;
use memchr::memmem;
use std::io::{Cursor, Read};

pub const LOCAL_HEADER_LEN: usize = 30;
pub const CENTRAL_HEADER_LEN: usize = 46;
pub const DATA_DESCRIPTOR_LEN: usize = 24;
pub const ZIP64_END_LEN: usize = 56;
pub const ZIP64_LOCATOR_LEN: usize = 20;
pub const END_LEN: usize = 22;

pub fn u16_at(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes(bytes[offset..offset + 2].try_into().unwrap())
}

pub fn u32_at(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
}

pub fn u64_at(bytes: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap())
}

/// One entry as read back by `zip::ZipArchive`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedEntry {
    pub name: String,
    pub contents: Vec<u8>,
    pub crc32: u32,
    pub size: u64,
}

/// Reads every entry, in central directory order, through the `zip` crate.
pub fn extract_all(bytes: &[u8]) -> Vec<ExtractedEntry> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).unwrap();
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).unwrap();
        entries.push(ExtractedEntry {
            name: file.name().to_owned(),
            contents,
            crc32: file.crc32(),
            size: file.size(),
        });
    }
    entries
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct End {
    pub number_of_files: u16,
    pub central_directory_size: u32,
    pub central_directory_offset: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zip64End {
    pub offset: usize,
    pub number_of_files: u64,
    pub central_directory_size: u64,
    pub central_directory_offset: u64,
}

#[derive(Debug, Clone)]
pub struct Entry {
    pub name: Vec<u8>,
    pub version_needed: u16,
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub header_start: u64,
    pub has_zip64_extra: bool,
    pub data_start: usize,
}

#[derive(Debug)]
pub struct Archive<'a> {
    pub bytes: &'a [u8],
    pub end: End,
    pub zip64_end: Zip64End,
    pub entries: Vec<Entry>,
}

impl Archive<'_> {
    pub fn compressed(&self, entry: &Entry) -> &[u8] {
        &self.bytes[entry.data_start..entry.data_start + entry.compressed_size as usize]
    }

    pub fn contents(&self, entry: &Entry) -> Vec<u8> {
        let mut out = Vec::new();
        DeflateDecoder::new(self.compressed(entry))
            .read_to_end(&mut out)
            .unwrap();
        out
    }

    /// The data descriptor following the data of `entry`: (crc, compressed, uncompressed).
    pub fn data_descriptor(&self, entry: &Entry) -> (u32, u64, u64) {
        let at = entry.data_start + entry.compressed_size as usize;
        assert_eq!(&self.bytes[at..at + 4], b"PK\x07\x08");
        (
            u32_at(self.bytes, at + 4),
            u64_at(self.bytes, at + 8),
            u64_at(self.bytes, at + 16),
        )
    }
}

/// Walks the records of an archive laid out the way the streaming writer lays it out.
pub fn read_archive(bytes: &[u8]) -> Archive<'_> {
    let end_at = memmem::rfind(bytes, b"PK\x05\x06").expect("no end of central directory");
    assert_eq!(end_at + END_LEN, bytes.len(), "archive comment is not empty");
    assert_eq!(u16_at(bytes, end_at + 20), 0);
    let end = End {
        number_of_files: u16_at(bytes, end_at + 10),
        central_directory_size: u32_at(bytes, end_at + 12),
        central_directory_offset: u32_at(bytes, end_at + 16),
    };
    assert_eq!(u16_at(bytes, end_at + 8), end.number_of_files);

    let locator_at = end_at - ZIP64_LOCATOR_LEN;
    assert_eq!(&bytes[locator_at..locator_at + 4], b"PK\x06\x07");
    assert_eq!(u32_at(bytes, locator_at + 4), 0);
    assert_eq!(u32_at(bytes, locator_at + 16), 1);
    let zip64_at = u64_at(bytes, locator_at + 8) as usize;
    assert_eq!(zip64_at + ZIP64_END_LEN, locator_at);

    assert_eq!(&bytes[zip64_at..zip64_at + 4], b"PK\x06\x06");
    assert_eq!(u64_at(bytes, zip64_at + 4), 44);
    assert_eq!(u16_at(bytes, zip64_at + 12), 45);
    assert_eq!(u16_at(bytes, zip64_at + 14), 45);
    assert_eq!(u64_at(bytes, zip64_at + 24), u64_at(bytes, zip64_at + 32));
    let zip64_end = Zip64End {
        offset: zip64_at,
        number_of_files: u64_at(bytes, zip64_at + 32),
        central_directory_size: u64_at(bytes, zip64_at + 40),
        central_directory_offset: u64_at(bytes, zip64_at + 48),
    };

    let mut entries = Vec::new();
    let mut at = zip64_end.central_directory_offset as usize;
    for _ in 0..zip64_end.number_of_files {
        assert_eq!(&bytes[at..at + 4], b"PK\x01\x02");
        let name_len = u16_at(bytes, at + 28) as usize;
        let extra_len = u16_at(bytes, at + 30) as usize;
        assert_eq!(u16_at(bytes, at + 32), 0, "file comment");
        let name = bytes[at + CENTRAL_HEADER_LEN..at + CENTRAL_HEADER_LEN + name_len].to_vec();

        let mut compressed_size = u32_at(bytes, at + 20) as u64;
        let mut uncompressed_size = u32_at(bytes, at + 24) as u64;
        let mut header_start = u32_at(bytes, at + 42) as u64;
        let has_zip64_extra = extra_len != 0;
        if has_zip64_extra {
            assert_eq!(extra_len, 32);
            let extra = at + CENTRAL_HEADER_LEN + name_len;
            assert_eq!(u16_at(bytes, extra), 0x0001);
            assert_eq!(u16_at(bytes, extra + 2), 28);
            uncompressed_size = u64_at(bytes, extra + 4);
            compressed_size = u64_at(bytes, extra + 12);
            header_start = u64_at(bytes, extra + 20);
            assert_eq!(u32_at(bytes, extra + 28), 0);
        }

        let local = header_start as usize;
        assert_eq!(&bytes[local..local + 4], b"PK\x03\x04");
        assert_eq!(u16_at(bytes, local + 26) as usize, name_len);
        assert_eq!(&bytes[local + 30..local + 30 + name_len], &name[..]);
        let local_extra_len = u16_at(bytes, local + 28) as usize;

        entries.push(Entry {
            name,
            version_needed: u16_at(bytes, at + 6),
            crc32: u32_at(bytes, at + 16),
            compressed_size,
            uncompressed_size,
            header_start,
            has_zip64_extra,
            data_start: local + LOCAL_HEADER_LEN + name_len + local_extra_len,
        });
        at += CENTRAL_HEADER_LEN + name_len + extra_len;
    }
    assert_eq!(
        at as u64,
        zip64_end.central_directory_offset + zip64_end.central_directory_size
    );
    assert_eq!(at, zip64_at);

    Archive {
        bytes,
        end,
        zip64_end,
        entries,
    }
}
