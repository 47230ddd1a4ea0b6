mod common;

use common::*;
use quickcheck_macros::quickcheck;
use std::io::Write;
use zip64_stream::ZipStreamWriter;

fn stored_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii() { c } else { '?' })
        .collect()
}

#[quickcheck]
fn read_what_we_write(files: Vec<(String, Vec<u8>)>) -> bool {
    // names are made unique so that every entry can be looked up
    let files: Vec<(String, Vec<u8>)> = files
        .into_iter()
        .enumerate()
        .map(|(i, (name, data))| (format!("{i}-{name}"), data))
        .collect();

    let mut zip = ZipStreamWriter::new(Vec::new());
    for (name, data) in &files {
        zip.start_entry(name).unwrap();
        zip.write_all(data).unwrap();
    }
    let bytes = zip.close().unwrap();

    let extracted = extract_all(&bytes);
    let archive = read_archive(&bytes);
    extracted.len() == files.len()
        && archive.zip64_end.number_of_files == files.len() as u64
        && archive.end.number_of_files as usize == files.len()
        && extracted.iter().zip(&files).all(|(entry, (name, data))| {
            entry.name == stored_name(name)
                && entry.size == data.len() as u64
                && entry.crc32 == crc32fast::hash(data)
                && entry.contents == *data
        })
        && archive.entries.iter().all(|entry| {
            archive.data_descriptor(entry)
                == (entry.crc32, entry.compressed_size, entry.uncompressed_size)
        })
}

#[quickcheck]
fn split_writes_match_single_write(data: Vec<u8>, splits: Vec<usize>) -> bool {
    let whole = {
        let mut zip = ZipStreamWriter::new(Vec::new());
        zip.start_entry("file.bin").unwrap();
        zip.write_payload(&data, 0, data.len()).unwrap();
        zip.close().unwrap()
    };

    let pieces = {
        let mut zip = ZipStreamWriter::new(Vec::new());
        zip.start_entry("file.bin").unwrap();
        let mut offset = 0;
        for split in splits {
            let len = split % (data.len() - offset + 1);
            zip.write_payload(&data, offset, len).unwrap();
            offset += len;
        }
        zip.write_payload(&data, offset, data.len() - offset).unwrap();
        zip.close().unwrap()
    };

    let (whole, pieces) = (extract_all(&whole), extract_all(&pieces));
    let (a, b) = (&whole[0], &pieces[0]);
    a.crc32 == b.crc32 && a.size == b.size && a.contents == data && b.contents == data
}
