//! Raw entry names from a zip central directory.
//!
//! `zip::ZipArchive` indexes entries by name, so an archive that names two entries alike shows up
//! there as a single entry. Walking the central directory records directly sees every name.

use crate::{Error, Result};
use std::io::{Read, Seek, SeekFrom};

const EOCD_SIGNATURE: u32 = 0x0605_4b50;
const EOCD_LEN: u64 = 22;
const MAX_COMMENT_LEN: u64 = 0xffff;

const ZIP64_LOCATOR_SIGNATURE: u32 = 0x0706_4b50;
const ZIP64_LOCATOR_LEN: u64 = 20;
const ZIP64_EOCD_SIGNATURE: u32 = 0x0606_4b50;
const ZIP64_EOCD_LEN: usize = 56;

const CENTRAL_HEADER_SIGNATURE: u32 = 0x0201_4b50;
const CENTRAL_HEADER_LEN: usize = 46;

/// Returns the name of every central directory record, in archive order, duplicates included.
///
/// The central directory is located relative to the end record rather than by its stored offset,
/// so archives with leading data (e.g., self-extracting archives) are handled.
pub(super) fn entry_names<R: Read + Seek>(reader: &mut R) -> Result<Vec<Vec<u8>>> {
    let len = reader.seek(SeekFrom::End(0))?;
    if len < EOCD_LEN {
        return Err(malformed("archive is too short"));
    }

    let tail_start = len - len.min(EOCD_LEN + MAX_COMMENT_LEN);
    let tail = read_at(reader, tail_start, len - tail_start)?;
    let eocd = (0..=tail.len() - to_usize(EOCD_LEN)?)
        .rev()
        .find(|&i| u32_at(&tail, i) == EOCD_SIGNATURE)
        .ok_or_else(|| malformed("end of central directory record not found"))?;
    let eocd_pos = tail_start + to_u64(eocd);

    let mut count = u64::from(u16_at(&tail, eocd + 10));
    let mut cd_size = u64::from(u32_at(&tail, eocd + 12));
    let mut cd_end = eocd_pos;

    if eocd_pos >= ZIP64_LOCATOR_LEN {
        let locator = read_at(reader, eocd_pos - ZIP64_LOCATOR_LEN, ZIP64_LOCATOR_LEN)?;
        if u32_at(&locator, 0) == ZIP64_LOCATOR_SIGNATURE {
            let record_pos = u64_at(&locator, 8);
            let record = read_at(reader, record_pos, to_u64(ZIP64_EOCD_LEN))?;
            if u32_at(&record, 0) != ZIP64_EOCD_SIGNATURE {
                return Err(malformed("zip64 end of central directory record not found"));
            }
            count = u64_at(&record, 32);
            cd_size = u64_at(&record, 40);
            cd_end = record_pos;
        }
    }

    let cd_start = cd_end
        .checked_sub(cd_size)
        .ok_or_else(|| malformed("central directory size exceeds archive"))?;
    let cd = read_at(reader, cd_start, cd_size)?;

    let mut names = Vec::new();
    let mut pos = 0;
    for _ in 0..count {
        if cd.len() < pos + CENTRAL_HEADER_LEN || u32_at(&cd, pos) != CENTRAL_HEADER_SIGNATURE {
            return Err(malformed("truncated central directory"));
        }
        let name_len = usize::from(u16_at(&cd, pos + 28));
        let extra_len = usize::from(u16_at(&cd, pos + 30));
        let comment_len = usize::from(u16_at(&cd, pos + 32));
        let name_start = pos + CENTRAL_HEADER_LEN;
        let name = cd
            .get(name_start..name_start + name_len)
            .ok_or_else(|| malformed("truncated central directory"))?;
        names.push(name.to_vec());
        pos = name_start + name_len + extra_len + comment_len;
    }

    Ok(names)
}

fn read_at<R: Read + Seek>(reader: &mut R, pos: u64, len: u64) -> Result<Vec<u8>> {
    reader.seek(SeekFrom::Start(pos))?;
    let mut buf = vec![0; to_usize(len)?];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

fn malformed(msg: &str) -> Error {
    Error::Archive(msg.to_owned())
}

fn to_usize(n: u64) -> Result<usize> {
    usize::try_from(n).map_err(|_| malformed("central directory is too large"))
}

fn to_u64(n: usize) -> u64 {
    n as u64
}

fn u16_at(buf: &[u8], i: usize) -> u16 {
    u16::from_le_bytes([buf[i], buf[i + 1]])
}

fn u32_at(buf: &[u8], i: usize) -> u32 {
    u32::from_le_bytes([buf[i], buf[i + 1], buf[i + 2], buf[i + 3]])
}

fn u64_at(buf: &[u8], i: usize) -> u64 {
    let mut bytes = [0; 8];
    bytes.copy_from_slice(&buf[i..i + 8]);
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod test {
    use super::entry_names;
    use crate::Error;
    use std::io::{Cursor, Write};
    use zip::{write::SimpleFileOptions, ZipWriter};

    fn archive(names: &[&str]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for name in names {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(name.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn names_in_archive_order() {
        let bytes = archive(&["b", "a/c", "a"]);
        let names = entry_names(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(names, [b"b".to_vec(), b"a/c".to_vec(), b"a".to_vec()]);
    }

    #[test]
    fn empty_archive() {
        let bytes = archive(&[]);
        assert!(entry_names(&mut Cursor::new(bytes)).unwrap().is_empty());
    }

    #[test]
    fn leading_data() {
        let mut bytes = b"#!/bin/sh\nexit 0\n".to_vec();
        bytes.extend(archive(&["x", "y"]));
        let names = entry_names(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(names, [b"x".to_vec(), b"y".to_vec()]);
    }

    #[test]
    fn not_an_archive() {
        for bytes in [vec![], vec![0u8; 1024]] {
            assert!(matches!(
                entry_names(&mut Cursor::new(bytes)),
                Err(Error::Archive(_))
            ));
        }
    }
}
