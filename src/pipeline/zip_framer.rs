//! Synthesizes the ZIP structural records this pipeline needs: local file
//! headers, data descriptors, central directory entries, and the
//! end-of-central-directory record.
//!
//! The archive is written with the data-descriptor flag set (general purpose
//! bit 3) so the CRC-32 and sizes can be appended *after* the file body,
//! which is what makes single-pass, non-seekable streaming possible in the
//! first place. No compression is used: every entry is stored verbatim.
//! No ZIP64 support — offsets and sizes are plain 32-bit fields.
//!
//! This is hand-rolled rather than built on a general-purpose ZIP-writing
//! crate because the orchestrator needs the exact archive offset at which
//! each record starts and ends, as those offsets are produced, to drive the
//! central directory and the piece hasher. No off-the-shelf writer exposes
//! that.

use byteorder::{LittleEndian, WriteBytesExt};

const LOCAL_HEADER_SIGNATURE: u32 = 0x0403_4b50;
const CENTRAL_DIR_SIGNATURE: u32 = 0x0201_4b50;
const EOCD_SIGNATURE: u32 = 0x0605_4b50;
const VERSION: u16 = 20;
const GP_FLAG_DATA_DESCRIPTOR: u16 = 0x0008;
const METHOD_STORED: u16 = 0;

/// A finalized entry, ready to be folded into the central directory.
pub struct FileEntry {
    pub name: String,
    pub crc32: u32,
    pub size: u32,
    pub local_header_offset: u32,
}

/// `30 + name.len()` bytes: signature, fixed fields, then the UTF-8 name.
/// CRC and sizes are left zeroed; the trailing data descriptor carries them.
pub fn local_file_header(name: &str) -> Vec<u8> {
    let name_bytes = name.as_bytes();
    let mut out = Vec::with_capacity(30 + name_bytes.len());
    out.write_u32::<LittleEndian>(LOCAL_HEADER_SIGNATURE).unwrap();
    out.write_u16::<LittleEndian>(VERSION).unwrap();
    out.write_u16::<LittleEndian>(GP_FLAG_DATA_DESCRIPTOR).unwrap();
    out.write_u16::<LittleEndian>(METHOD_STORED).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap(); // last mod file time
    out.write_u16::<LittleEndian>(0).unwrap(); // last mod file date
    out.write_u32::<LittleEndian>(0).unwrap(); // crc-32 placeholder
    out.write_u32::<LittleEndian>(0).unwrap(); // compressed size placeholder
    out.write_u32::<LittleEndian>(0).unwrap(); // uncompressed size placeholder
    out.write_u16::<LittleEndian>(name_bytes.len() as u16).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap(); // extra field length
    out.extend_from_slice(name_bytes);
    out
}

/// 12 bytes: CRC-32, compressed size, uncompressed size. No leading
/// signature is written (see SPEC_FULL.md §9 Open Question 2).
pub fn data_descriptor(crc32: u32, size: u32) -> [u8; 12] {
    let mut out = [0u8; 12];
    out[0..4].copy_from_slice(&crc32.to_le_bytes());
    out[4..8].copy_from_slice(&size.to_le_bytes());
    out[8..12].copy_from_slice(&size.to_le_bytes());
    out
}

/// `46 + name.len()` bytes describing one archived file in the central
/// directory.
pub fn central_directory_entry(entry: &FileEntry) -> Vec<u8> {
    let name_bytes = entry.name.as_bytes();
    let mut out = Vec::with_capacity(46 + name_bytes.len());
    out.write_u32::<LittleEndian>(CENTRAL_DIR_SIGNATURE).unwrap();
    out.write_u16::<LittleEndian>(VERSION).unwrap(); // version made by
    out.write_u16::<LittleEndian>(VERSION).unwrap(); // version needed
    out.write_u16::<LittleEndian>(GP_FLAG_DATA_DESCRIPTOR).unwrap();
    out.write_u16::<LittleEndian>(METHOD_STORED).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap(); // last mod time
    out.write_u16::<LittleEndian>(0).unwrap(); // last mod date
    out.write_u32::<LittleEndian>(entry.crc32).unwrap();
    out.write_u32::<LittleEndian>(entry.size).unwrap(); // compressed size
    out.write_u32::<LittleEndian>(entry.size).unwrap(); // uncompressed size
    out.write_u16::<LittleEndian>(name_bytes.len() as u16).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap(); // extra field length
    out.write_u16::<LittleEndian>(0).unwrap(); // file comment length
    out.write_u16::<LittleEndian>(0).unwrap(); // disk number start
    out.write_u16::<LittleEndian>(0).unwrap(); // internal file attributes
    out.write_u32::<LittleEndian>(0).unwrap(); // external file attributes
    out.write_u32::<LittleEndian>(entry.local_header_offset).unwrap();
    out.extend_from_slice(name_bytes);
    out
}

/// `22 + comment.len()` bytes closing out the archive.
pub fn end_of_central_directory(entry_count: u16, cd_size: u32, cd_offset: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(22);
    out.write_u32::<LittleEndian>(EOCD_SIGNATURE).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap(); // number of this disk
    out.write_u16::<LittleEndian>(0).unwrap(); // disk with start of central dir
    out.write_u16::<LittleEndian>(entry_count).unwrap(); // entries on this disk
    out.write_u16::<LittleEndian>(entry_count).unwrap(); // total entries
    out.write_u32::<LittleEndian>(cd_size).unwrap();
    out.write_u32::<LittleEndian>(cd_offset).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap(); // archive comment length
    out
}
