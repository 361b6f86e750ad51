//! # MP4 File Format Overview
//!
//! The MP4 file format is a container format designed to store multimedia data such as video,
//! audio and metadata. An MP4 file is a sequence of **boxes** (also called atoms), each of which
//! starts with a header giving its size and a 4-character type code.
//!
//! ## Structure of a progressive MP4 File
//! 1. **File Type Box (`ftyp`)**: brand and compatibility information, first in the file.
//! 2. **Media Data Box (`mdat`)**: the compressed samples of every track, back to back.
//! 3. **Movie Box (`moov`)**: the index. For every track (`trak`) it holds the header (`tkhd`),
//!    the media header (`mdhd`), the handler (`hdlr`) and a sample table (`stbl`) that tells
//!    where each sample lives in `mdat`, how long it lasts and whether it is a sync sample.
//!
//! `moov` may come before `mdat` ("fast start") or after it; both layouts are read.
//!
//! ### Box headers
//! - `size` (32 bit) + `type` (4 bytes).
//! - `size == 1`: a 64-bit `largesize` follows the type. Used for large `mdat` boxes.
//! - `size == 0`: the box extends to the end of the file (top level only).
//!
//! ## Sample tables
//! A track's samples are described by several run-length tables inside `stbl`:
//! - `stts`: decode time deltas.
//! - `ctts`: composition offsets (presentation time = decode time + offset).
//! - `stss`: sync samples (absent means every sample is a sync sample).
//! - `stsc`: how samples are grouped into chunks.
//! - `stsz`: sample sizes.
//! - `stco` / `co64`: absolute file offsets of the chunks.
//!
//! ## Implementation in This Library
//! - The `boxes` module defines the box types and their (de)serialisation.
//! - The `reader` module scans top-level boxes from a `Read + Seek` stream and loads `moov`.
//! - The `sample_table` module flattens a `stbl` into one entry per sample.
//! - The `writer` module builds a progressive `moov` from samples written to an `mdat`.

pub mod boxes;
pub mod reader;
pub mod sample_table;
pub mod writer;

pub fn format_fourcc(fourcc: &[u8; 4]) -> String {
    std::str::from_utf8(fourcc).unwrap_or("????").to_string()
}

pub fn format_capped_bytes(data: &[u8]) -> String {
    let capped = &data[..data.len().min(8)];
    if data.len() > 8 {
        format!("{:?} ...", capped)
    } else {
        format!("{:?}", capped)
    }
}

fn read_array<const N: usize>(data: &[u8], offset: usize) -> Result<[u8; N], String> {
    offset
        .checked_add(N)
        .and_then(|end| data.get(offset..end))
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| format!("Out of bounds while reading {} bytes at offset {}", N, offset))
}

pub fn read_u8(data: &[u8], offset: usize) -> Result<u8, String> {
    data.get(offset)
        .copied()
        .ok_or_else(|| format!("Out of bounds while reading u8 at offset {}", offset))
}

pub fn read_u16_be(data: &[u8], offset: usize) -> Result<u16, String> {
    read_array::<2>(data, offset).map(u16::from_be_bytes)
}

pub fn read_u32_be(data: &[u8], offset: usize) -> Result<u32, String> {
    read_array::<4>(data, offset).map(u32::from_be_bytes)
}

pub fn read_i32_be(data: &[u8], offset: usize) -> Result<i32, String> {
    read_array::<4>(data, offset).map(i32::from_be_bytes)
}

pub fn read_u64_be(data: &[u8], offset: usize) -> Result<u64, String> {
    read_array::<8>(data, offset).map(u64::from_be_bytes)
}

pub fn read_fourcc(data: &[u8], offset: usize) -> Result<[u8; 4], String> {
    read_array::<4>(data, offset)
}

/// Reads the full-box version and 24-bit flags that follow the 8-byte box header.
pub fn read_version_and_flags(data: &[u8]) -> Result<(u8, u32), String> {
    let word = read_u32_be(data, 8)?;
    Ok(((word >> 24) as u8, word & 0x00FF_FFFF))
}

pub fn write_version_and_flags(buffer: &mut Vec<u8>, version: u8, flags: u32) {
    buffer.push(version);
    buffer.push(((flags >> 16) & 0xFF) as u8);
    buffer.push(((flags >> 8) & 0xFF) as u8);
    buffer.push((flags & 0xFF) as u8);
}

/// Validates the compact header of a box of type `expected` at the start of `data`
/// and returns the declared box size.
pub fn check_box_header(data: &[u8], expected: &[u8; 4]) -> Result<usize, String> {
    let name = format_fourcc(expected).to_uppercase();
    let size = read_u32_be(data, 0).map_err(|_| format!("{} box too small", name))? as usize;
    if size < 8 || data.len() < size {
        return Err(format!("Incomplete {} box", name));
    }
    if &read_fourcc(data, 4)? != expected {
        return Err(format!("Not a {} box", name));
    }
    Ok(size)
}

/// Checks that a table of `count` entries of `entry_size` bytes starting at `start` fits in
/// a box of `size` bytes.
pub fn check_table_fits(name: &str, size: usize, start: usize, count: u32, entry_size: usize) -> Result<(), String> {
    let needed = (count as usize)
        .checked_mul(entry_size)
        .and_then(|n| n.checked_add(start));
    match needed {
        Some(needed) if needed <= size => Ok(()),
        _ => Err(format!("{} box size mismatch with entry count", name)),
    }
}
