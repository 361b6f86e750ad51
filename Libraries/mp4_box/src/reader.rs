use std::io::{Read, Seek, SeekFrom};

use byteorder::{BigEndian, ReadBytesExt};

use crate::boxes::{enums::Mp4BoxEnum, ftyp::FtypBox, generic::Mp4Box, moov::MoovBox};
use crate::format_fourcc;

/// Location of a box inside a stream. Only the header has been read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoxHeader {
    pub box_type: [u8; 4],
    pub offset: u64,      // Absolute position of the first header byte
    pub header_size: u64, // 8, or 16 when `largesize` is used
    pub size: u64,        // Total size, header included
}

impl BoxHeader {
    pub fn payload_offset(&self) -> u64 {
        self.offset + self.header_size
    }

    pub fn payload_size(&self) -> u64 {
        self.size - self.header_size
    }

    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// Reads the box header at the current stream position. `stream_len` resolves boxes
/// with `size == 0`, which run until the end of the stream.
pub fn read_box_header<R: Read + Seek>(reader: &mut R, stream_len: u64) -> Result<BoxHeader, String> {
    let offset = reader.stream_position().map_err(|e| e.to_string())?;
    let size = reader
        .read_u32::<BigEndian>()
        .map_err(|e| format!("Failed to read box size at offset {}: {}", offset, e))?;
    let mut box_type = [0u8; 4];
    reader
        .read_exact(&mut box_type)
        .map_err(|e| format!("Failed to read box type at offset {}: {}", offset, e))?;

    let (size, header_size) = match size {
        0 => (stream_len.saturating_sub(offset), 8),
        1 => {
            let largesize = reader
                .read_u64::<BigEndian>()
                .map_err(|e| format!("Failed to read largesize of '{}': {}", format_fourcc(&box_type), e))?;
            (largesize, 16)
        }
        size => (size as u64, 8),
    };

    if size < header_size {
        return Err(format!("Invalid size {} for box '{}' at offset {}", size, format_fourcc(&box_type), offset));
    }
    let end = offset
        .checked_add(size)
        .ok_or_else(|| format!("Size {} of box '{}' at offset {} overflows", size, format_fourcc(&box_type), offset))?;
    if end > stream_len {
        return Err(format!(
            "Box '{}' at offset {} overruns the stream ({} > {} bytes)",
            format_fourcc(&box_type),
            offset,
            end,
            stream_len
        ));
    }

    Ok(BoxHeader { box_type, offset, header_size, size })
}

fn stream_len<R: Seek>(reader: &mut R) -> Result<u64, String> {
    let len = reader.seek(SeekFrom::End(0)).map_err(|e| e.to_string())?;
    reader.seek(SeekFrom::Start(0)).map_err(|e| e.to_string())?;
    Ok(len)
}

/// Lists the top-level boxes of a stream without loading their payloads.
pub fn scan_top_level<R: Read + Seek>(reader: &mut R) -> Result<Vec<BoxHeader>, String> {
    let len = stream_len(reader)?;
    let mut headers = Vec::new();
    let mut position = 0;

    // Fewer than 8 trailing bytes cannot hold a box and are ignored.
    while position + 8 <= len {
        reader.seek(SeekFrom::Start(position)).map_err(|e| e.to_string())?;
        let header = read_box_header(reader, len)?;
        position = header.end();
        headers.push(header);
    }

    Ok(headers)
}

fn read_payload<R: Read + Seek>(reader: &mut R, header: &BoxHeader) -> Result<Vec<u8>, String> {
    let size = usize::try_from(header.size)
        .map_err(|_| format!("Box '{}' is too large to load", format_fourcc(&header.box_type)))?;
    let mut data = vec![0u8; size];
    reader.seek(SeekFrom::Start(header.offset)).map_err(|e| e.to_string())?;
    reader
        .read_exact(&mut data)
        .map_err(|e| format!("Failed to read box '{}': {}", format_fourcc(&header.box_type), e))?;

    // Child parsers expect a compact header, so a 64-bit header is rewritten in place.
    if header.header_size == 16 {
        let compact = u32::try_from(header.size - 8)
            .map_err(|_| format!("Box '{}' is too large to parse", format_fourcc(&header.box_type)))?;
        data.drain(0..8);
        data[0..4].copy_from_slice(&compact.to_be_bytes());
        data[4..8].copy_from_slice(&header.box_type);
    }
    Ok(data)
}

/// Locates and parses the `moov` box, wherever it sits in the file.
pub fn read_moov<R: Read + Seek>(reader: &mut R) -> Result<MoovBox, String> {
    let headers = scan_top_level(reader)?;
    let header = headers
        .iter()
        .find(|h| &h.box_type == b"moov")
        .ok_or_else(|| "No moov box found".to_string())?;
    if header.size > u32::MAX as u64 {
        return Err("moov box larger than 4 GiB is not supported".into());
    }
    let data = read_payload(reader, header)?;
    let (moov, _) = MoovBox::read_box(&data)?;
    Ok(moov)
}

/// Reads all top-level boxes. `ftyp` and `moov` are parsed; other boxes are kept as headers.
pub fn read_top_level_boxes<R: Read + Seek>(reader: &mut R) -> Result<Vec<Mp4BoxEnum>, String> {
    let headers = scan_top_level(reader)?;
    let mut boxes = Vec::with_capacity(headers.len());

    for header in headers {
        let parsed = match &header.box_type {
            b"ftyp" => {
                let data = read_payload(reader, &header)?;
                Mp4BoxEnum::Ftyp(FtypBox::read_box(&data)?.0)
            }
            b"moov" => {
                let data = read_payload(reader, &header)?;
                Mp4BoxEnum::Moov(MoovBox::read_box(&data)?.0)
            }
            b"mdat" => Mp4BoxEnum::Mdat(header),
            _ => Mp4BoxEnum::Other(header),
        };
        boxes.push(parsed);
    }

    Ok(boxes)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn raw_box(box_type: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut data = ((payload.len() + 8) as u32).to_be_bytes().to_vec();
        data.extend_from_slice(box_type);
        data.extend_from_slice(payload);
        data
    }

    #[test]
    fn scans_compact_and_large_headers() {
        let mut data = raw_box(b"ftyp", &[0; 8]);
        data.extend_from_slice(&1u32.to_be_bytes());
        data.extend_from_slice(b"mdat");
        data.extend_from_slice(&20u64.to_be_bytes());
        data.extend_from_slice(&[7, 7, 7, 7]);
        data.extend(raw_box(b"free", &[]));

        let headers = scan_top_level(&mut Cursor::new(data)).unwrap();
        assert_eq!(headers.len(), 3);
        assert_eq!(&headers[1].box_type, b"mdat");
        assert_eq!(headers[1].header_size, 16);
        assert_eq!(headers[1].payload_offset(), 32);
        assert_eq!(headers[1].payload_size(), 4);
        assert_eq!(headers[2].offset, 36);
    }

    #[test]
    fn zero_size_runs_to_end() {
        let mut data = raw_box(b"free", &[]);
        data.extend_from_slice(&0u32.to_be_bytes());
        data.extend_from_slice(b"mdat");
        data.extend_from_slice(&[1, 2, 3]);

        let headers = scan_top_level(&mut Cursor::new(data)).unwrap();
        assert_eq!(headers[1].size, 11);
        assert_eq!(headers[1].payload_size(), 3);
    }

    #[test]
    fn overrunning_box_is_an_error() {
        let mut data = raw_box(b"free", &[1, 2, 3]);
        data[3] = 200;
        assert!(scan_top_level(&mut Cursor::new(data)).is_err());

        // A largesize that wraps around when added to the box offset.
        let mut data = raw_box(b"free", &[1, 2, 3]);
        data.extend_from_slice(&1u32.to_be_bytes());
        data.extend_from_slice(b"mdat");
        data.extend_from_slice(&(u64::MAX - 4).to_be_bytes());
        let err = scan_top_level(&mut Cursor::new(data)).unwrap_err();
        assert!(err.contains("overflows"));
    }

    #[test]
    fn missing_moov_is_an_error() {
        let data = raw_box(b"free", &[]);
        let err = read_moov(&mut Cursor::new(data)).unwrap_err();
        assert!(err.contains("moov"));
    }

    #[test]
    fn moov_after_mdat_is_found() {
        let moov = MoovBox::default();
        let mut encoded = Vec::new();
        moov.write_box(&mut encoded);

        let mut data = raw_box(b"mdat", &[0; 32]);
        data.extend(encoded);
        let parsed = read_moov(&mut Cursor::new(data)).unwrap();
        assert!(parsed.traks.is_empty());
        assert_eq!(parsed.mvhd.timescale, 1000);
    }
}
