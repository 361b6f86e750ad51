use crate::{check_box_header, format_fourcc, read_u16_be, read_u32_be, read_u64_be, read_version_and_flags, write_version_and_flags};

use super::generic::Mp4Box;

// The `MdhdBox` struct represents a Media Header Box in the MP4 file format.
// This box contains the timescale, duration, and language of the media.
//
// Fields:
// - `timescale`: Number of time units per second; every sample table of the track is expressed in it.
// - `duration`: Media duration in `timescale` units.
// - `language`: ISO 639-2/T language code (e.g., "und").
#[derive(Clone)]
pub struct MdhdBox { // Media Header Box
    pub version: u8,
    pub flags: u32,
    pub creation_time: u64,
    pub modification_time: u64,
    pub timescale: u32,
    pub duration: u64,
    pub language: String,  // ISO 639-2/T language code, e.g., "und"
}

impl Default for MdhdBox {
    fn default() -> Self {
        MdhdBox {
            version: 0,
            flags: 0,
            creation_time: 0,
            modification_time: 0,
            timescale: 90_000,
            duration: 0,
            language: "und".to_string(),
        }
    }
}

impl std::fmt::Debug for MdhdBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MdhdBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("version", &self.version)
            .field("timescale", &self.timescale)
            .field("duration", &self.duration)
            .field("language", &self.language)
            .finish()
    }
}

impl Mp4Box for MdhdBox {
    fn box_type(&self) -> [u8; 4] { *b"mdhd" }

    fn box_size(&self) -> u32 {
        let base = 8 + 4;  // header + version/flags
        let variable = if self.version == 1 { 28 } else { 16 };
        base + variable + 4  // + language (2) + pre_defined (2)
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        write_version_and_flags(buffer, self.version, self.flags);

        if self.version == 1 {
            buffer.extend_from_slice(&self.creation_time.to_be_bytes());
            buffer.extend_from_slice(&self.modification_time.to_be_bytes());
            buffer.extend_from_slice(&self.timescale.to_be_bytes());
            buffer.extend_from_slice(&self.duration.to_be_bytes());
        } else {
            buffer.extend_from_slice(&(self.creation_time as u32).to_be_bytes());
            buffer.extend_from_slice(&(self.modification_time as u32).to_be_bytes());
            buffer.extend_from_slice(&self.timescale.to_be_bytes());
            buffer.extend_from_slice(&(self.duration as u32).to_be_bytes());
        }

        buffer.extend_from_slice(&encode_language(&self.language).to_be_bytes());
        buffer.extend_from_slice(&0u16.to_be_bytes());  // pre_defined
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = check_box_header(data, b"mdhd")?;
        let data = &data[..size];
        let (version, flags) = read_version_and_flags(data)?;

        let (creation_time, modification_time, timescale, duration, lang_offset) = match version {
            1 => (
                read_u64_be(data, 12)?,
                read_u64_be(data, 20)?,
                read_u32_be(data, 28)?,
                read_u64_be(data, 32)?,
                40
            ),
            0 => (
                read_u32_be(data, 12)? as u64,
                read_u32_be(data, 16)? as u64,
                read_u32_be(data, 20)?,
                read_u32_be(data, 24)? as u64,
                28
            ),
            _ => return Err("Unsupported MDHD version".into()),
        };

        let language = decode_language(read_u16_be(data, lang_offset)?);

        Ok((
            MdhdBox {
                version,
                flags,
                creation_time,
                modification_time,
                timescale,
                duration,
                language,
            },
            size
        ))
    }
}

/// Packs a 3-letter ISO 639-2/T code into 15 bits. Anything else is stored as "und".
fn encode_language(lang: &str) -> u16 {
    let bytes = lang.as_bytes();
    let valid = bytes.len() == 3 && bytes.iter().all(|b| (0x60..=0x7F).contains(b));
    let bytes = if valid { bytes } else { b"und".as_slice() };
    (((bytes[0] - 0x60) as u16) << 10) |
    (((bytes[1] - 0x60) as u16) << 5)  |
    ((bytes[2] - 0x60) as u16)
}

fn decode_language(code: u16) -> String {
    let mut lang = String::new();
    lang.push((((code >> 10) & 0x1F) + 0x60) as u8 as char);
    lang.push((((code >> 5) & 0x1F) + 0x60) as u8 as char);
    lang.push(((code       & 0x1F) + 0x60) as u8 as char);
    lang
}
