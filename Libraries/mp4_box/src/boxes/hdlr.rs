use crate::{check_box_header, format_fourcc, read_fourcc, read_version_and_flags, write_version_and_flags};

use super::generic::Mp4Box;

// The `HdlrBox` struct represents a Handler Reference Box in the MP4 file format.
// This box specifies the type of media and provides a name for the handler.
// It contains the following fields:
// - `handler_type`: "vide" for video, "soun" for audio, anything else for other media.
// - `name`: A null-terminated string providing a human-readable name for the handler.
#[derive(Clone)]
pub struct HdlrBox {
    pub version: u8,
    pub flags: u32,
    pub handler_type: [u8; 4], // Type of media (e.g., "vide" for video).
    pub name: String,  // Null-terminated string providing the handler name.
}

impl Default for HdlrBox {
    fn default() -> Self {
        HdlrBox {
            version: 0,
            flags: 0,
            handler_type: *b"vide",
            name: "VideoHandler".to_string(),
        }
    }
}

impl std::fmt::Debug for HdlrBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HdlrBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("handler_type", &format_fourcc(&self.handler_type))
            .field("name", &self.name)
            .finish()
    }
}

impl Mp4Box for HdlrBox {
    fn box_type(&self) -> [u8; 4] { *b"hdlr" }

    // 8 header + 4 version/flags + 4 pre_defined + 4 handler_type + 12 reserved + name + NUL.
    fn box_size(&self) -> u32 {
        8 + 4 + 4 + 4 + 12 + (self.name.len() as u32 + 1)
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        write_version_and_flags(buffer, self.version, self.flags);
        buffer.extend_from_slice(&0u32.to_be_bytes());  // pre_defined
        buffer.extend_from_slice(&self.handler_type);
        buffer.extend_from_slice(&[0u8; 12]);  // reserved
        buffer.extend_from_slice(self.name.as_bytes());
        buffer.push(0);
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = check_box_header(data, b"hdlr")?;
        if size < 32 {
            return Err("HDLR box too small".into());
        }
        let data = &data[..size];
        let (version, flags) = read_version_and_flags(data)?;
        let handler_type = read_fourcc(data, 16)?;

        let name_bytes = data.get(32..).unwrap_or(&[]);
        let name_end = name_bytes.iter().position(|&b| b == 0).unwrap_or(name_bytes.len());
        let name = String::from_utf8_lossy(&name_bytes[..name_end]).to_string();

        Ok((
            HdlrBox {
                version,
                flags,
                handler_type,
                name,
            },
            size
        ))
    }
}
