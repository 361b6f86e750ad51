use crate::{check_box_header, check_table_fits, format_fourcc, read_u32_be, read_version_and_flags, write_version_and_flags};

use super::generic::Mp4Box;

// The `StcoBox` struct represents a Chunk Offset Box in the MP4 file format.
// This box contains the 32-bit file offset of every chunk, relative to the beginning of the file.
// Files whose chunks start beyond 4 GiB use `Co64Box` instead.
#[derive(Clone, Default)]
pub struct StcoBox {  // Chunk Offset Box
    pub version: u8,        // Full box version (should be 0)
    pub flags: u32,         // Full box flags (24 bits used)
    pub entries: Vec<u32>,  // List of chunk offsets
}

impl std::fmt::Debug for StcoBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StcoBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl Mp4Box for StcoBox {
    fn box_type(&self) -> [u8; 4] { *b"stco" }

    fn box_size(&self) -> u32 {
        8 + 4 + 4 + (4 * self.entries.len() as u32)
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        write_version_and_flags(buffer, self.version, self.flags);
        buffer.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());
        for chunk_offset in &self.entries {
            buffer.extend_from_slice(&chunk_offset.to_be_bytes());
        }
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = check_box_header(data, b"stco")?;
        let data = &data[..size];
        let (version, flags) = read_version_and_flags(data)?;
        let entry_count = read_u32_be(data, 12)?;
        check_table_fits("STCO", size, 16, entry_count, 4)?;

        let entries = (0..entry_count as usize)
            .map(|i| read_u32_be(data, 16 + i * 4))
            .collect::<Result<Vec<_>, _>>()?;

        Ok((StcoBox { version, flags, entries }, size))
    }
}
