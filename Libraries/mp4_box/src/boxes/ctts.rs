use crate::{check_box_header, check_table_fits, format_fourcc, read_i32_be, read_u32_be, read_version_and_flags, write_version_and_flags};

use super::generic::Mp4Box;

/// Represents a single entry in the `CttsBox`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CttsEntry {
    pub sample_count: u32,
    pub sample_offset: i32,  // Always stored as i32 for internal consistency
}

/// The `CttsBox` represents the Composition Time to Sample Box in MP4.
/// It maps samples to their composition time offsets. Version 1 allows negative offsets.
#[derive(Clone, Default)]
pub struct CttsBox {
    pub version: u8,
    pub flags: u32,
    pub entries: Vec<CttsEntry>,
}

impl CttsBox {
    /// Run-length encodes per-sample composition offsets, choosing version 1 when any is negative.
    pub fn from_offsets(offsets: impl IntoIterator<Item = i32>) -> Self {
        let mut entries: Vec<CttsEntry> = Vec::new();
        for offset in offsets {
            match entries.last_mut() {
                Some(last) if last.sample_offset == offset => last.sample_count += 1,
                _ => entries.push(CttsEntry { sample_count: 1, sample_offset: offset }),
            }
        }
        let version = if entries.iter().any(|e| e.sample_offset < 0) { 1 } else { 0 };
        CttsBox { version, flags: 0, entries }
    }
}

impl std::fmt::Debug for CttsBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CttsBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("version", &self.version)
            .field("entries", &self.entries)
            .finish()
    }
}

impl Mp4Box for CttsBox {
    fn box_type(&self) -> [u8; 4] { *b"ctts" }

    fn box_size(&self) -> u32 {
        8 + 4 + 4 + (self.entries.len() as u32) * 8
        // 8 = header, 4 = version+flags, 4 = entry_count, each entry = 8 bytes
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        write_version_and_flags(buffer, self.version, self.flags);
        buffer.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());
        for entry in &self.entries {
            buffer.extend_from_slice(&entry.sample_count.to_be_bytes());
            // Same bit pattern for both versions; only the interpretation differs.
            buffer.extend_from_slice(&entry.sample_offset.to_be_bytes());
        }
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = check_box_header(data, b"ctts")?;
        let data = &data[..size];
        let (version, flags) = read_version_and_flags(data)?;
        if version > 1 {
            return Err(format!("Unsupported CTTS version: {}", version));
        }
        let entry_count = read_u32_be(data, 12)?;
        check_table_fits("CTTS", size, 16, entry_count, 8)?;

        let mut entries = Vec::with_capacity(entry_count as usize);
        let mut offset = 16;
        for _ in 0..entry_count {
            let sample_count = read_u32_be(data, offset)?;
            let sample_offset = if version == 0 {
                // Unsigned in version 0; values above i32::MAX are written by some
                // muxers to mean small negative offsets.
                read_u32_be(data, offset + 4)? as i32
            } else {
                read_i32_be(data, offset + 4)?
            };
            entries.push(CttsEntry { sample_count, sample_offset });
            offset += 8;
        }

        Ok((CttsBox { version, flags, entries }, size))
    }
}
