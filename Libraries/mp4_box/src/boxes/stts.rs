use crate::{check_box_header, check_table_fits, format_fourcc, read_u32_be, read_version_and_flags, write_version_and_flags};

use super::generic::Mp4Box;

// The `SttsBox` struct represents a Time-to-Sample Box in the MP4 file format.
// This box maps decoding times to samples: each entry says that `sample_count`
// consecutive samples each last `sample_delta` timescale units.
#[derive(Clone, Default)]
pub struct SttsBox { // Time to Sample Box
    pub version: u8,
    pub flags: u32,
    pub entries: Vec<SttsEntry>, // List of time-to-sample entries
}

#[derive(Default, Clone, PartialEq, Eq)]
pub struct SttsEntry {
    pub sample_count: u32,
    pub sample_delta: u32,
}

impl SttsBox {
    /// Run-length encodes a list of per-sample durations.
    pub fn from_deltas(deltas: impl IntoIterator<Item = u32>) -> Self {
        let mut entries: Vec<SttsEntry> = Vec::new();
        for delta in deltas {
            match entries.last_mut() {
                Some(last) if last.sample_delta == delta => last.sample_count += 1,
                _ => entries.push(SttsEntry { sample_count: 1, sample_delta: delta }),
            }
        }
        SttsBox { entries, ..Default::default() }
    }
}

impl std::fmt::Debug for SttsBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SttsBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("entries", &self.entries)
            .finish()
    }
}

impl std::fmt::Debug for SttsEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SttsEntry")
            .field("sample_count", &self.sample_count)
            .field("sample_delta", &self.sample_delta)
            .finish()
    }
}

impl Mp4Box for SttsBox {
    fn box_type(&self) -> [u8; 4] { *b"stts" }

    fn box_size(&self) -> u32 {
        8 + 4 + 4 + (self.entries.len() as u32 * 8)
        // 8 header + 4 version/flags + 4 entry_count + entries
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        write_version_and_flags(buffer, self.version, self.flags);
        buffer.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());
        for entry in &self.entries {
            buffer.extend_from_slice(&entry.sample_count.to_be_bytes());
            buffer.extend_from_slice(&entry.sample_delta.to_be_bytes());
        }
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = check_box_header(data, b"stts")?;
        let data = &data[..size];
        let (version, flags) = read_version_and_flags(data)?;
        let entry_count = read_u32_be(data, 12)?;
        check_table_fits("STTS", size, 16, entry_count, 8)?;

        let mut entries = Vec::with_capacity(entry_count as usize);
        let mut offset = 16;
        for _ in 0..entry_count {
            let sample_count = read_u32_be(data, offset)?;
            let sample_delta = read_u32_be(data, offset + 4)?;
            entries.push(SttsEntry { sample_count, sample_delta });
            offset += 8;
        }

        Ok((SttsBox { version, flags, entries }, size))
    }
}
