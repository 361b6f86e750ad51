use crate::{check_box_header, check_table_fits, format_fourcc, read_u32_be, read_version_and_flags, write_version_and_flags};

use super::generic::Mp4Box;

// The `StscBox` struct represents a Sample-to-Chunk Box in the MP4 file format.
// Each entry says that, starting at `first_chunk` (1-based) and up to the next entry's
// first chunk, every chunk holds `samples_per_chunk` samples described by
// `sample_description_index`.
#[derive(Clone, Default)]
pub struct StscBox { // Sample-to-Chunk Box
    pub version: u8,
    pub flags: u32,
    pub entries: Vec<StscEntry>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct StscEntry {
    pub first_chunk: u32,
    pub samples_per_chunk: u32,
    pub sample_description_index: u32,
}

impl StscBox {
    /// Builds the table from the number of samples in each chunk, merging runs of equal chunks.
    pub fn from_chunk_sizes(chunk_sizes: &[u32]) -> Self {
        let mut entries: Vec<StscEntry> = Vec::new();
        for (i, &samples) in chunk_sizes.iter().enumerate() {
            if entries.last().map(|e| e.samples_per_chunk) != Some(samples) {
                entries.push(StscEntry {
                    first_chunk: i as u32 + 1,
                    samples_per_chunk: samples,
                    sample_description_index: 1,
                });
            }
        }
        StscBox { entries, ..Default::default() }
    }
}

impl std::fmt::Debug for StscBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StscBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("entries", &self.entries)
            .finish()
    }
}

impl std::fmt::Debug for StscEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StscEntry")
            .field("first_chunk", &self.first_chunk)
            .field("samples_per_chunk", &self.samples_per_chunk)
            .field("sample_description_index", &self.sample_description_index)
            .finish()
    }
}

impl Mp4Box for StscBox {
    fn box_type(&self) -> [u8; 4] { *b"stsc" }

    // 8 header + 4 version/flags + 4 entry_count + 12 per entry.
    fn box_size(&self) -> u32 {
        8 + 4 + 4 + (12 * self.entries.len() as u32)
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        write_version_and_flags(buffer, self.version, self.flags);
        buffer.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());
        for entry in &self.entries {
            buffer.extend_from_slice(&entry.first_chunk.to_be_bytes());
            buffer.extend_from_slice(&entry.samples_per_chunk.to_be_bytes());
            buffer.extend_from_slice(&entry.sample_description_index.to_be_bytes());
        }
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = check_box_header(data, b"stsc")?;
        let data = &data[..size];
        let (version, flags) = read_version_and_flags(data)?;
        let entry_count = read_u32_be(data, 12)?;
        check_table_fits("STSC", size, 16, entry_count, 12)?;

        let mut entries = Vec::with_capacity(entry_count as usize);
        let mut offset = 16;
        for _ in 0..entry_count {
            entries.push(StscEntry {
                first_chunk: read_u32_be(data, offset)?,
                samples_per_chunk: read_u32_be(data, offset + 4)?,
                sample_description_index: read_u32_be(data, offset + 8)?,
            });
            offset += 12;
        }

        Ok((StscBox { version, flags, entries }, size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_chunks_share_an_entry() {
        let stsc = StscBox::from_chunk_sizes(&[4, 4, 4, 2, 2, 5]);
        let firsts: Vec<_> = stsc.entries.iter().map(|e| (e.first_chunk, e.samples_per_chunk)).collect();
        assert_eq!(firsts, vec![(1, 4), (4, 2), (6, 5)]);
    }
}
