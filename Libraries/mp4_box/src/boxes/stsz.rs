use crate::{check_box_header, check_table_fits, format_fourcc, read_u32_be, read_version_and_flags, write_version_and_flags};

use super::generic::Mp4Box;

// The `StszBox` struct represents a Sample Size Box in the MP4 file format.
// When every sample has the same size it is stored once in `sample_size` together with
// `sample_count`; otherwise `sample_size` is 0 and `entry_sizes` lists every sample.
#[derive(Clone, Default)]
pub struct StszBox { // Sample Size Box
    pub version: u8,
    pub flags: u32,
    pub sample_size: u32, // Constant sample size, or 0
    pub sample_count: u32,
    pub entry_sizes: Vec<u32>, // Per-sample sizes when `sample_size` is 0
}

impl StszBox {
    /// Uses the constant-size form when all sizes are equal.
    pub fn from_sizes(sizes: Vec<u32>) -> Self {
        let sample_count = sizes.len() as u32;
        match sizes.first() {
            Some(&first) if first > 0 && sizes.iter().all(|&s| s == first) => StszBox {
                sample_size: first,
                sample_count,
                ..Default::default()
            },
            _ => StszBox { sample_count, entry_sizes: sizes, ..Default::default() },
        }
    }

    pub fn size_of(&self, index: usize) -> Option<u32> {
        if self.sample_size != 0 {
            (index < self.sample_count as usize).then_some(self.sample_size)
        } else {
            self.entry_sizes.get(index).copied()
        }
    }
}

impl std::fmt::Debug for StszBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StszBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("sample_size", &self.sample_size)
            .field("sample_count", &self.sample_count)
            .finish()
    }
}

impl Mp4Box for StszBox {
    fn box_type(&self) -> [u8; 4] { *b"stsz" }

    // 8 header + 4 version/flags + 4 sample_size + 4 sample_count + table when sizes vary.
    fn box_size(&self) -> u32 {
        let base = 8 + 4 + 4 + 4;
        if self.sample_size == 0 {
            base + (4 * self.entry_sizes.len() as u32)
        } else {
            base
        }
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        write_version_and_flags(buffer, self.version, self.flags);
        buffer.extend_from_slice(&self.sample_size.to_be_bytes());
        if self.sample_size == 0 {
            buffer.extend_from_slice(&(self.entry_sizes.len() as u32).to_be_bytes());
            for entry in &self.entry_sizes {
                buffer.extend_from_slice(&entry.to_be_bytes());
            }
        } else {
            buffer.extend_from_slice(&self.sample_count.to_be_bytes());
        }
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = check_box_header(data, b"stsz")?;
        let data = &data[..size];
        let (version, flags) = read_version_and_flags(data)?;
        let sample_size = read_u32_be(data, 12)?;
        let sample_count = read_u32_be(data, 16)?;

        let mut entry_sizes = Vec::new();
        if sample_size == 0 {
            check_table_fits("STSZ", size, 20, sample_count, 4)?;
            entry_sizes = (0..sample_count as usize)
                .map(|i| read_u32_be(data, 20 + i * 4))
                .collect::<Result<Vec<_>, _>>()?;
        }

        Ok((StszBox { version, flags, sample_size, sample_count, entry_sizes }, size))
    }
}
