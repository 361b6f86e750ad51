use crate::{check_box_header, format_capped_bytes, format_fourcc, read_u16_be, read_u32_be, read_version_and_flags, write_version_and_flags};

use super::generic::{ChildBoxes, Mp4Box};

// The `StsdBox` struct represents a Sample Description Box in the MP4 file format.
// This box contains a table of sample descriptions, which describe the codec and its
// configuration (e.g. `avc1` + `avcC`, `mp4a` + `esds`). The entries are kept as opaque byte
// blobs: they are copied from one file to another without being interpreted.
#[derive(Clone, Default)]
pub struct StsdBox { // Sample Description Box
    pub version: u8,
    pub flags: u32,
    pub entries: Vec<SampleEntry>,  // Typically 1 entry
}

// The `SampleEntry` struct holds one complete sample entry box, header included.
#[derive(Clone, PartialEq, Eq)]
pub struct SampleEntry {
    pub format: [u8; 4],  // e.g., b"avc1", b"hvc1", b"mp4a"
    pub raw: Vec<u8>,
}

impl SampleEntry {
    /// Wraps an entry body (everything after the 8-byte header) into a sample entry box.
    pub fn from_body(format: [u8; 4], body: &[u8]) -> Self {
        let mut raw = Vec::with_capacity(body.len() + 8);
        raw.extend_from_slice(&(body.len() as u32 + 8).to_be_bytes());
        raw.extend_from_slice(&format);
        raw.extend_from_slice(body);
        SampleEntry { format, raw }
    }

    /// Width and height stored in a visual sample entry. Only meaningful for video tracks.
    pub fn visual_size(&self) -> Option<(u16, u16)> {
        let width = read_u16_be(&self.raw, 32).ok()?;
        let height = read_u16_be(&self.raw, 34).ok()?;
        Some((width, height))
    }
}

impl std::fmt::Debug for StsdBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StsdBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("descriptions", &self.entries)
            .finish()
    }
}

impl std::fmt::Debug for SampleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleEntry")
            .field("format", &format_fourcc(&self.format))
            .field("size", &self.raw.len())
            .field("raw", &format_capped_bytes(&self.raw))
            .finish()
    }
}

impl Mp4Box for StsdBox {
    fn box_type(&self) -> [u8; 4] { *b"stsd" }

    // 8 header + 4 version/flags + 4 entry_count + entries.
    fn box_size(&self) -> u32 {
        16 + self.entries.iter().map(|e| e.raw.len() as u32).sum::<u32>()
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        write_version_and_flags(buffer, self.version, self.flags);
        buffer.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());
        for entry in &self.entries {
            buffer.extend_from_slice(&entry.raw);
        }
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = check_box_header(data, b"stsd")?;
        let data = &data[..size];
        let (version, flags) = read_version_and_flags(data)?;
        let entry_count = read_u32_be(data, 12)?;

        let mut entries = Vec::new();
        for child in ChildBoxes::new(data, 16, size, "STSD").take(entry_count as usize) {
            let (format, slice) = child?;
            entries.push(SampleEntry { format, raw: slice.to_vec() });
        }
        if entries.len() != entry_count as usize {
            return Err(format!("STSD declares {} entries but holds {}", entry_count, entries.len()));
        }

        Ok((StsdBox { version, flags, entries }, size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_copied_verbatim() {
        let mut body = vec![0u8; 78];
        body[24..26].copy_from_slice(&1280u16.to_be_bytes());
        body[26..28].copy_from_slice(&720u16.to_be_bytes());
        body.extend_from_slice(&[0, 0, 0, 12, b'a', b'v', b'c', b'C', 1, 2, 3, 4]);
        let entry = SampleEntry::from_body(*b"avc1", &body);
        assert_eq!(entry.visual_size(), Some((1280, 720)));

        let stsd = StsdBox { entries: vec![entry.clone()], ..Default::default() };
        let mut buffer = Vec::new();
        stsd.write_box(&mut buffer);
        assert_eq!(buffer.len(), stsd.box_size() as usize);

        let (parsed, _) = StsdBox::read_box(&buffer).unwrap();
        assert_eq!(parsed.entries, vec![entry]);
    }

    #[test]
    fn missing_entries_are_an_error() {
        let mut buffer = Vec::new();
        StsdBox::default().write_box(&mut buffer);
        buffer[15] = 2; // claim two entries, hold none
        assert!(StsdBox::read_box(&buffer).is_err());
    }
}
