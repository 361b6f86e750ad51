use crate::{check_box_header, format_fourcc, read_u32_be, read_version_and_flags, write_version_and_flags};

use super::generic::{ChildBoxes, Mp4Box};

// The `DrefBox` struct represents a Data Reference Box in the MP4 file format.
// It lists data entries that say where the media data is located. Files written by this
// library carry a single self-contained `url ` entry.
#[derive(Clone)]
pub struct DrefBox {
    pub version: u8,
    pub flags: u32,
    pub entries: Vec<DataEntryUrlBox>,
}

// The `DataEntryUrlBox` struct represents a Data Entry URL Box.
// A flag value of `0x000001` indicates that the data is in the same file.
#[derive(Clone)]
pub struct DataEntryUrlBox {
    pub version: u8,
    pub flags: u32,
    pub location: Option<String>,
}

impl Default for DrefBox {
    fn default() -> Self {
        DrefBox {
            version: 0,
            flags: 0,
            entries: vec![DataEntryUrlBox::default()],
        }
    }
}

impl Default for DataEntryUrlBox {
    fn default() -> Self {
        DataEntryUrlBox {
            version: 0,
            flags: 0x000001,  // Self-contained data
            location: None,
        }
    }
}

impl std::fmt::Debug for DrefBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrefBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("entries", &self.entries)
            .finish()
    }
}

impl std::fmt::Debug for DataEntryUrlBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut dbg = f.debug_struct("DataEntryUrlBox");
        dbg.field("flags", &format!("0x{:06X}", self.flags));
        if let Some(loc) = &self.location {
            dbg.field("location", loc);
        }
        dbg.finish()
    }
}

impl Mp4Box for DrefBox {
    fn box_type(&self) -> [u8; 4] { *b"dref" }

    // 8 header + 4 version/flags + 4 entry_count + entries.
    fn box_size(&self) -> u32 {
        8 + 4 + 4 + self.entries.iter().map(|e| e.box_size()).sum::<u32>()
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        write_version_and_flags(buffer, self.version, self.flags);
        buffer.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());
        for entry in &self.entries {
            entry.write_box(buffer);
        }
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = check_box_header(data, b"dref")?;
        let data = &data[..size];
        let (version, flags) = read_version_and_flags(data)?;
        let entry_count = read_u32_be(data, 12)?;

        // `urn ` and other entry kinds are skipped; only `url ` is modelled.
        let mut entries = Vec::new();
        for child in ChildBoxes::new(data, 16, size, "DREF").take(entry_count as usize) {
            let (box_type, slice) = child?;
            if &box_type != b"url " {
                continue;
            }
            let (version, flags) = read_version_and_flags(slice)?;
            let location = if slice.len() > 12 {
                let loc = String::from_utf8_lossy(&slice[12..]);
                Some(loc.trim_end_matches('\0').to_string())
            } else {
                None
            };
            entries.push(DataEntryUrlBox { version, flags, location });
        }

        Ok((DrefBox { version, flags, entries }, size))
    }
}

impl DataEntryUrlBox {
    fn box_size(&self) -> u32 {
        12 + self.location.as_ref().map_or(0, |l| l.len() as u32 + 1)
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(b"url ");
        write_version_and_flags(buffer, self.version, self.flags);
        if let Some(location) = &self.location {
            buffer.extend_from_slice(location.as_bytes());
            buffer.push(0);
        }
    }
}
