use crate::{check_box_header, format_fourcc};

use super::{dref::DrefBox, generic::{write_child, ChildBoxes, Mp4Box}};

// The `DinfBox` struct represents a Data Information Box in the MP4 file format.
// It holds a single `DrefBox` describing where the media data of the track is stored.
#[derive(Default, Clone)]
pub struct DinfBox {
    pub dref: DrefBox,
}

impl std::fmt::Debug for DinfBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DinfBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("dref", &self.dref)
            .finish()
    }
}

impl Mp4Box for DinfBox {
    fn box_type(&self) -> [u8; 4] { *b"dinf" }

    fn box_size(&self) -> u32 {
        8 + self.dref.box_size()
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        write_child(buffer, &self.dref);
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = check_box_header(data, b"dinf")?;

        let mut dref = None;
        for child in ChildBoxes::new(data, 8, size, "DINF") {
            let (box_type, slice) = child?;
            if &box_type == b"dref" {
                dref = Some(DrefBox::read_box(slice)?.0);
            }
        }

        Ok((DinfBox { dref: dref.unwrap_or_default() }, size))
    }
}
