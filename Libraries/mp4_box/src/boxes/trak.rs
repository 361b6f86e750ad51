use crate::{check_box_header, format_fourcc};

use super::{generic::{write_child, ChildBoxes, Mp4Box}, mdia::MdiaBox, tkhd::TkhdBox};

// The `TrakBox` struct represents a Track Box in the MP4 file format.
// This box is a container for all the information related to a single track in the movie.
//
// Fields:
// - `tkhd`: The Track Header Box (id, duration, dimensions, display matrix).
// - `mdia`: The Media Box (timescale, handler and sample table).
//
// Edit lists and track-level metadata are skipped when reading.
#[derive(Default, Clone)]
pub struct TrakBox { // Track Box
    pub tkhd: TkhdBox, // Track Header Box
    pub mdia: MdiaBox, // Media Box
}

impl std::fmt::Debug for TrakBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrakBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("tkhd", &self.tkhd)
            .field("mdia", &self.mdia)
            .finish()
    }
}

impl Mp4Box for TrakBox {
    fn box_type(&self) -> [u8; 4] { *b"trak" }

    fn box_size(&self) -> u32 {
        8 + self.tkhd.box_size() + self.mdia.box_size()
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        write_child(buffer, &self.tkhd);
        write_child(buffer, &self.mdia);
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = check_box_header(data, b"trak")?;

        let mut tkhd = None;
        let mut mdia = None;

        for child in ChildBoxes::new(data, 8, size, "TRAK") {
            let (box_type, slice) = child?;
            match &box_type {
                b"tkhd" => {
                    if tkhd.is_some() {
                        return Err("Duplicate TKHD box inside TRAK".into());
                    }
                    tkhd = Some(TkhdBox::read_box(slice)?.0);
                }
                b"mdia" => {
                    if mdia.is_some() {
                        return Err("Duplicate MDIA box inside TRAK".into());
                    }
                    mdia = Some(MdiaBox::read_box(slice)?.0);
                }
                _ => {
                    // Skip unknown boxes safely
                }
            }
        }

        Ok((
            TrakBox {
                tkhd: tkhd.ok_or("Missing required TKHD box inside TRAK")?,
                mdia: mdia.ok_or("Missing required MDIA box inside TRAK")?,
            },
            size
        ))
    }
}
