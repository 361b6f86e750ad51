use crate::{check_box_header, format_fourcc};

use super::{generic::{write_child, ChildBoxes, Mp4Box}, hdlr::HdlrBox, mdhd::MdhdBox, minf::MinfBox};

// The `MdiaBox` struct represents a Media Box in the MP4 file format.
// This box is a container for media information and includes the following sub-boxes:
// - `MdhdBox`: The Media Header Box, which contains the media timescale, duration and language.
// - `HdlrBox`: The Handler Reference Box, which tells video, audio and other media apart.
// - `MinfBox`: The Media Information Box, which holds the sample table.
#[derive(Default, Clone)]
pub struct MdiaBox { // Media Box
    pub mdhd: MdhdBox, // Media Header Box
    pub hdlr: HdlrBox, // Handler Reference Box
    pub minf: MinfBox, // Media Information Box
}

impl std::fmt::Debug for MdiaBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MdiaBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("mdhd", &self.mdhd)
            .field("hdlr", &self.hdlr)
            .field("minf", &self.minf)
            .finish()
    }
}

impl Mp4Box for MdiaBox {
    fn box_type(&self) -> [u8; 4] { *b"mdia" }

    fn box_size(&self) -> u32 {
        8 + self.mdhd.box_size() + self.hdlr.box_size() + self.minf.box_size()
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        write_child(buffer, &self.mdhd);
        write_child(buffer, &self.hdlr);
        write_child(buffer, &self.minf);
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = check_box_header(data, b"mdia")?;

        let mut mdhd = None;
        let mut hdlr = None;
        let mut minf = None;

        // Children are matched by type; some writers do not keep the mdhd/hdlr/minf order.
        for child in ChildBoxes::new(data, 8, size, "MDIA") {
            let (box_type, slice) = child?;
            match &box_type {
                b"mdhd" => mdhd = Some(MdhdBox::read_box(slice)?.0),
                b"hdlr" => hdlr = Some(HdlrBox::read_box(slice)?.0),
                b"minf" => minf = Some(MinfBox::read_box(slice)?.0),
                _ => {}
            }
        }

        Ok((
            MdiaBox {
                mdhd: mdhd.ok_or("Missing MDHD box inside MDIA")?,
                hdlr: hdlr.ok_or("Missing HDLR box inside MDIA")?,
                minf: minf.ok_or("Missing MINF box inside MDIA")?,
            },
            size
        ))
    }
}
