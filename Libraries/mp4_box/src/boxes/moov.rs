use crate::{check_box_header, format_fourcc};

use super::{generic::{write_child, ChildBoxes, Mp4Box}, mvhd::MvhdBox, trak::TrakBox};

// The `MoovBox` struct represents a Movie Box in the MP4 file format.
// This box is a container for all the metadata related to the entire movie.
// It contains the following fields:
// - `mvhd`: The Movie Header Box, which contains global information about the movie.
// - `traks`: The Track Boxes, one per track, holding the per-track sample tables.
//
// Other children (`udta`, `meta`, `iods`, ...) are skipped when reading and never written.
#[derive(Default, Clone)]
pub struct MoovBox { // Movie Box
    pub mvhd: MvhdBox,             // Movie Header Box (mandatory)
    pub traks: Vec<TrakBox>,       // One or more Track Boxes
}

impl std::fmt::Debug for MoovBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MoovBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("mvhd", &self.mvhd)
            .field("traks", &self.traks)
            .finish()
    }
}

impl Mp4Box for MoovBox {
    fn box_type(&self) -> [u8; 4] { *b"moov" }

    fn box_size(&self) -> u32 {
        8 + self.mvhd.box_size() +
        self.traks.iter().map(|t| t.box_size()).sum::<u32>()
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        write_child(buffer, &self.mvhd);
        for trak in &self.traks {
            write_child(buffer, trak);
        }
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = check_box_header(data, b"moov")?;

        let mut mvhd = None;
        let mut traks = Vec::new();

        for child in ChildBoxes::new(data, 8, size, "MOOV") {
            let (box_type, slice) = child?;
            match &box_type {
                b"mvhd" => {
                    if mvhd.is_some() {
                        return Err("Duplicate MVHD box inside MOOV".into());
                    }
                    mvhd = Some(MvhdBox::read_box(slice)?.0);
                }
                b"trak" => traks.push(TrakBox::read_box(slice)?.0),
                _ => {}
            }
        }

        let mvhd = mvhd.ok_or("Missing required MVHD box inside MOOV")?;

        Ok((MoovBox { mvhd, traks }, size))
    }
}
