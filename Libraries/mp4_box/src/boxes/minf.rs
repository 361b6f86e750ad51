use crate::{check_box_header, format_fourcc};

use super::{dinf::DinfBox, generic::{write_child, ChildBoxes, Mp4Box}, smhd::SmhdBox, stbl::StblBox, vmhd::VmhdBox};

// The `MinfBox` struct represents a Media Information Box in the MP4 file format.
// This box is a container for media-specific information and includes the following sub-boxes:
// - `VmhdBox` or `SmhdBox`: The video or sound media header.
// - `DinfBox`: The Data Information Box, which says where the media data lives.
// - `StblBox`: The Sample Table Box, which indexes every sample of the track.
//
// Other media headers (`nmhd`, `sthd`, `gmhd`, ...) are skipped when reading.
#[derive(Default, Clone)]
pub struct MinfBox { // Media Information Box
    pub vmhd: Option<VmhdBox>,  // Video Media Header Box (optional)
    pub smhd: Option<SmhdBox>,  // Sound Media Header Box (optional)
    pub dinf: DinfBox, // Data Information Box
    pub stbl: StblBox, // Sample Table Box
}

impl std::fmt::Debug for MinfBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut dbg = f.debug_struct("MinfBox");
        dbg.field("box_size", &self.box_size())
           .field("box_type", &format_fourcc(&self.box_type()));
        if let Some(vmhd) = &self.vmhd {
            dbg.field("vmhd", vmhd);
        }
        if let Some(smhd) = &self.smhd {
            dbg.field("smhd", smhd);
        }
        dbg.field("dinf", &self.dinf)
           .field("stbl", &self.stbl)
           .finish()
    }
}

impl Mp4Box for MinfBox {
    fn box_type(&self) -> [u8; 4] { *b"minf" }

    fn box_size(&self) -> u32 {
        8 +
        self.vmhd.as_ref().map_or(0, |b| b.box_size()) +
        self.smhd.as_ref().map_or(0, |b| b.box_size()) +
        self.dinf.box_size() +
        self.stbl.box_size()
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        if let Some(vmhd) = &self.vmhd {
            write_child(buffer, vmhd);
        }
        if let Some(smhd) = &self.smhd {
            write_child(buffer, smhd);
        }
        write_child(buffer, &self.dinf);
        write_child(buffer, &self.stbl);
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = check_box_header(data, b"minf")?;

        let mut vmhd = None;
        let mut smhd = None;
        let mut dinf = None;
        let mut stbl = None;

        for child in ChildBoxes::new(data, 8, size, "MINF") {
            let (box_type, slice) = child?;
            match &box_type {
                b"vmhd" => vmhd = Some(VmhdBox::read_box(slice)?.0),
                b"smhd" => smhd = Some(SmhdBox::read_box(slice)?.0),
                b"dinf" => dinf = Some(DinfBox::read_box(slice)?.0),
                b"stbl" => stbl = Some(StblBox::read_box(slice)?.0),
                _ => {}
            }
        }

        Ok((
            MinfBox {
                vmhd,
                smhd,
                dinf: dinf.unwrap_or_default(),
                stbl: stbl.ok_or("MINF missing mandatory stbl box")?,
            },
            size
        ))
    }
}
