use crate::{check_box_header, format_fourcc};

use super::{co64::Co64Box, ctts::CttsBox, generic::{write_child, ChildBoxes, Mp4Box}, stco::StcoBox, stsc::StscBox, stsd::StsdBox, stss::StssBox, stsz::StszBox, stts::SttsBox};

// The `StblBox` struct represents a Sample Table Box in the MP4 file format.
// This box is a container for all the time and data indexing of the media samples.
// It contains the following sub-boxes:
// - `StsdBox`: The Sample Description Box, which describes the format of the media samples.
// - `SttsBox`: The Time-to-Sample Box, which maps decoding times to samples.
// - `CttsBox`: (Optional) composition offsets, present when presentation order differs from decode order.
// - `StssBox`: (Optional) sync samples; absent means every sample is a sync sample.
// - `StscBox`: The Sample-to-Chunk Box, which maps samples to chunks.
// - `StszBox`: The Sample Size Box, which specifies the size of each sample.
// - `StcoBox` or `Co64Box`: The Chunk Offset Box, which locates the chunks in the file.
//
// Sample groups, `sdtp` and other children are skipped when reading.
#[derive(Default, Clone)]
pub struct StblBox { // Sample Table Box
    pub stsd: StsdBox,
    pub stts: SttsBox,
    pub ctts: Option<CttsBox>,
    pub stss: Option<StssBox>,
    pub stsc: StscBox,
    pub stsz: StszBox,
    pub stco: Option<StcoBox>,
    pub co64: Option<Co64Box>,
}

impl std::fmt::Debug for StblBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StblBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("stsd", &self.stsd)
            .field("stts", &self.stts)
            .field("ctts", &self.ctts)
            .field("stss", &self.stss)
            .field("stsc", &self.stsc)
            .field("stsz", &self.stsz)
            .field("stco", &self.stco)
            .field("co64", &self.co64)
            .finish()
    }
}

impl Mp4Box for StblBox {
    fn box_type(&self) -> [u8; 4] { *b"stbl" }

    fn box_size(&self) -> u32 {
        8 + self.stsd.box_size()
          + self.stts.box_size()
          + self.ctts.as_ref().map_or(0, |b| b.box_size())
          + self.stss.as_ref().map_or(0, |b| b.box_size())
          + self.stsc.box_size()
          + self.stsz.box_size()
          + self.stco.as_ref().map_or(0, |b| b.box_size())
          + self.co64.as_ref().map_or(0, |b| b.box_size())
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        write_child(buffer, &self.stsd);
        write_child(buffer, &self.stts);
        if let Some(ctts) = &self.ctts {
            write_child(buffer, ctts);
        }
        if let Some(stss) = &self.stss {
            write_child(buffer, stss);
        }
        write_child(buffer, &self.stsc);
        write_child(buffer, &self.stsz);
        if let Some(stco) = &self.stco {
            write_child(buffer, stco);
        }
        if let Some(co64) = &self.co64 {
            write_child(buffer, co64);
        }
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = check_box_header(data, b"stbl")?;

        let mut stsd = None;
        let mut stts = None;
        let mut ctts = None;
        let mut stss = None;
        let mut stsc = None;
        let mut stsz = None;
        let mut stco = None;
        let mut co64 = None;

        for child in ChildBoxes::new(data, 8, size, "STBL") {
            let (box_type, slice) = child?;
            match &box_type {
                b"stsd" => stsd = Some(StsdBox::read_box(slice)?.0),
                b"stts" => stts = Some(SttsBox::read_box(slice)?.0),
                b"ctts" => ctts = Some(CttsBox::read_box(slice)?.0),
                b"stss" => stss = Some(StssBox::read_box(slice)?.0),
                b"stsc" => stsc = Some(StscBox::read_box(slice)?.0),
                b"stsz" => stsz = Some(StszBox::read_box(slice)?.0),
                b"stco" => stco = Some(StcoBox::read_box(slice)?.0),
                b"co64" => co64 = Some(Co64Box::read_box(slice)?.0),
                _ => {}
            }
        }

        if stco.is_none() && co64.is_none() {
            return Err("Missing STCO/CO64 box".into());
        }

        Ok((
            StblBox {
                stsd: stsd.ok_or("Missing STSD box")?,
                stts: stts.ok_or("Missing STTS box")?,
                ctts,
                stss,
                stsc: stsc.ok_or("Missing STSC box")?,
                stsz: stsz.ok_or("Missing STSZ box")?,
                stco,
                co64
            },
            size
        ))
    }
}
