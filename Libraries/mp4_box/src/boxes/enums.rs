use crate::{format_fourcc, reader::BoxHeader};

use super::{ftyp::FtypBox, moov::MoovBox};

/// A top-level box of a progressive MP4 file.
///
/// Only `ftyp` and `moov` are parsed; `mdat` and every other top-level box are
/// described by their header so large payloads stay on disk.
#[derive(Clone)]
pub enum Mp4BoxEnum {
    Ftyp(FtypBox),
    Moov(MoovBox),
    Mdat(BoxHeader),
    Other(BoxHeader),
}

impl Mp4BoxEnum {
    pub fn box_type(&self) -> [u8; 4] {
        match self {
            Mp4BoxEnum::Ftyp(_) => *b"ftyp",
            Mp4BoxEnum::Moov(_) => *b"moov",
            Mp4BoxEnum::Mdat(header) | Mp4BoxEnum::Other(header) => header.box_type,
        }
    }
}

impl std::fmt::Debug for Mp4BoxEnum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mp4BoxEnum::Ftyp(b) => b.fmt(f),
            Mp4BoxEnum::Moov(b) => b.fmt(f),
            Mp4BoxEnum::Mdat(h) | Mp4BoxEnum::Other(h) => f
                .debug_struct("BoxHeader")
                .field("box_type", &format_fourcc(&h.box_type))
                .field("offset", &h.offset)
                .field("box_size", &h.size)
                .finish(),
        }
    }
}
