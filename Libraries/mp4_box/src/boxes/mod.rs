// This module contains definitions for the MP4 box types needed to read and write
// progressive (non-fragmented) MP4 files.
//
// The following submodules are included:
//
// - `co64`: Chunk Offset 64 Box, 64-bit file offsets of the chunks.
// - `ctts`: Composition Time-to-Sample Box, presentation offsets relative to decode times.
// - `dinf`: Data Information Box, holds the data reference.
// - `dref`: Data Reference Box, specifies the location of media data.
// - `enums`: `Mp4BoxEnum`, the top-level boxes of a file.
// - `ftyp`: File Type Box, file type and compatibility information.
// - `generic`: The `Mp4Box` trait and helpers shared by container boxes.
// - `hdlr`: Handler Reference Box, the type of media (video, audio, ...).
// - `mdat`: Media Data Box header helpers.
// - `mdhd`: Media Header Box, timescale, duration and language.
// - `mdia`: Media Box, container for media-specific information.
// - `minf`: Media Information Box, media header and sample table.
// - `moov`: Movie Box, metadata for the entire movie.
// - `mvhd`: Movie Header Box, global information about the movie.
// - `smhd`: Sound Media Header Box.
// - `stbl`: Sample Table Box, indexes every sample of a track.
// - `stco`: Chunk Offset Box, 32-bit file offsets of the chunks.
// - `stsc`: Sample-to-Chunk Box, maps samples to chunks.
// - `stsd`: Sample Description Box, opaque codec configuration.
// - `stss`: Sync Sample Box, keyframes.
// - `stsz`: Sample Size Box, size of each sample.
// - `stts`: Time-to-Sample Box, decode time deltas.
// - `tkhd`: Track Header Box, track id, duration, dimensions and display matrix.
// - `trak`: Track Box, container for one track.
// - `vmhd`: Video Media Header Box.

pub mod co64;
pub mod ctts;
pub mod dinf;
pub mod dref;
pub mod enums;
pub mod ftyp;
pub mod generic;
pub mod hdlr;
pub mod mdat;
pub mod mdhd;
pub mod mdia;
pub mod minf;
pub mod moov;
pub mod mvhd;
pub mod smhd;
pub mod stbl;
pub mod stco;
pub mod stsc;
pub mod stsd;
pub mod stss;
pub mod stsz;
pub mod stts;
pub mod tkhd;
pub mod trak;
pub mod vmhd;
