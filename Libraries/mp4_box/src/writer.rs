use crate::boxes::{
    co64::Co64Box,
    ctts::CttsBox,
    ftyp::FtypBox,
    generic::Mp4Box,
    hdlr::HdlrBox,
    mdat::write_large_mdat_header,
    moov::MoovBox,
    smhd::SmhdBox,
    stco::StcoBox,
    stsc::StscBox,
    stsd::{SampleEntry, StsdBox},
    stss::StssBox,
    stsz::StszBox,
    stts::SttsBox,
    tkhd::rotation_matrix,
    trak::TrakBox,
    vmhd::VmhdBox,
};

#[derive(Clone, Debug)]
pub struct TrackParams {
    pub track_id: u32,                  // Unique track identifier, starting at 1
    pub handler_type: [u8; 4],          // b"vide", b"soun", ...
    pub handler_name: String,           // Descriptive handler name
    pub timescale: u32,                 // Media timescale, ticks per second
    pub language: String,               // ISO 639-2/T code, e.g. "und"
    pub width: u32,                     // Presentation width in pixels (video only)
    pub height: u32,                    // Presentation height in pixels (video only)
    pub rotation: u32,                  // Clockwise display rotation, 0/90/180/270
    pub sample_entry: SampleEntry,      // Codec configuration, copied verbatim into stsd
}

/// Collects the samples of one track as they are appended to `mdat` and turns them into a `trak`.
///
/// Consecutive samples that are contiguous in the file share a chunk.
#[derive(Clone, Debug)]
pub struct TrackBuilder {
    pub params: TrackParams,
    decode_times: Vec<u64>,
    sizes: Vec<u32>,
    composition_offsets: Vec<i32>,
    sync: Vec<bool>,
    last_duration: u32,
    chunk_offsets: Vec<u64>,
    chunk_sizes: Vec<u32>,
    next_offset: Option<u64>,
}

impl TrackBuilder {
    pub fn new(params: TrackParams) -> Self {
        TrackBuilder {
            params,
            decode_times: Vec::new(),
            sizes: Vec::new(),
            composition_offsets: Vec::new(),
            sync: Vec::new(),
            last_duration: 0,
            chunk_offsets: Vec::new(),
            chunk_sizes: Vec::new(),
            next_offset: None,
        }
    }

    /// Records a sample already written at `offset` in the file.
    ///
    /// Times are in the media timescale. `duration` is only used for the last sample;
    /// the others last until the next decode time.
    pub fn push_sample(&mut self, offset: u64, size: u32, decode_time: u64, composition_offset: i32, duration: u32, is_sync: bool) {
        if self.next_offset == Some(offset) {
            if let Some(samples) = self.chunk_sizes.last_mut() {
                *samples += 1;
            }
        } else {
            self.chunk_offsets.push(offset);
            self.chunk_sizes.push(1);
        }
        self.next_offset = Some(offset + size as u64);

        self.decode_times.push(decode_time);
        self.sizes.push(size);
        self.composition_offsets.push(composition_offset);
        self.sync.push(is_sync);
        self.last_duration = duration;
    }

    pub fn sample_count(&self) -> usize {
        self.sizes.len()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_offsets.len()
    }

    fn sample_durations(&self) -> Vec<u32> {
        let mut durations: Vec<u32> = self
            .decode_times
            .windows(2)
            .map(|pair| u32::try_from(pair[1].saturating_sub(pair[0])).unwrap_or(u32::MAX))
            .collect();
        if !self.decode_times.is_empty() {
            durations.push(self.last_duration);
        }
        durations
    }

    /// Track duration in the media timescale.
    pub fn media_duration(&self) -> u64 {
        self.sample_durations().iter().map(|&d| d as u64).sum()
    }

    pub fn build_trak(&self, movie_timescale: u32) -> TrakBox {
        let params = &self.params;
        let media_duration = self.media_duration();
        let movie_duration = rescale(media_duration, params.timescale, movie_timescale);
        let is_video = &params.handler_type == b"vide";
        let is_audio = &params.handler_type == b"soun";

        let mut trak = TrakBox::default();

        // --- tkhd ---
        trak.tkhd.version = if movie_duration > u32::MAX as u64 { 1 } else { 0 };
        trak.tkhd.track_id = params.track_id;
        trak.tkhd.duration = movie_duration;
        trak.tkhd.volume = if is_audio { 0x0100 } else { 0 };
        if is_video {
            trak.tkhd.width = params.width << 16;
            trak.tkhd.height = params.height << 16;
            if let Some(matrix) = rotation_matrix(params.rotation) {
                trak.tkhd.matrix = matrix;
            }
        }

        // --- mdhd / hdlr ---
        trak.mdia.mdhd.version = if media_duration > u32::MAX as u64 { 1 } else { 0 };
        trak.mdia.mdhd.timescale = params.timescale;
        trak.mdia.mdhd.duration = media_duration;
        trak.mdia.mdhd.language = params.language.clone();
        trak.mdia.hdlr = HdlrBox {
            handler_type: params.handler_type,
            name: params.handler_name.clone(),
            ..Default::default()
        };

        // --- minf ---
        let minf = &mut trak.mdia.minf;
        if is_video {
            minf.vmhd = Some(VmhdBox::default());
        } else if is_audio {
            minf.smhd = Some(SmhdBox::default());
        }

        // --- stbl ---
        let stbl = &mut minf.stbl;
        stbl.stsd = StsdBox { entries: vec![params.sample_entry.clone()], ..Default::default() };
        stbl.stts = SttsBox::from_deltas(self.sample_durations());
        if self.composition_offsets.iter().any(|&o| o != 0) {
            stbl.ctts = Some(CttsBox::from_offsets(self.composition_offsets.iter().copied()));
        }
        if self.sync.iter().any(|&s| !s) {
            let entries = self
                .sync
                .iter()
                .enumerate()
                .filter_map(|(i, &s)| s.then_some(i as u32 + 1))
                .collect();
            stbl.stss = Some(StssBox { entries, ..Default::default() });
        }
        stbl.stsc = StscBox::from_chunk_sizes(&self.chunk_sizes);
        stbl.stsz = StszBox::from_sizes(self.sizes.clone());
        if self.chunk_offsets.iter().any(|&o| o > u32::MAX as u64) {
            stbl.co64 = Some(Co64Box { entries: self.chunk_offsets.clone(), ..Default::default() });
        } else {
            let entries = self.chunk_offsets.iter().map(|&o| o as u32).collect();
            stbl.stco = Some(StcoBox { entries, ..Default::default() });
        }

        trak
    }
}

/// Converts `value` from one timescale to another, rounding half up.
pub fn rescale(value: u64, from: u32, to: u32) -> u64 {
    if from == 0 {
        return 0;
    }
    let scaled = (value as u128 * to as u128 + from as u128 / 2) / from as u128;
    u64::try_from(scaled).unwrap_or(u64::MAX)
}

/// Assembles a progressive `moov` for the given tracks.
pub fn build_moov<'a>(movie_timescale: u32, tracks: impl IntoIterator<Item = &'a TrackBuilder>) -> MoovBox {
    let mut moov = MoovBox::default();

    // 1) Tracks
    moov.traks = tracks.into_iter().map(|t| t.build_trak(movie_timescale)).collect();

    // 2) Movie header from the longest track
    let duration = moov.traks.iter().map(|t| t.tkhd.duration).max().unwrap_or(0);
    moov.mvhd.version = if duration > u32::MAX as u64 { 1 } else { 0 };
    moov.mvhd.timescale = movie_timescale;
    moov.mvhd.duration = duration;
    moov.mvhd.next_track_id = moov.traks.iter().map(|t| t.tkhd.track_id).max().unwrap_or(0) + 1;

    moov
}

/// Bytes that start a progressive file: `ftyp` followed by a 64-bit `mdat` header
/// announcing `payload_size` bytes. Returns the buffer and the offset of the `mdat` header.
pub fn create_file_header(payload_size: u64) -> (Vec<u8>, u64) {
    let mut buffer = Vec::with_capacity(64);

    // 1) Write FTYP Box
    FtypBox::default().write_box(&mut buffer);
    let mdat_offset = buffer.len() as u64;

    // 2) Write MDAT header, patched once the payload size is known
    write_large_mdat_header(&mut buffer, payload_size);

    (buffer, mdat_offset)
}
