#![allow(dead_code)]

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use mp4_box::boxes::generic::Mp4Box;
use mp4_box::boxes::stsd::SampleEntry;
use mp4_box::reader::read_moov;
use mp4_box::sample_table::SampleTable;
use mp4_box::writer::{build_moov, create_file_header, TrackBuilder, TrackParams};
use video_merge::progress::{ProgressCallback, ProgressEvent};
use video_merge::source::{default_opener, MediaStream, SourceOpener};

/// One track of a synthetic input. Times are in track ticks, microseconds unless the timescale is changed.
#[derive(Clone, Debug)]
pub struct TrackSpec {
    pub handler: [u8; 4],
    pub format: [u8; 4],
    pub samples: usize,
    pub sample_duration: u32,
    pub rotation: u32,
    pub timescale: u32,
    /// Composition offsets applied to samples in turn. Empty means PTS equals DTS.
    pub composition_offsets: Vec<i32>,
}

pub const TIMESCALE: u32 = 1_000_000;

pub fn video(samples: usize, sample_duration: u32) -> TrackSpec {
    TrackSpec::new(*b"vide", *b"avc1", samples, sample_duration)
}

pub fn audio(samples: usize, sample_duration: u32) -> TrackSpec {
    TrackSpec::new(*b"soun", *b"mp4a", samples, sample_duration)
}

pub fn timecode(samples: usize) -> TrackSpec {
    TrackSpec::new(*b"tmcd", *b"tmcd", samples, 1_000_000)
}

impl TrackSpec {
    fn new(handler: [u8; 4], format: [u8; 4], samples: usize, sample_duration: u32) -> Self {
        TrackSpec {
            handler,
            format,
            samples,
            sample_duration,
            rotation: 0,
            timescale: TIMESCALE,
            composition_offsets: Vec::new(),
        }
    }

    pub fn with_timescale(mut self, timescale: u32) -> Self {
        self.timescale = timescale;
        self
    }

    pub fn with_composition(mut self, offsets: Vec<i32>) -> Self {
        self.composition_offsets = offsets;
        self
    }

    fn composition_offset(&self, index: usize) -> i32 {
        match self.composition_offsets.len() {
            0 => 0,
            n => self.composition_offsets[index % n],
        }
    }

    pub fn rotated(mut self, degrees: u32) -> Self {
        self.rotation = degrees;
        self
    }
}

/// Payload of sample `index` of track `track` in the input tagged `tag`.
pub fn payload(tag: &str, track: usize, index: usize) -> Vec<u8> {
    format!("{}/{}/{}", tag, track, index).into_bytes()
}

fn builders(tag: &str, tracks: &[TrackSpec], base: u64) -> (Vec<TrackBuilder>, Vec<u8>) {
    let mut data = Vec::new();
    let mut builders = Vec::new();
    for (track, spec) in tracks.iter().enumerate() {
        let is_video = &spec.handler == b"vide";
        let mut builder = TrackBuilder::new(TrackParams {
            track_id: track as u32 + 1,
            handler_type: spec.handler,
            handler_name: "Synthetic".into(),
            timescale: spec.timescale,
            language: "und".into(),
            width: if is_video { 320 } else { 0 },
            height: if is_video { 240 } else { 0 },
            rotation: spec.rotation,
            sample_entry: SampleEntry::from_body(spec.format, &[track as u8; 32]),
        });
        for index in 0..spec.samples {
            let bytes = payload(tag, track, index);
            builder.push_sample(
                base + data.len() as u64,
                bytes.len() as u32,
                index as u64 * spec.sample_duration as u64,
                spec.composition_offset(index),
                spec.sample_duration,
                !is_video || index % 10 == 0,
            );
            data.extend_from_slice(&bytes);
        }
        builders.push(builder);
    }
    (builders, data)
}

/// Builds a complete input file: `ftyp`, `mdat`, `moov`.
pub fn build_mp4(tag: &str, tracks: &[TrackSpec]) -> Vec<u8> {
    let (header, _) = create_file_header(0);
    let (builders, data) = builders(tag, tracks, header.len() as u64);
    let (mut file, _) = create_file_header(data.len() as u64);
    file.extend_from_slice(&data);
    build_moov(1000, &builders).write_box(&mut file);
    file
}

/// Same as `build_mp4` with `moov` ahead of `mdat`.
pub fn build_faststart_mp4(tag: &str, tracks: &[TrackSpec]) -> Vec<u8> {
    let mut ftyp = Vec::new();
    mp4_box::boxes::ftyp::FtypBox::default().write_box(&mut ftyp);

    // Chunk offsets do not change the moov size, so a first pass gives the layout.
    let (layout, _) = builders(tag, tracks, 0);
    let moov_size = build_moov(1000, &layout).box_size() as u64;
    let base = ftyp.len() as u64 + moov_size + 16;
    let (builders, data) = builders(tag, tracks, base);

    let mut file = ftyp;
    build_moov(1000, &builders).write_box(&mut file);
    mp4_box::boxes::mdat::write_large_mdat_header(&mut file, data.len() as u64);
    file.extend_from_slice(&data);
    file
}

pub fn write_mp4(dir: &Path, name: &str, tracks: &[TrackSpec]) -> String {
    let path = dir.join(name);
    std::fs::write(&path, build_mp4(name, tracks)).unwrap();
    path.to_string_lossy().into_owned()
}

/// Samples of one output track as (presentation time, payload), in write order.
pub struct OutputTrack {
    pub handler: [u8; 4],
    pub rotation: Option<u32>,
    pub timescale: u32,
    pub samples: Vec<(i64, Vec<u8>)>,
    pub duration: u64,
}

pub fn read_output(path: impl AsRef<Path>) -> Vec<OutputTrack> {
    let mut file = File::open(path).unwrap();
    let moov = read_moov(&mut file).unwrap();
    moov.traks
        .iter()
        .map(|trak| {
            let table = SampleTable::from_stbl(&trak.mdia.minf.stbl).unwrap();
            let samples = table
                .samples
                .iter()
                .map(|s| {
                    let mut bytes = vec![0; s.size as usize];
                    file.seek(SeekFrom::Start(s.offset)).unwrap();
                    file.read_exact(&mut bytes).unwrap();
                    (s.presentation_time(), bytes)
                })
                .collect();
            OutputTrack {
                handler: trak.mdia.hdlr.handler_type,
                rotation: trak.tkhd.rotation(),
                timescale: trak.mdia.mdhd.timescale,
                samples,
                duration: table.total_duration(),
            }
        })
        .collect()
}

pub fn collecting_progress() -> (ProgressCallback, Arc<Mutex<Vec<ProgressEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    (Arc::new(move |e: ProgressEvent| sink.lock().unwrap().push(e)), events)
}

/// Wraps the default opener and counts the streams that are currently open.
pub struct TrackingOpener {
    pub open_now: Arc<AtomicUsize>,
    pub max_open: Arc<AtomicUsize>,
    pub opened: Mutex<Vec<String>>,
}

struct TrackedStream {
    inner: Box<dyn MediaStream>,
    open_now: Arc<AtomicUsize>,
}

impl Read for TrackedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Seek for TrackedStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

impl Drop for TrackedStream {
    fn drop(&mut self) {
        self.open_now.fetch_sub(1, Ordering::SeqCst);
    }
}

impl TrackingOpener {
    pub fn new() -> Self {
        Self {
            open_now: Arc::new(AtomicUsize::new(0)),
            max_open: Arc::new(AtomicUsize::new(0)),
            opened: Mutex::new(Vec::new()),
        }
    }
}

impl SourceOpener for TrackingOpener {
    fn open(&self, reference: &str) -> io::Result<Box<dyn MediaStream>> {
        let inner = default_opener().open(reference)?;
        let now = self.open_now.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_open.fetch_max(now, Ordering::SeqCst);
        self.opened.lock().unwrap().push(reference.to_string());
        Ok(Box::new(TrackedStream { inner, open_now: self.open_now.clone() }))
    }
}

/// Serves one in-memory input whose sample data cannot be read.
pub struct BrokenMdatOpener {
    pub reference: String,
    pub bytes: Vec<u8>,
}

struct BrokenMdat {
    inner: Cursor<Vec<u8>>,
    broken_from: u64,
    broken_to: u64,
}

impl Read for BrokenMdat {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let position = self.inner.position();
        if (self.broken_from..self.broken_to).contains(&position) {
            return Err(io::Error::other("device error"));
        }
        self.inner.read(buf)
    }
}

impl Seek for BrokenMdat {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

impl SourceOpener for BrokenMdatOpener {
    fn open(&self, reference: &str) -> io::Result<Box<dyn MediaStream>> {
        if reference != self.reference {
            return default_opener().open(reference);
        }
        let mut cursor = Cursor::new(self.bytes.clone());
        let headers = mp4_box::reader::scan_top_level(&mut cursor).map_err(io::Error::other)?;
        let mdat = headers
            .iter()
            .find(|h| &h.box_type == b"mdat")
            .ok_or_else(|| io::Error::other("no mdat"))?;
        Ok(Box::new(BrokenMdat {
            inner: cursor,
            broken_from: mdat.payload_offset(),
            broken_to: mdat.end(),
        }))
    }
}
