use std::io::{Read, Seek, SeekFrom};

use bytes::Bytes;
use mp4_box::boxes::{stsd::SampleEntry, trak::TrakBox};
use mp4_box::reader::read_moov;
use mp4_box::sample_table::SampleTable;
use tracing::{debug, trace};

use super::opener::{MediaStream, SourceOpener};
use crate::error::MergeError;
use crate::types::{ticks_to_us, CodecParameters, Sample, SampleFlags, TrackDescriptor, TrackKind};

struct Cursor {
    track: usize,
    next: usize,
}

/// One opened input container.
///
/// Holds the only handle to the underlying stream; dropping the reader releases it.
pub struct SourceReader {
    reference: String,
    stream: Box<dyn MediaStream>,
    stream_len: u64,
    tracks: Vec<TrackDescriptor>,
    tables: Vec<SampleTable>,
    video: Option<Cursor>,
    audio: Option<Cursor>,
}

impl SourceReader {
    pub fn open(reference: &str, opener: &dyn SourceOpener) -> Result<Self, MergeError> {
        let stream = opener
            .open(reference)
            .map_err(|e| MergeError::source_open(reference, e))?;
        Self::from_stream(reference, stream)
    }

    /// Reads the track list of an already opened stream.
    pub fn from_stream(reference: &str, mut stream: Box<dyn MediaStream>) -> Result<Self, MergeError> {
        let moov = read_moov(&mut stream).map_err(|e| MergeError::source_open(reference, e))?;
        let stream_len = stream
            .seek(SeekFrom::End(0))
            .map_err(|e| MergeError::source_open(reference, e))?;

        let mut tracks = Vec::with_capacity(moov.traks.len());
        let mut tables = Vec::with_capacity(moov.traks.len());
        for (index, trak) in moov.traks.iter().enumerate() {
            let descriptor = describe_track(index, trak);
            // Tables of tracks that are never copied are not needed.
            let table = match descriptor.kind {
                TrackKind::Other => SampleTable::default(),
                _ => SampleTable::from_stbl(&trak.mdia.minf.stbl)
                    .map_err(|e| MergeError::source_open(reference, format!("track {}: {}", index, e)))?,
            };
            debug!(reference = %reference, track = index, kind = ?descriptor.kind, samples = table.len(), "Found track");
            tracks.push(descriptor);
            tables.push(table);
        }

        Ok(Self {
            reference: reference.to_string(),
            stream,
            stream_len,
            tracks,
            tables,
            video: None,
            audio: None,
        })
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn tracks(&self) -> &[TrackDescriptor] {
        &self.tracks
    }

    fn cursor_mut(&mut self, kind: TrackKind) -> Option<&mut Option<Cursor>> {
        match kind {
            TrackKind::Video => Some(&mut self.video),
            TrackKind::Audio => Some(&mut self.audio),
            TrackKind::Other => None,
        }
    }

    /// Selects the first track of `kind`. Returns `false` when the input has none.
    pub fn select(&mut self, kind: TrackKind) -> bool {
        let Some(track) = self.tracks.iter().position(|t| t.kind == kind) else {
            return false;
        };
        match self.cursor_mut(kind) {
            Some(cursor) => {
                *cursor = Some(Cursor { track, next: 0 });
                true
            }
            None => false,
        }
    }

    /// Declared duration of the selected track of `kind`.
    pub fn duration_hint(&self, kind: TrackKind) -> Option<i64> {
        let cursor = match kind {
            TrackKind::Video => self.video.as_ref(),
            TrackKind::Audio => self.audio.as_ref(),
            TrackKind::Other => None,
        }?;
        self.tracks[cursor.track].duration_hint_us
    }

    /// Next sample of the selected track of `kind` in decode order, `None` at the end of the track.
    pub fn next_sample(&mut self, kind: TrackKind) -> Result<Option<Sample>, MergeError> {
        let (track, index) = match self.cursor_mut(kind) {
            Some(Some(cursor)) => {
                let position = (cursor.track, cursor.next);
                cursor.next += 1;
                position
            }
            _ => return Ok(None),
        };
        let Some(info) = self.tables[track].samples.get(index).copied() else {
            return Ok(None);
        };
        let timescale = self.tracks[track].codec.timescale;

        // Sizes are untrusted; bound them by the stream before allocating.
        if info.offset.checked_add(info.size as u64).map_or(true, |end| end > self.stream_len) {
            return Err(MergeError::source_read(
                &self.reference,
                format!(
                    "sample {} of track {} ({} bytes at offset {}) lies past the end of the stream ({} bytes)",
                    index, track, info.size, info.offset, self.stream_len
                ),
            ));
        }
        let mut payload = vec![0u8; info.size as usize];
        self.stream
            .seek(SeekFrom::Start(info.offset))
            .and_then(|_| self.stream.read_exact(&mut payload))
            .map_err(|e| MergeError::source_read(&self.reference, format!("sample {} of track {}: {}", index, track, e)))?;

        let dts_us = ticks_to_us(info.decode_time as i64, timescale);
        let pts_us = ticks_to_us(info.presentation_time(), timescale);
        trace!(track, index, pts_us, size = info.size, "Read sample");

        Ok(Some(Sample {
            payload: Bytes::from(payload),
            pts_us,
            dts_us,
            duration_us: ticks_to_us(info.duration as i64, timescale),
            flags: SampleFlags { key_frame: info.is_sync },
            source_track: track,
        }))
    }

    /// Releases the underlying stream.
    pub fn close(self) {
        debug!(reference = %self.reference, "Closed source");
    }
}

fn describe_track(index: usize, trak: &TrakBox) -> TrackDescriptor {
    let kind = TrackKind::from_handler(&trak.mdia.hdlr.handler_type);
    let mdhd = &trak.mdia.mdhd;
    let sample_entry = trak
        .mdia
        .minf
        .stbl
        .stsd
        .entries
        .first()
        .cloned()
        .unwrap_or_else(|| SampleEntry::from_body(*b"none", &[]));

    let (width, height) = match kind {
        TrackKind::Video => {
            let from_tkhd = (trak.tkhd.width >> 16, trak.tkhd.height >> 16);
            match (from_tkhd, sample_entry.visual_size()) {
                ((0, 0), Some((w, h))) => (w as u32, h as u32),
                (size, _) => size,
            }
        }
        _ => (0, 0),
    };

    let rotation_hint = match kind {
        TrackKind::Video => trak.tkhd.rotation().filter(|&degrees| degrees != 0),
        _ => None,
    };

    TrackDescriptor {
        local_index: index,
        kind,
        codec: CodecParameters {
            sample_entry,
            timescale: mdhd.timescale,
            width,
            height,
            language: mdhd.language.clone(),
            handler_name: trak.mdia.hdlr.name.clone(),
        },
        duration_hint_us: (mdhd.duration > 0).then(|| ticks_to_us(mdhd.duration as i64, mdhd.timescale)),
        rotation_hint,
    }
}
