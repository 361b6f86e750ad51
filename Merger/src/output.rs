//! Progressive MP4 output: `ftyp`, one `mdat` that grows as samples arrive, `moov` at the end.

use std::fs::{self, File};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, WriteBytesExt};
use mp4_box::boxes::generic::Mp4Box;
use mp4_box::boxes::mdat::MDAT_LARGE_HEADER_SIZE;
use mp4_box::writer::{build_moov, create_file_header, TrackBuilder, TrackParams};
use tracing::{debug, trace, warn};

use crate::error::MergeError;
use crate::types::{us_to_ticks, CodecParameters, Sample, TrackKind};

const MOVIE_TIMESCALE: u32 = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WriterState {
    Registering,
    Started,
    Finalized,
}

struct OutputTrack {
    kind: TrackKind,
    builder: TrackBuilder,
    last_decode_ticks: Option<u64>,
}

pub struct OutputWriter {
    path: PathBuf,
    state: WriterState,
    file: Option<BufWriter<File>>,
    created: bool,
    tracks: Vec<OutputTrack>,
    rotation: u32,
    mdat_offset: u64,
    position: u64,
}

impl OutputWriter {
    /// Nothing touches the disk before `start()`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: WriterState::Registering,
            file: None,
            created: false,
            tracks: Vec::new(),
            rotation: 0,
            mdat_offset: 0,
            position: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Adds an output track and returns its id. Ids start at 1 in registration order.
    pub fn register_track(&mut self, kind: TrackKind, codec: &CodecParameters) -> Result<u32, MergeError> {
        if self.state != WriterState::Registering {
            return Err(MergeError::output_write("tracks must be registered before start"));
        }
        let handler_type = kind
            .handler_type()
            .ok_or_else(|| MergeError::output_write(format!("cannot write a {:?} track", kind)))?;
        if codec.timescale == 0 {
            return Err(MergeError::output_write(format!("{:?} track has a zero timescale", kind)));
        }

        let track_id = self.tracks.len() as u32 + 1;
        let params = TrackParams {
            track_id,
            handler_type,
            handler_name: codec.handler_name.clone(),
            timescale: codec.timescale,
            language: codec.language.clone(),
            width: codec.width,
            height: codec.height,
            rotation: 0,
            sample_entry: codec.sample_entry.clone(),
        };
        self.tracks.push(OutputTrack {
            kind,
            builder: TrackBuilder::new(params),
            last_decode_ticks: None,
        });
        debug!(track_id, kind = ?kind, timescale = codec.timescale, "Registered output track");
        Ok(track_id)
    }

    /// Display rotation of the video track, in degrees clockwise.
    pub fn set_orientation(&mut self, degrees: u32) -> Result<(), MergeError> {
        if self.state != WriterState::Registering {
            return Err(MergeError::output_write("orientation must be set before start"));
        }
        if !matches!(degrees, 0 | 90 | 180 | 270) {
            return Err(MergeError::output_write(format!("unsupported rotation {}", degrees)));
        }
        self.rotation = degrees;
        Ok(())
    }

    /// Creates the file and writes everything up to the start of the sample data.
    pub fn start(&mut self) -> Result<(), MergeError> {
        if self.state != WriterState::Registering {
            return Err(MergeError::output_write("output already started"));
        }
        let file = File::create(&self.path)
            .map_err(|e| MergeError::output_write(format!("{}: {}", self.path.display(), e)))?;
        self.created = true;
        let mut file = BufWriter::new(file);

        let (header, mdat_offset) = create_file_header(0);
        file.write_all(&header).map_err(MergeError::output_write)?;

        self.mdat_offset = mdat_offset;
        self.position = header.len() as u64;
        self.file = Some(file);
        self.state = WriterState::Started;
        debug!(path = %self.path.display(), tracks = self.tracks.len(), "Started output");
        Ok(())
    }

    /// Appends the payload verbatim and records the sample. Timestamps are final, offset included.
    pub fn write_sample(&mut self, track_id: u32, sample: &Sample) -> Result<(), MergeError> {
        if self.state != WriterState::Started {
            return Err(MergeError::output_write("samples can only be written between start and finalize"));
        }
        let track = track_id
            .checked_sub(1)
            .and_then(|index| self.tracks.get_mut(index as usize))
            .ok_or_else(|| MergeError::output_write(format!("unknown track id {}", track_id)))?;
        let timescale = track.builder.params.timescale;

        let size = u32::try_from(sample.payload.len())
            .map_err(|_| MergeError::output_write(format!("sample of {} bytes is too large", sample.payload.len())))?;

        let mut decode_ticks = us_to_ticks(sample.dts_us, timescale).max(0) as u64;
        if let Some(last) = track.last_decode_ticks {
            if decode_ticks < last {
                warn!(track_id, dts_us = sample.dts_us, "Decode time went backwards, clamping");
                decode_ticks = last;
            }
        }
        let composition = us_to_ticks(sample.pts_us, timescale) - decode_ticks as i64;
        let composition = i32::try_from(composition)
            .map_err(|_| MergeError::output_write(format!("composition offset {} out of range", composition)))?;
        let duration = us_to_ticks(sample.duration_us, timescale).clamp(0, u32::MAX as i64) as u32;

        let file = self
            .file
            .as_mut()
            .ok_or_else(|| MergeError::output_write("output file is not open"))?;
        file.write_all(&sample.payload).map_err(MergeError::output_write)?;

        track.builder.push_sample(self.position, size, decode_ticks, composition, duration, sample.flags.key_frame);
        track.last_decode_ticks = Some(decode_ticks);
        self.position += size as u64;
        trace!(track_id, pts_us = sample.pts_us, size, "Wrote sample");
        Ok(())
    }

    pub fn samples_written(&self, track_id: u32) -> usize {
        track_id
            .checked_sub(1)
            .and_then(|index| self.tracks.get(index as usize))
            .map_or(0, |t| t.builder.sample_count())
    }

    /// Writes `moov`, patches the `mdat` size and closes the file.
    pub fn finalize(&mut self) -> Result<(), MergeError> {
        if self.state != WriterState::Started {
            return Err(MergeError::output_write("finalize requires a started, unfinalized output"));
        }
        let mut file = self
            .file
            .take()
            .ok_or_else(|| MergeError::output_write("output file is not open"))?;

        for track in &mut self.tracks {
            if track.kind == TrackKind::Video {
                track.builder.params.rotation = self.rotation;
            }
        }
        let moov = build_moov(MOVIE_TIMESCALE, self.tracks.iter().map(|t| &t.builder));
        let mut buffer = Vec::with_capacity(moov.box_size() as usize);
        moov.write_box(&mut buffer);
        file.write_all(&buffer).map_err(MergeError::output_write)?;

        // The 64-bit mdat size sits right after the 8-byte compact header part.
        let mdat_size = self.position - self.mdat_offset;
        debug_assert!(mdat_size >= MDAT_LARGE_HEADER_SIZE);
        file.seek(SeekFrom::Start(self.mdat_offset + 8))
            .and_then(|_| file.write_u64::<BigEndian>(mdat_size))
            .and_then(|_| file.flush())
            .map_err(MergeError::output_write)?;
        let file = file.into_inner().map_err(|e| MergeError::output_write(e.error()))?;
        file.sync_all().map_err(MergeError::output_write)?;

        self.state = WriterState::Finalized;
        debug!(path = %self.path.display(), mdat_size, moov_size = buffer.len(), "Finalized output");
        Ok(())
    }

    /// Closes the file handle without finalizing. The file is removed unless `keep` is set.
    pub fn abandon(mut self, keep: bool) {
        drop(self.file.take());
        if self.created && !keep && self.state != WriterState::Finalized {
            match fs::remove_file(&self.path) {
                Ok(()) => debug!(path = %self.path.display(), "Removed partial output"),
                Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove partial output"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use mp4_box::boxes::stsd::SampleEntry;
    use mp4_box::reader::{read_moov, scan_top_level};
    use mp4_box::sample_table::SampleTable;

    use crate::types::SampleFlags;

    fn codec(format: &[u8; 4], timescale: u32) -> CodecParameters {
        CodecParameters {
            sample_entry: SampleEntry::from_body(*format, &[0; 78]),
            timescale,
            width: 640,
            height: 480,
            language: "eng".into(),
            handler_name: "Handler".into(),
        }
    }

    fn sample(pts_us: i64, payload: &'static [u8], key_frame: bool) -> Sample {
        Sample {
            payload: Bytes::from_static(payload),
            pts_us,
            dts_us: pts_us,
            duration_us: 33_333,
            flags: SampleFlags { key_frame },
            source_track: 0,
        }
    }

    #[test]
    fn lifecycle_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = OutputWriter::new(dir.path().join("out.mp4"));
        let video = codec(b"avc1", 90_000);

        assert!(writer.write_sample(1, &sample(0, b"x", true)).is_err());
        assert!(writer.finalize().is_err());
        assert!(writer.register_track(TrackKind::Other, &video).is_err());
        let id = writer.register_track(TrackKind::Video, &video).unwrap();
        assert_eq!(id, 1);
        writer.start().unwrap();
        assert!(writer.register_track(TrackKind::Audio, &codec(b"mp4a", 44_100)).is_err());
        assert!(writer.set_orientation(90).is_err());
        assert!(writer.write_sample(2, &sample(0, b"x", true)).is_err());
        writer.write_sample(id, &sample(0, b"x", true)).unwrap();
        writer.finalize().unwrap();
        assert!(writer.finalize().is_err());
        assert!(writer.write_sample(id, &sample(33_333, b"y", false)).is_err());
    }

    #[test]
    fn finalized_file_is_a_valid_container() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp4");
        let mut writer = OutputWriter::new(&path);
        let video = writer.register_track(TrackKind::Video, &codec(b"avc1", 90_000)).unwrap();
        let audio = writer.register_track(TrackKind::Audio, &codec(b"mp4a", 44_100)).unwrap();
        writer.set_orientation(270).unwrap();
        writer.start().unwrap();

        writer.write_sample(video, &sample(0, b"key-frame", true)).unwrap();
        writer.write_sample(video, &sample(33_333, b"delta", false)).unwrap();
        writer.write_sample(audio, &sample(0, b"aac", true)).unwrap();
        writer.write_sample(video, &sample(66_667, b"delta2", false)).unwrap();
        assert_eq!(writer.samples_written(video), 3);
        writer.finalize().unwrap();

        let mut file = File::open(&path).unwrap();
        let headers = scan_top_level(&mut file).unwrap();
        let types: Vec<&[u8; 4]> = headers.iter().map(|h| &h.box_type).collect();
        assert_eq!(types, vec![b"ftyp", b"mdat", b"moov"]);
        assert_eq!(headers[1].payload_size(), 9 + 5 + 3 + 6);

        let moov = read_moov(&mut file).unwrap();
        assert_eq!(moov.traks.len(), 2);
        assert_eq!(moov.traks[0].tkhd.rotation(), Some(270));
        assert_eq!(moov.traks[1].tkhd.rotation(), Some(0));
        assert_eq!(moov.traks[0].mdia.mdhd.language, "eng");

        let table = SampleTable::from_stbl(&moov.traks[0].mdia.minf.stbl).unwrap();
        let times: Vec<u64> = table.samples.iter().map(|s| s.decode_time).collect();
        assert_eq!(times, vec![0, 3000, 6000]);
        let sync: Vec<bool> = table.samples.iter().map(|s| s.is_sync).collect();
        assert_eq!(sync, vec![true, false, false]);
        // The audio sample split the video samples into two chunks.
        assert_eq!(moov.traks[0].mdia.minf.stbl.stco.as_ref().unwrap().entries.len(), 2);
    }

    #[test]
    fn backwards_decode_time_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp4");
        let mut writer = OutputWriter::new(&path);
        let video = writer.register_track(TrackKind::Video, &codec(b"avc1", 1000)).unwrap();
        writer.start().unwrap();
        writer.write_sample(video, &sample(100_000, b"a", true)).unwrap();
        writer.write_sample(video, &sample(50_000, b"b", false)).unwrap();
        writer.finalize().unwrap();

        let moov = read_moov(&mut File::open(&path).unwrap()).unwrap();
        let table = SampleTable::from_stbl(&moov.traks[0].mdia.minf.stbl).unwrap();
        assert_eq!(table.samples[0].decode_time, table.samples[1].decode_time);
    }

    #[test]
    fn abandoned_output_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp4");
        let mut writer = OutputWriter::new(&path);
        writer.register_track(TrackKind::Video, &codec(b"avc1", 90_000)).unwrap();
        writer.start().unwrap();
        assert!(path.exists());
        writer.abandon(false);
        assert!(!path.exists());

        let mut kept = OutputWriter::new(&path);
        kept.start().unwrap();
        kept.abandon(true);
        assert!(path.exists());
    }
}
