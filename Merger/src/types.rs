use bytes::Bytes;
use mp4_box::boxes::stsd::SampleEntry;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
    Other,
}

impl TrackKind {
    /// Kinds that are copied to the output, in copy order.
    pub const COPIED: [TrackKind; 2] = [TrackKind::Video, TrackKind::Audio];

    pub fn from_handler(handler_type: &[u8; 4]) -> Self {
        match handler_type {
            b"vide" => TrackKind::Video,
            b"soun" => TrackKind::Audio,
            _ => TrackKind::Other,
        }
    }

    /// Handler written for an output track of this kind. `Other` tracks are never written.
    pub fn handler_type(&self) -> Option<[u8; 4]> {
        match self {
            TrackKind::Video => Some(*b"vide"),
            TrackKind::Audio => Some(*b"soun"),
            TrackKind::Other => None,
        }
    }
}

/// Codec configuration of a track. Passed from the first input to the output untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodecParameters {
    pub sample_entry: SampleEntry, // Complete stsd entry (avc1, hvc1, mp4a, ...)
    pub timescale: u32,            // Media timescale of the source track
    pub width: u32,                // Pixels, 0 for audio
    pub height: u32,
    pub language: String,
    pub handler_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackDescriptor {
    pub local_index: usize,
    pub kind: TrackKind,
    pub codec: CodecParameters,
    pub duration_hint_us: Option<i64>,
    pub rotation_hint: Option<u32>, // Degrees clockwise, video only
}

/// Output track ids for the copied kinds. Fixed by the first input for the whole run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OutputTrackMap {
    pub video: Option<u32>,
    pub audio: Option<u32>,
}

impl OutputTrackMap {
    pub fn slot(&self, kind: TrackKind) -> Option<u32> {
        match kind {
            TrackKind::Video => self.video,
            TrackKind::Audio => self.audio,
            TrackKind::Other => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SampleFlags {
    pub key_frame: bool,
}

/// One compressed access unit on its way from an input to the output.
#[derive(Clone, Debug)]
pub struct Sample {
    pub payload: Bytes,
    pub pts_us: i64,
    pub dts_us: i64,
    pub duration_us: i64,
    pub flags: SampleFlags,
    pub source_track: usize,
}

impl Sample {
    /// The same sample moved `offset_us` later on the timeline.
    pub fn shifted(&self, offset_us: i64) -> Sample {
        Sample {
            pts_us: self.pts_us + offset_us,
            dts_us: self.dts_us + offset_us,
            ..self.clone()
        }
    }
}

const MICROS: i128 = 1_000_000;

fn rescale_round(value: i128, multiplier: i128, divisor: i128) -> i64 {
    let scaled = (value * multiplier + divisor / 2).div_euclid(divisor);
    scaled.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

/// Media ticks to microseconds, rounding half up.
pub fn ticks_to_us(ticks: i64, timescale: u32) -> i64 {
    if timescale == 0 {
        return 0;
    }
    rescale_round(ticks as i128, MICROS, timescale as i128)
}

/// Microseconds to media ticks, rounding half up.
pub fn us_to_ticks(us: i64, timescale: u32) -> i64 {
    rescale_round(us as i128, timescale as i128, MICROS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_mapping() {
        assert_eq!(TrackKind::from_handler(b"vide"), TrackKind::Video);
        assert_eq!(TrackKind::from_handler(b"soun"), TrackKind::Audio);
        assert_eq!(TrackKind::from_handler(b"tmcd"), TrackKind::Other);
        assert_eq!(TrackKind::from_handler(b"hint"), TrackKind::Other);
    }

    #[test]
    fn time_conversion_rounds_half_up() {
        assert_eq!(ticks_to_us(3000, 90_000), 33_333);
        assert_eq!(ticks_to_us(1024, 44_100), 23_220);
        assert_eq!(ticks_to_us(-3000, 90_000), -33_333);
        assert_eq!(ticks_to_us(7, 0), 0);
        assert_eq!(us_to_ticks(33_333, 90_000), 3000);
        assert_eq!(us_to_ticks(500_000, 1), 1);
        assert_eq!(us_to_ticks(499_999, 1), 0);
    }

    #[test]
    fn conversion_survives_a_round_trip_at_common_rates() {
        for timescale in [1000, 30_000, 44_100, 48_000, 90_000] {
            for ticks in [0i64, 1, 1001, 123_456, 9_000_000] {
                assert_eq!(us_to_ticks(ticks_to_us(ticks, timescale), timescale), ticks);
            }
        }
    }

    #[test]
    fn shifting_moves_both_timestamps() {
        let sample = Sample {
            payload: Bytes::from_static(b"abc"),
            pts_us: 10,
            dts_us: 5,
            duration_us: 33_000,
            flags: SampleFlags { key_frame: true },
            source_track: 0,
        };
        let moved = sample.shifted(1000);
        assert_eq!((moved.pts_us, moved.dts_us), (1010, 1005));
        assert_eq!(moved.payload, sample.payload);
        assert!(moved.flags.key_frame);
    }
}
