use crate::{check_box_header, format_fourcc, read_u16_be, read_u32_be, read_u64_be, read_version_and_flags, write_version_and_flags};

use super::{generic::Mp4Box, tkhd::{write_matrix, IDENTITY_MATRIX}};

// The `MvhdBox` struct represents a Movie Header Box in the MP4 file format.
// This box contains global information about the movie, such as the timescale, duration,
// playback rate, volume, and the next available track ID.
//
// Fields:
// - `version`: 0 (32-bit times) or 1 (64-bit times).
// - `timescale`: Number of time units per second for the movie timeline.
// - `duration`: Length of the longest track, in `timescale` units.
// - `rate`: 16.16 fixed-point playback rate (`0x00010000` is 1.0).
// - `volume`: 8.8 fixed-point volume (`0x0100` is 1.0).
// - `next_track_id`: One past the largest track id in use.
#[derive(Clone)]
pub struct MvhdBox { // Movie Header Box
    pub version: u8,
    pub creation_time: u64,
    pub modification_time: u64,
    pub timescale: u32,
    pub duration: u64,
    pub rate: u32,      // 16.16 fixed-point (default 0x00010000 for 1.0)
    pub volume: u16,    // 8.8 fixed-point (default 0x0100 for 1.0)
    pub next_track_id: u32,
}

impl Default for MvhdBox {
    fn default() -> Self {
        MvhdBox {
            version: 0,
            creation_time: 0,
            modification_time: 0,
            timescale: 1000,
            duration: 0,
            rate: 0x00010000,
            volume: 0x0100,
            next_track_id: 1,
        }
    }
}

impl std::fmt::Debug for MvhdBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MvhdBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("version", &self.version)
            .field("timescale", &self.timescale)
            .field("duration", &self.duration)
            .field("rate", &self.rate)
            .field("volume", &self.volume)
            .field("next_track_id", &self.next_track_id)
            .finish()
    }
}

impl Mp4Box for MvhdBox {
    fn box_type(&self) -> [u8; 4] { *b"mvhd" }

    fn box_size(&self) -> u32 {
        let time_fields_size = if self.version == 1 { 28 } else { 16 };
        8 + 4 + time_fields_size + 80  // header + version/flags + time fields + rest
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        write_version_and_flags(buffer, self.version, 0);

        if self.version == 1 {
            buffer.extend_from_slice(&self.creation_time.to_be_bytes());
            buffer.extend_from_slice(&self.modification_time.to_be_bytes());
            buffer.extend_from_slice(&self.timescale.to_be_bytes());
            buffer.extend_from_slice(&self.duration.to_be_bytes());
        } else {
            buffer.extend_from_slice(&(self.creation_time as u32).to_be_bytes());
            buffer.extend_from_slice(&(self.modification_time as u32).to_be_bytes());
            buffer.extend_from_slice(&self.timescale.to_be_bytes());
            buffer.extend_from_slice(&(self.duration as u32).to_be_bytes());
        }

        buffer.extend_from_slice(&self.rate.to_be_bytes());
        buffer.extend_from_slice(&self.volume.to_be_bytes());
        buffer.extend_from_slice(&[0; 10]);  // reserved
        write_matrix(buffer, &IDENTITY_MATRIX);
        buffer.extend_from_slice(&[0; 24]);  // pre_defined
        buffer.extend_from_slice(&self.next_track_id.to_be_bytes());
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = check_box_header(data, b"mvhd")?;
        let data = &data[..size];
        let (version, _flags) = read_version_and_flags(data)?;
        let mut offset = 12;

        let (creation_time, modification_time, timescale, duration) = match version {
            1 => {
                let times = (
                    read_u64_be(data, offset)?,
                    read_u64_be(data, offset + 8)?,
                    read_u32_be(data, offset + 16)?,
                    read_u64_be(data, offset + 20)?,
                );
                offset += 28;
                times
            }
            0 => {
                let times = (
                    read_u32_be(data, offset)? as u64,
                    read_u32_be(data, offset + 4)? as u64,
                    read_u32_be(data, offset + 8)?,
                    read_u32_be(data, offset + 12)? as u64,
                );
                offset += 16;
                times
            }
            _ => return Err("Unsupported MVHD version".into()),
        };

        let rate = read_u32_be(data, offset)?;
        let volume = read_u16_be(data, offset + 4)?;
        // Skip rate, volume, reserved (10 bytes), matrix (36 bytes) and pre_defined (24 bytes)
        let next_track_id = read_u32_be(data, offset + 6 + 10 + 36 + 24)?;

        Ok((
            MvhdBox {
                version,
                creation_time,
                modification_time,
                timescale,
                duration,
                rate,
                volume,
                next_track_id,
            },
            size
        ))
    }
}
