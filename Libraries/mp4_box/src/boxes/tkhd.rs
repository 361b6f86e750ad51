use crate::{check_box_header, format_fourcc, read_i32_be, read_u16_be, read_u32_be, read_u64_be, read_version_and_flags, write_version_and_flags};

use super::generic::Mp4Box;

const ONE: i32 = 0x0001_0000; // 1.0 in 16.16
const W_ONE: i32 = 0x4000_0000; // 1.0 in 2.30

pub const IDENTITY_MATRIX: [i32; 9] = [ONE, 0, 0, 0, ONE, 0, 0, 0, W_ONE];

/// Transform matrix for a clockwise display rotation of 0, 90, 180 or 270 degrees.
pub fn rotation_matrix(degrees: u32) -> Option<[i32; 9]> {
    match degrees % 360 {
        0 => Some(IDENTITY_MATRIX),
        90 => Some([0, ONE, 0, -ONE, 0, 0, 0, 0, W_ONE]),
        180 => Some([-ONE, 0, 0, 0, -ONE, 0, 0, 0, W_ONE]),
        270 => Some([0, -ONE, 0, ONE, 0, 0, 0, 0, W_ONE]),
        _ => None,
    }
}

/// Rotation in degrees encoded by a transform matrix. Translation is ignored;
/// scaled, skewed or mirrored matrices yield `None`.
pub fn matrix_rotation(matrix: &[i32; 9]) -> Option<u32> {
    [0, 90, 180, 270].into_iter().find(|&degrees| {
        rotation_matrix(degrees)
            .map(|m| m[0] == matrix[0] && m[1] == matrix[1] && m[3] == matrix[3] && m[4] == matrix[4])
            .unwrap_or(false)
    })
}

pub fn write_matrix(buffer: &mut Vec<u8>, matrix: &[i32; 9]) {
    for value in matrix {
        buffer.extend_from_slice(&value.to_be_bytes());
    }
}

fn read_matrix(data: &[u8], offset: usize) -> Result<[i32; 9], String> {
    let mut matrix = [0i32; 9];
    for (i, value) in matrix.iter_mut().enumerate() {
        *value = read_i32_be(data, offset + i * 4)?;
    }
    Ok(matrix)
}

// The `TkhdBox` struct represents a Track Header Box in the MP4 file format.
// This box contains metadata about a specific track, such as its ID, duration, dimensions,
// volume, display transform and flags indicating its state (enabled, in movie, in preview).
//
// Fields:
// - `track_id`: Unique ID of the track within the movie.
// - `duration`: Track duration in movie timescale units.
// - `volume`: 8.8 fixed-point, 0x0100 for audio tracks and 0 otherwise.
// - `matrix`: 3x3 display transform; the rotation hint of a video track lives here.
// - `width`/`height`: 16.16 fixed-point presentation size.
#[derive(Clone)]
pub struct TkhdBox { // Track Header Box
    pub version: u8,
    pub flags: u32,
    pub creation_time: u64,
    pub modification_time: u64,
    pub track_id: u32,
    pub duration: u64,
    pub layer: u16,
    pub alternate_group: u16,
    pub volume: u16,     // 8.8 fixed-point
    pub matrix: [i32; 9],
    pub width: u32,      // 16.16 fixed-point
    pub height: u32,     // 16.16 fixed-point
}

impl Default for TkhdBox {
    fn default() -> Self {
        TkhdBox {
            version: 0,
            flags: 0x000003,  // enabled, in movie
            creation_time: 0,
            modification_time: 0,
            track_id: 1,
            duration: 0,
            layer: 0,
            alternate_group: 0,
            volume: 0,
            matrix: IDENTITY_MATRIX,
            width: 0,
            height: 0,
        }
    }
}

impl TkhdBox {
    pub fn rotation(&self) -> Option<u32> {
        matrix_rotation(&self.matrix)
    }
}

impl std::fmt::Debug for TkhdBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TkhdBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("version", &self.version)
            .field("flags", &format!("0x{:06X}", self.flags))
            .field("track_id", &self.track_id)
            .field("duration", &self.duration)
            .field("volume", &self.volume)
            .field("rotation", &self.rotation())
            .field("width", &format!("{} px", self.width >> 16))
            .field("height", &format!("{} px", self.height >> 16))
            .finish()
    }
}

impl Mp4Box for TkhdBox {
    fn box_type(&self) -> [u8; 4] { *b"tkhd" }

    // The size includes:
    // - 8 bytes for the header and 4 bytes for version and flags.
    // - creation/modification time, track id, reserved and duration (20 or 32 bytes).
    // - 8 reserved, layer, alternate group, volume, 2 reserved (16 bytes).
    // - 36 bytes for the matrix and 8 bytes for width and height.
    fn box_size(&self) -> u32 {
        let time_fields = if self.version == 1 {
            8 + 8 + 4 + 4 + 8
        } else {
            4 + 4 + 4 + 4 + 4
        };
        8 + 4 + time_fields + 60
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        write_version_and_flags(buffer, self.version, self.flags);

        if self.version == 1 {
            buffer.extend_from_slice(&self.creation_time.to_be_bytes());
            buffer.extend_from_slice(&self.modification_time.to_be_bytes());
            buffer.extend_from_slice(&self.track_id.to_be_bytes());
            buffer.extend_from_slice(&0u32.to_be_bytes());  // reserved
            buffer.extend_from_slice(&self.duration.to_be_bytes());
        } else {
            buffer.extend_from_slice(&(self.creation_time as u32).to_be_bytes());
            buffer.extend_from_slice(&(self.modification_time as u32).to_be_bytes());
            buffer.extend_from_slice(&self.track_id.to_be_bytes());
            buffer.extend_from_slice(&0u32.to_be_bytes());  // reserved
            buffer.extend_from_slice(&(self.duration as u32).to_be_bytes());
        }

        buffer.extend_from_slice(&0u64.to_be_bytes());  // reserved
        buffer.extend_from_slice(&self.layer.to_be_bytes());
        buffer.extend_from_slice(&self.alternate_group.to_be_bytes());
        buffer.extend_from_slice(&self.volume.to_be_bytes());
        buffer.extend_from_slice(&0u16.to_be_bytes());  // reserved
        write_matrix(buffer, &self.matrix);
        buffer.extend_from_slice(&self.width.to_be_bytes());
        buffer.extend_from_slice(&self.height.to_be_bytes());
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = check_box_header(data, b"tkhd")?;
        let data = &data[..size];
        let (version, flags) = read_version_and_flags(data)?;
        let mut offset = 12;

        let (creation_time, modification_time, track_id, duration) = match version {
            1 => {
                let fields = (
                    read_u64_be(data, offset)?,
                    read_u64_be(data, offset + 8)?,
                    read_u32_be(data, offset + 16)?,
                    read_u64_be(data, offset + 24)?,
                );
                offset += 32;
                fields
            }
            0 => {
                let fields = (
                    read_u32_be(data, offset)? as u64,
                    read_u32_be(data, offset + 4)? as u64,
                    read_u32_be(data, offset + 8)?,
                    read_u32_be(data, offset + 16)? as u64,
                );
                offset += 20;
                fields
            }
            _ => return Err("Unsupported TKHD version".into()),
        };

        offset += 8;  // skip reserved[2]
        let layer = read_u16_be(data, offset)?;
        let alternate_group = read_u16_be(data, offset + 2)?;
        let volume = read_u16_be(data, offset + 4)?;
        offset += 8;  // skip reserved after volume

        let matrix = read_matrix(data, offset)?;
        offset += 36;

        let width = read_u32_be(data, offset)?;
        let height = read_u32_be(data, offset + 4)?;

        Ok((
            TkhdBox {
                version,
                flags,
                creation_time,
                modification_time,
                track_id,
                duration,
                layer,
                alternate_group,
                volume,
                matrix,
                width,
                height,
            },
            size
        ))
    }
}
