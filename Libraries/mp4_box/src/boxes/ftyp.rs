use crate::{check_box_header, format_fourcc, read_fourcc, read_u32_be};

use super::generic::Mp4Box;

// The `FtypBox` struct represents a File Type Box in the MP4 file format.
// This box specifies the file type and compatibility information for the MP4 file.
// It contains the following fields:
// - `major_brand`: A 4-byte array indicating the major brand of the file.
// - `minor_version`: A 32-bit unsigned integer indicating the minor version of the major brand.
// - `compatible_brands`: A vector of 4-byte arrays indicating other compatible brands.
#[derive(Clone, PartialEq, Eq)]
pub struct FtypBox {
    pub major_brand: [u8; 4], // Major brand of the file.
    pub minor_version: u32,   // Minor version of the major brand.
    pub compatible_brands: Vec<[u8; 4]>, // List of compatible brands.
}

// The default `FtypBox` describes a plain progressive file:
// - `major_brand`: "isom".
// - `minor_version`: 512.
// - `compatible_brands`: ["isom", "iso2", "avc1", "mp41"].
impl Default for FtypBox {
    fn default() -> Self {
        FtypBox {
            major_brand: *b"isom",
            minor_version: 512,
            compatible_brands: vec![
                *b"isom",
                *b"iso2",
                *b"avc1",
                *b"mp41",
            ],
        }
    }
}

impl std::fmt::Debug for FtypBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FtypBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("major_brand", &format_fourcc(&self.major_brand))
            .field("minor_version", &self.minor_version)
            .field("compatible_brands",
                &self.compatible_brands.iter()
                    .map(format_fourcc)
                    .collect::<Vec<_>>()
            )
            .finish()
    }
}

impl Mp4Box for FtypBox {
    fn box_type(&self) -> [u8; 4] { *b"ftyp" }

    // 8 header + 4 major brand + 4 minor version + 4 per compatible brand.
    fn box_size(&self) -> u32 {
        8 + 4 + 4 + (4 * self.compatible_brands.len() as u32)
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        buffer.extend_from_slice(&self.major_brand);
        buffer.extend_from_slice(&self.minor_version.to_be_bytes());
        for brand in &self.compatible_brands {
            buffer.extend_from_slice(brand);
        }
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = check_box_header(data, b"ftyp")?;
        if size < 16 {
            return Err("FTYP box too small".into());
        }

        let major_brand = read_fourcc(data, 8)?;
        let minor_version = read_u32_be(data, 12)?;

        let mut compatible_brands = Vec::new();
        let mut offset = 16;
        while offset + 4 <= size {
            compatible_brands.push(read_fourcc(data, offset)?);
            offset += 4;
        }

        Ok((
            FtypBox {
                major_brand,
                minor_version,
                compatible_brands,
            },
            size
        ))
    }
}
