use crate::{check_box_header, format_fourcc, read_u16_be, read_version_and_flags, write_version_and_flags};

use super::generic::Mp4Box;

/// The `SmhdBox` represents the Sound Media Header Box.
/// It provides audio-specific information, like balance.
#[derive(Clone, Default)]
pub struct SmhdBox {
    pub version: u8,
    pub flags: u32,
    pub balance: i16,  // 8.8 fixed-point format, 0 is centered
}

impl std::fmt::Debug for SmhdBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmhdBox")
            .field("box_size", &self.box_size())
            .field("box_type", &format_fourcc(&self.box_type()))
            .field("balance", &self.balance)
            .finish()
    }
}

impl Mp4Box for SmhdBox {
    fn box_type(&self) -> [u8; 4] { *b"smhd" }

    fn box_size(&self) -> u32 {
        8 + 4 + 4  // Header + version/flags + balance/reserved
    }

    fn write_box(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.box_size().to_be_bytes());
        buffer.extend_from_slice(&self.box_type());
        write_version_and_flags(buffer, self.version, self.flags);
        buffer.extend_from_slice(&self.balance.to_be_bytes());
        buffer.extend_from_slice(&0u16.to_be_bytes());  // reserved
    }

    fn read_box(data: &[u8]) -> Result<(Self, usize), String> {
        let size = check_box_header(data, b"smhd")?;
        let data = &data[..size];
        let (version, flags) = read_version_and_flags(data)?;
        let balance = read_u16_be(data, 12)? as i16;

        Ok((SmhdBox { version, flags, balance }, size))
    }
}
