use crate::{format_fourcc, read_fourcc, read_u32_be};

// The `Mp4Box` trait defines a generic interface for MP4 boxes.
// Each box has a specific type, size, and content, and this trait provides
// methods to interact with these properties.
//
// Required Methods:
// - `box_type`: Returns the 4-byte type identifier of the box.
// - `box_size`: Calculates the total size of the box in bytes, including the header.
// - `write_box`: Serializes the box into a buffer for writing to a file or stream.
// - `read_box`: Parses the box from the start of a byte slice.
pub trait Mp4Box {
    // Returns the 4-byte type identifier of the box.
    fn box_type(&self) -> [u8; 4];

    // Calculates the total size of the box in bytes.
    // The size includes the header (8 bytes: 4 bytes for size and 4 bytes for type)
    // and the size of the box's content.
    fn box_size(&self) -> u32;

    // Serializes the box into the provided buffer.
    fn write_box(&self, buffer: &mut Vec<u8>);

    /// Reads a box from the given byte slice.
    /// Returns a tuple of (BoxInstance, bytes_consumed).
    fn read_box(data: &[u8]) -> Result<(Self, usize), String> where Self: Sized;
}

/// Writes a child box and checks that it produced exactly `box_size()` bytes.
pub fn write_child<B: Mp4Box>(buffer: &mut Vec<u8>, child: &B) {
    let start = buffer.len();
    child.write_box(buffer);
    debug_assert_eq!(
        buffer.len() - start,
        child.box_size() as usize,
        "size mismatch writing {}",
        format_fourcc(&child.box_type())
    );
}

/// Iterates over the child boxes stored in `data[start..end]`, yielding the type of each
/// child together with the slice holding the complete child box.
pub struct ChildBoxes<'a> {
    data: &'a [u8],
    offset: usize,
    end: usize,
    parent: &'static str,
}

impl<'a> ChildBoxes<'a> {
    pub fn new(data: &'a [u8], start: usize, end: usize, parent: &'static str) -> Self {
        ChildBoxes { data, offset: start, end: end.min(data.len()), parent }
    }
}

impl<'a> Iterator for ChildBoxes<'a> {
    type Item = Result<([u8; 4], &'a [u8]), String>;

    fn next(&mut self) -> Option<Self::Item> {
        // Trailing bytes shorter than a header are padding.
        if self.offset + 8 > self.end {
            return None;
        }
        let child = read_u32_be(self.data, self.offset)
            .and_then(|size| read_fourcc(self.data, self.offset + 4).map(|t| (size as usize, t)));
        let (size, box_type) = match child {
            Ok(child) => child,
            Err(e) => {
                self.offset = self.end;
                return Some(Err(e));
            }
        };
        if size < 8 || self.offset + size > self.end {
            self.offset = self.end;
            return Some(Err(format!(
                "Invalid sub-box size {} for '{}' inside {}",
                size,
                format_fourcc(&box_type),
                self.parent
            )));
        }
        let slice = &self.data[self.offset..self.offset + size];
        self.offset += size;
        Some(Ok((box_type, slice)))
    }
}
