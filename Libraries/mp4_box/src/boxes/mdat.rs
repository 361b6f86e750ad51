// The Media Data Box (`mdat`) holds the raw compressed samples. It is never loaded into
// memory as a whole: readers seek to individual samples and writers stream samples into it
// and patch the header once the final payload size is known.

/// Size of an `mdat` header that uses the 64-bit `largesize` field.
pub const MDAT_LARGE_HEADER_SIZE: u64 = 16;

/// Writes an `mdat` header in the 64-bit form (`size == 1` followed by `largesize`).
/// The header keeps the same length whatever the payload size, so it can be rewritten in place.
pub fn write_large_mdat_header(buffer: &mut Vec<u8>, payload_size: u64) {
    buffer.extend_from_slice(&1u32.to_be_bytes());
    buffer.extend_from_slice(b"mdat");
    buffer.extend_from_slice(&(payload_size + MDAT_LARGE_HEADER_SIZE).to_be_bytes());
}
