//! CRC32 over the DATA chunk.
//!
//! IEEE 802.3 reflected polynomial 0xEDB88320, initial value 0xFFFFFFFF,
//! final XOR 0xFFFFFFFF — byte-identical to zlib and PNG.

/// Compute the CRC32 of a byte slice.
pub fn compute_crc32(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}
