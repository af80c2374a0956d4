//! File header — the first 70 bytes (magic + 66-byte header) of every flo file.

use serde::{Deserialize, Serialize};

/// Magic bytes identifying a flo file: `FLO!` (0x464C4F21)
pub const MAGIC: [u8; 4] = [0x46, 0x4C, 0x4F, 0x21];

/// Current format version.
pub const VERSION_MAJOR: u8 = 1;
pub const VERSION_MINOR: u8 = 1;

/// Size of the fixed header in bytes, excluding the 4-byte magic.
pub const HEADER_SIZE: u64 = 66;

/// Byte offset of the `meta_size` field from the start of the file.
/// magic(4) + version(2) + flags(2) + sample_rate(4) + channels(1) +
/// bit_depth(1) + total_frames(8) + compression_level(1) + reserved(3) +
/// data_crc32(4) + header_size(8) + toc_size(8) + data_size(8) + extra_size(8)
pub const META_SIZE_OFFSET: usize = 62;

/// Header flag: file carries transform (lossy) frames.
pub const FLAG_LOSSY: u16 = 0x0001;

/// Shift of the 4-bit lossy quality level within the flags field.
pub const FLAG_QUALITY_SHIFT: u16 = 8;

/// The fixed-size header following the magic bytes.
///
/// Layout (66 bytes, little-endian, offsets relative to the field block):
/// - `[0]`      version_major: u8
/// - `[1]`      version_minor: u8
/// - `[2..4]`   flags: u16 (bit 0 = lossy, bits 8-11 = quality level 0..4)
/// - `[4..8]`   sample_rate: u32
/// - `[8]`      channels: u8 (1 or 2)
/// - `[9]`      bit_depth: u8 (16/24/32)
/// - `[10..18]` total_frames: u64
/// - `[18]`     compression_level: u8 (0-9 lossless order-search hint)
/// - `[19..22]` reserved: [u8; 3] (zero)
/// - `[22..26]` data_crc32: u32 (over the entire DATA chunk)
/// - `[26..34]` header_size: u64 (66)
/// - `[34..42]` toc_size: u64
/// - `[42..50]` data_size: u64
/// - `[50..58]` extra_size: u64
/// - `[58..66]` meta_size: u64
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub version_major: u8,
    pub version_minor: u8,
    /// Bit 0 = lossy; bits 8-11 = lossy quality level 0..4.
    pub flags: u16,
    /// Sample rate in Hz (8_000..=192_000).
    pub sample_rate: u32,
    /// Channel count (1 or 2).
    pub channels: u8,
    /// Declared bits per sample (16/24/32).
    pub bit_depth: u8,
    /// Count of one-second frames, including a shorter final frame.
    pub total_frames: u64,
    /// Lossless order-search hint (0-9).
    pub compression_level: u8,
    /// CRC32 (IEEE 802.3 reflected) over the DATA chunk bytes.
    pub data_crc32: u32,
    /// Size of this header excluding magic; always [`HEADER_SIZE`].
    pub header_size: u64,
    pub toc_size: u64,
    pub data_size: u64,
    pub extra_size: u64,
    pub meta_size: u64,
}

impl Header {
    /// Create a header for the given stream parameters with zeroed chunk sizes.
    pub fn new(sample_rate: u32, channels: u8, bit_depth: u8) -> Self {
        Self {
            version_major: VERSION_MAJOR,
            version_minor: VERSION_MINOR,
            flags: 0,
            sample_rate,
            channels,
            bit_depth,
            total_frames: 0,
            compression_level: 5,
            data_crc32: 0,
            header_size: HEADER_SIZE,
            toc_size: 0,
            data_size: 0,
            extra_size: 0,
            meta_size: 0,
        }
    }

    /// Whether the lossy flag is set.
    pub fn is_lossy(&self) -> bool {
        self.flags & FLAG_LOSSY != 0
    }

    /// The 4-bit lossy quality level carried in the flags field.
    pub fn lossy_quality(&self) -> u8 {
        ((self.flags >> FLAG_QUALITY_SHIFT) & 0x0F) as u8
    }

    /// Set the lossy flag together with the quality level (clamped to 0..=4).
    pub fn set_lossy(&mut self, quality_level: u8) {
        self.flags |= FLAG_LOSSY;
        self.flags |= u16::from(quality_level.min(4)) << FLAG_QUALITY_SHIFT;
    }

    /// Total file length implied by the declared chunk sizes. Saturates so
    /// absurd declared sizes read as inconsistent rather than wrapping.
    pub fn expected_file_len(&self) -> u64 {
        4u64.saturating_add(self.header_size)
            .saturating_add(self.toc_size)
            .saturating_add(self.data_size)
            .saturating_add(self.extra_size)
            .saturating_add(self.meta_size)
    }

    /// Byte offset of the DATA chunk from the start of the file.
    pub fn data_offset(&self) -> u64 {
        4 + self.header_size + self.toc_size
    }

    /// Byte offset of the META chunk from the start of the file.
    pub fn meta_offset(&self) -> u64 {
        self.data_offset() + self.data_size + self.extra_size
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new(44_100, 1, 16)
    }
}
