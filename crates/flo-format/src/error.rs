//! Error types for the flo container crate.

use thiserror::Error;

/// Errors that can occur when reading or writing flo containers.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("invalid magic bytes: expected FLO! (0x464C4F21)")]
    BadMagic,

    #[error("unsupported format version {major}.{minor}")]
    UnsupportedVersion { major: u8, minor: u8 },

    #[error("declared chunk sizes inconsistent with file length: {detail}")]
    SizeInconsistent { detail: String },

    #[error("truncated {chunk} chunk: need {needed} bytes, have {available}")]
    TruncatedChunk {
        chunk: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("corrupt TOC: {detail}")]
    CorruptToc { detail: String },

    #[error("unknown frame type {0}")]
    UnknownFrameType(u8),

    #[error("channel payload inconsistent: {detail}")]
    ChannelSizeMismatch { detail: String },

    #[error("DATA CRC32 mismatch: header says {expected:#010x}, computed {computed:#010x}")]
    CrcMismatch { expected: u32, computed: u32 },
}

pub type Result<T> = std::result::Result<T, FormatError>;
