//! Table of contents — the per-frame seek index.

use serde::{Deserialize, Serialize};

use crate::error::{FormatError, Result};

/// Size of a single TOC entry in bytes.
pub const TOC_ENTRY_SIZE: usize = 20;

/// Upper bound on TOC entries accepted from a file (security limit).
pub const MAX_TOC_ENTRIES: u32 = 1_000_000;

/// One seek-index entry.
///
/// Layout (20 bytes, little-endian):
/// - `[0..4]`   frame_index: u32
/// - `[4..12]`  byte_offset: u64 (relative to DATA start)
/// - `[12..16]` frame_size: u32
/// - `[16..20]` timestamp_ms: u32
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub frame_index: u32,
    /// Byte offset of the frame within the DATA chunk.
    pub byte_offset: u64,
    /// Size of the frame record in bytes.
    pub frame_size: u32,
    /// Presentation timestamp of the frame start.
    pub timestamp_ms: u32,
}

/// Check the structural invariants of a parsed TOC against the DATA size:
/// entries strictly ascending by index and offset, and offsets+sizes
/// partitioning DATA exactly when one entry exists per frame.
pub fn validate_toc(entries: &[TocEntry], data_size: u64) -> Result<()> {
    let mut prev_index: Option<u32> = None;
    let mut prev_offset: Option<u64> = None;

    for entry in entries {
        if let Some(p) = prev_index {
            if entry.frame_index <= p {
                return Err(FormatError::CorruptToc {
                    detail: format!(
                        "frame index {} not ascending (previous {})",
                        entry.frame_index, p
                    ),
                });
            }
        }
        if let Some(p) = prev_offset {
            if entry.byte_offset <= p {
                return Err(FormatError::CorruptToc {
                    detail: format!(
                        "byte offset {} not ascending (previous {})",
                        entry.byte_offset, p
                    ),
                });
            }
        }
        let end = entry
            .byte_offset
            .checked_add(u64::from(entry.frame_size))
            .ok_or_else(|| FormatError::CorruptToc {
                detail: format!("offset {} + size {} overflows", entry.byte_offset, entry.frame_size),
            })?;
        if end > data_size {
            return Err(FormatError::CorruptToc {
                detail: format!(
                    "entry {} ends at {} beyond DATA size {}",
                    entry.frame_index, end, data_size
                ),
            });
        }
        prev_index = Some(entry.frame_index);
        prev_offset = Some(entry.byte_offset);
    }

    Ok(())
}
