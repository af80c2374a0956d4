//! # flo-metadata
//!
//! Structured metadata for flo files: an ID3v2.4-equivalent record with
//! flo-specific extensions, serialized as MessagePack into the container's
//! META chunk, plus zero-copy metadata editing — replacing META never
//! touches the audio chunks, only the header's `meta_size` field.
//!
//! ```
//! use flo_metadata::{update_metadata, read_metadata, FloMetadata};
//! # use flo_format::{ChannelPayload, Frame, FrameType, Writer};
//! # let mut frame = Frame::new(FrameType::Silence, 44_100);
//! # frame.channels.push(ChannelPayload::Silence);
//! # let file = Writer::new(44_100, 1, 16).finalize(&[frame], &[]).unwrap();
//!
//! let meta = FloMetadata::with_basic(Some("Sweep".into()), Some("Test".into()), None);
//! let tagged = update_metadata(&file, &meta).unwrap();
//! assert_eq!(read_metadata(&tagged).unwrap(), meta);
//! ```

pub mod error;
pub mod record;

pub use error::{MetadataError, Result};
pub use record::{
    AnimatedCover, BpmChange, CollaborationCredit, Comment, CoverVariant, CoverVariantKind,
    CreatorNote, FloMetadata, KeyChange, LoudnessPoint, Lyrics, Picture, PictureKind,
    Popularimeter, RemixChainEntry, SectionKind, SectionMarker, SyncedContentKind, SyncedLine,
    SyncedLyrics, UserText, UserUrl, WaveformData,
};

use flo_format::{Reader, FormatError, META_SIZE_OFFSET};

/// Parse the META chunk of a flo file. An absent or empty chunk yields the
/// empty record.
pub fn read_metadata(file: &[u8]) -> Result<FloMetadata> {
    let raw = raw_metadata(file)?;
    if raw.is_empty() {
        return Ok(FloMetadata::default());
    }
    FloMetadata::from_msgpack(raw)
}

/// Borrow the raw MessagePack bytes of the META chunk.
pub fn raw_metadata(file: &[u8]) -> Result<&[u8]> {
    let header = Reader::new().read_header(file)?;
    if header.expected_file_len() != file.len() as u64 {
        return Err(MetadataError::Format(FormatError::SizeInconsistent {
            detail: format!(
                "declared chunks total {} bytes, file is {}",
                header.expected_file_len(),
                file.len()
            ),
        }));
    }
    let start = header.meta_offset() as usize;
    let end = start + header.meta_size as usize;
    Ok(&file[start..end])
}

/// Build a new file with the META chunk replaced by `metadata`.
/// Header, TOC, DATA and EXTRA are copied verbatim; only `meta_size`
/// changes, so the DATA CRC and every seek offset stay valid.
pub fn update_metadata(file: &[u8], metadata: &FloMetadata) -> Result<Vec<u8>> {
    update_metadata_bytes(file, &metadata.to_msgpack()?)
}

/// [`update_metadata`] with pre-serialized MessagePack bytes.
pub fn update_metadata_bytes(file: &[u8], metadata: &[u8]) -> Result<Vec<u8>> {
    let header = Reader::new().read_header(file)?;
    if header.expected_file_len() != file.len() as u64 {
        return Err(MetadataError::Format(FormatError::SizeInconsistent {
            detail: format!(
                "declared chunks total {} bytes, file is {}",
                header.expected_file_len(),
                file.len()
            ),
        }));
    }

    let meta_offset = header.meta_offset() as usize;
    let mut out = Vec::with_capacity(meta_offset + metadata.len());
    out.extend_from_slice(&file[..meta_offset]);
    out.extend_from_slice(metadata);
    out[META_SIZE_OFFSET..META_SIZE_OFFSET + 8]
        .copy_from_slice(&(metadata.len() as u64).to_le_bytes());

    tracing::debug!(
        old_meta = header.meta_size,
        new_meta = metadata.len(),
        "META chunk replaced"
    );
    Ok(out)
}

/// Build a new file with no META chunk.
pub fn strip_metadata(file: &[u8]) -> Result<Vec<u8>> {
    update_metadata_bytes(file, &[])
}

/// Whether the file declares a non-empty META chunk. Only the header is
/// inspected.
pub fn has_metadata(file: &[u8]) -> bool {
    match Reader::new().read_header(file) {
        Ok(header) => header.meta_size > 0,
        Err(_) => false,
    }
}
