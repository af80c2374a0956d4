//! # flo-format
//!
//! The flo container format library. Handles reading and writing `.flo`
//! files: the fixed header, the per-frame table of contents, frame records
//! with their per-channel payloads, the opaque EXTRA chunk and the
//! MessagePack META chunk.
//!
//! ## Format overview
//!
//! A `.flo` file consists of:
//! - **Magic** (4 bytes): `FLO!`
//! - **Header** (66 bytes): version, flags, stream parameters, chunk sizes,
//!   DATA CRC32
//! - **TOC**: u32 entry count + 20-byte seek entries
//! - **DATA**: self-delimiting frame records
//! - **EXTRA**: reserved, empty by default
//! - **META**: MessagePack metadata blob
//!
//! The invariant `file_length == 4 + header_size + toc_size + data_size +
//! extra_size + meta_size` holds for every well-formed file.
//!
//! ## Example
//! ```
//! use flo_format::{ChannelPayload, Frame, FrameType, Reader, Writer};
//!
//! let mut frame = Frame::new(FrameType::Silence, 44_100);
//! frame.channels.push(ChannelPayload::Silence);
//!
//! let bytes = Writer::new(44_100, 1, 16).finalize(&[frame], &[]).unwrap();
//! let file = Reader::new().read(&bytes).unwrap();
//! assert_eq!(file.header.total_frames, 1);
//! ```

pub mod crc;
pub mod error;
pub mod frame;
pub mod header;
pub mod reader;
pub mod toc;
pub mod writer;

pub use crc::compute_crc32;
pub use error::FormatError;
pub use frame::{
    ChannelPayload, FloFile, Frame, FrameType, ResidualEncoding, FRAME_FLAG_MID_SIDE,
    MAX_LPC_ORDER,
};
pub use header::{Header, HEADER_SIZE, MAGIC, META_SIZE_OFFSET, VERSION_MAJOR, VERSION_MINOR};
pub use reader::{parse_frame, Reader, MAX_FRAME_SAMPLES};
pub use toc::{TocEntry, MAX_TOC_ENTRIES, TOC_ENTRY_SIZE};
pub use writer::{write_frame, Writer};
