//! Container reader — parses a byte slice into the [`FloFile`] model.
//!
//! The reader validates the magic, version, declared chunk sizes and TOC
//! monotonicity before splitting the remaining bytes into TOC, DATA, EXTRA
//! and META. CRC verification is a separate, explicit step
//! ([`Reader::verify_crc`]) so that partially damaged files can still be
//! inspected.

use crate::crc::compute_crc32;
use crate::error::{FormatError, Result};
use crate::frame::{ChannelPayload, FloFile, Frame, FrameType, ResidualEncoding, MAX_LPC_ORDER};
use crate::header::{Header, HEADER_SIZE, MAGIC, VERSION_MAJOR};
use crate::toc::{validate_toc, TocEntry, MAX_TOC_ENTRIES, TOC_ENTRY_SIZE};

/// Upper bound on `frame_samples` accepted from a file (security limit;
/// one second at the maximum supported rate is 192 000).
pub const MAX_FRAME_SAMPLES: u32 = 2_000_000;

/// Byte-slice reader for flo containers.
pub struct Reader;

impl Reader {
    pub fn new() -> Self {
        Reader
    }

    /// Parse a complete flo file.
    pub fn read(&self, data: &[u8]) -> Result<FloFile> {
        let header = self.read_header(data)?;

        let expected = header.expected_file_len();
        if expected != data.len() as u64 {
            return Err(FormatError::SizeInconsistent {
                detail: format!(
                    "declared chunks total {} bytes, file is {}",
                    expected,
                    data.len()
                ),
            });
        }

        let toc_start = (4 + header.header_size) as usize;
        let toc_end = toc_start + header.toc_size as usize;
        let toc = self.read_toc(&data[toc_start..toc_end])?;

        let data_start = toc_end;
        let data_end = data_start + header.data_size as usize;
        validate_toc(&toc, header.data_size)?;

        tracing::debug!(
            sample_rate = header.sample_rate,
            channels = header.channels,
            toc_entries = toc.len(),
            data_size = header.data_size,
            "parsed flo header and TOC"
        );

        let frames = self.read_frames(&data[data_start..data_end], header.channels)?;

        let extra_start = data_end;
        let extra_end = extra_start + header.extra_size as usize;
        let extra = data[extra_start..extra_end].to_vec();

        let meta_start = extra_end;
        let meta_end = meta_start + header.meta_size as usize;
        let metadata = data[meta_start..meta_end].to_vec();

        Ok(FloFile {
            header,
            toc,
            frames,
            extra,
            metadata,
        })
    }

    /// Parse only the magic and fixed header.
    pub fn read_header(&self, data: &[u8]) -> Result<Header> {
        let fixed_len = 4 + HEADER_SIZE as usize;
        if data.len() < fixed_len {
            return Err(FormatError::TruncatedChunk {
                chunk: "header",
                needed: fixed_len,
                available: data.len(),
            });
        }
        if data[0..4] != MAGIC {
            return Err(FormatError::BadMagic);
        }

        let version_major = data[4];
        let version_minor = data[5];
        if version_major != VERSION_MAJOR {
            return Err(FormatError::UnsupportedVersion {
                major: version_major,
                minor: version_minor,
            });
        }

        let header = Header {
            version_major,
            version_minor,
            flags: u16::from_le_bytes([data[6], data[7]]),
            sample_rate: read_u32(data, 8),
            channels: data[12],
            bit_depth: data[13],
            total_frames: read_u64(data, 14),
            compression_level: data[22],
            // 3 reserved bytes at 23..26
            data_crc32: read_u32(data, 26),
            header_size: read_u64(data, 30),
            toc_size: read_u64(data, 38),
            data_size: read_u64(data, 46),
            extra_size: read_u64(data, 54),
            meta_size: read_u64(data, 62),
        };

        if header.header_size != HEADER_SIZE {
            return Err(FormatError::SizeInconsistent {
                detail: format!("header_size is {}, expected {}", header.header_size, HEADER_SIZE),
            });
        }

        Ok(header)
    }

    /// Recompute the DATA CRC32 and compare it against the header field.
    pub fn verify_crc(&self, data: &[u8]) -> Result<()> {
        let header = self.read_header(data)?;
        if header.expected_file_len() != data.len() as u64 {
            return Err(FormatError::SizeInconsistent {
                detail: format!(
                    "declared chunks total {} bytes, file is {}",
                    header.expected_file_len(),
                    data.len()
                ),
            });
        }
        let start = header.data_offset() as usize;
        let end = start + header.data_size as usize;
        let computed = compute_crc32(&data[start..end]);
        if computed != header.data_crc32 {
            return Err(FormatError::CrcMismatch {
                expected: header.data_crc32,
                computed,
            });
        }
        Ok(())
    }

    /// Parse the TOC chunk: a u32 entry count followed by 20-byte entries.
    fn read_toc(&self, chunk: &[u8]) -> Result<Vec<TocEntry>> {
        if chunk.is_empty() {
            return Ok(Vec::new());
        }
        if chunk.len() < 4 {
            return Err(FormatError::TruncatedChunk {
                chunk: "TOC",
                needed: 4,
                available: chunk.len(),
            });
        }

        let num_entries = read_u32(chunk, 0);
        if num_entries > MAX_TOC_ENTRIES {
            return Err(FormatError::CorruptToc {
                detail: format!("{num_entries} entries exceeds limit {MAX_TOC_ENTRIES}"),
            });
        }
        let needed = 4 + num_entries as usize * TOC_ENTRY_SIZE;
        if chunk.len() < needed {
            return Err(FormatError::TruncatedChunk {
                chunk: "TOC",
                needed,
                available: chunk.len(),
            });
        }

        let mut entries = Vec::with_capacity(num_entries as usize);
        for i in 0..num_entries as usize {
            let at = 4 + i * TOC_ENTRY_SIZE;
            entries.push(TocEntry {
                frame_index: read_u32(chunk, at),
                byte_offset: read_u64(chunk, at + 4),
                frame_size: read_u32(chunk, at + 12),
                timestamp_ms: read_u32(chunk, at + 16),
            });
        }
        Ok(entries)
    }

    /// Parse the DATA chunk sequentially. Frames are self-delimiting, so a
    /// sparse TOC does not prevent a full parse.
    fn read_frames(&self, data: &[u8], channels: u8) -> Result<Vec<Frame>> {
        let mut frames = Vec::new();
        let mut pos = 0usize;
        while pos < data.len() {
            let (frame, consumed) = parse_frame(&data[pos..], channels)?;
            frames.push(frame);
            pos += consumed;
        }
        Ok(frames)
    }
}

impl Default for Reader {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a single frame record from the start of `data`.
/// Returns the frame and the number of bytes consumed.
pub fn parse_frame(data: &[u8], channels: u8) -> Result<(Frame, usize)> {
    if data.len() < 6 {
        return Err(FormatError::TruncatedChunk {
            chunk: "DATA",
            needed: 6,
            available: data.len(),
        });
    }

    let type_byte = data[0];
    let frame_type = FrameType::from_u8(type_byte).ok_or(FormatError::UnknownFrameType(type_byte))?;
    let frame_samples = read_u32(data, 1);
    if frame_samples > MAX_FRAME_SAMPLES {
        return Err(FormatError::ChannelSizeMismatch {
            detail: format!("frame_samples {frame_samples} exceeds limit {MAX_FRAME_SAMPLES}"),
        });
    }

    let mut frame = Frame::new(frame_type, frame_samples);
    frame.flags = data[5];

    let mut pos = 6usize;
    for ch in 0..channels {
        if pos + 4 > data.len() {
            return Err(FormatError::TruncatedChunk {
                chunk: "DATA",
                needed: pos + 4,
                available: data.len(),
            });
        }
        let ch_size = read_u32(data, pos) as usize;
        pos += 4;
        if pos + ch_size > data.len() {
            return Err(FormatError::ChannelSizeMismatch {
                detail: format!(
                    "channel {ch} declares {ch_size} bytes but only {} remain",
                    data.len() - pos
                ),
            });
        }
        let payload = parse_channel_payload(&data[pos..pos + ch_size], frame_type)?;
        frame.channels.push(payload);
        pos += ch_size;
    }

    Ok((frame, pos))
}

fn parse_channel_payload(data: &[u8], frame_type: FrameType) -> Result<ChannelPayload> {
    match frame_type {
        FrameType::Silence => {
            if !data.is_empty() {
                return Err(FormatError::ChannelSizeMismatch {
                    detail: format!("silence channel carries {} bytes", data.len()),
                });
            }
            Ok(ChannelPayload::Silence)
        }
        FrameType::Raw => Ok(ChannelPayload::Raw {
            samples: data.to_vec(),
        }),
        FrameType::Transform => Ok(ChannelPayload::Transform {
            blocks: data.to_vec(),
        }),
        FrameType::Alpc(_) => parse_alpc_payload(data),
    }
}

fn parse_alpc_payload(data: &[u8]) -> Result<ChannelPayload> {
    if data.is_empty() {
        return Err(FormatError::ChannelSizeMismatch {
            detail: "empty ALPC channel payload".into(),
        });
    }

    let coeff_count = data[0] as usize;
    if coeff_count > MAX_LPC_ORDER {
        return Err(FormatError::ChannelSizeMismatch {
            detail: format!("coeff_count {coeff_count} exceeds order {MAX_LPC_ORDER}"),
        });
    }

    // coeff_count + coeffs + shift_bits + residual_encoding
    let fixed = 1 + coeff_count * 4 + 2;
    if data.len() < fixed {
        return Err(FormatError::ChannelSizeMismatch {
            detail: format!(
                "ALPC payload of {} bytes too small for {coeff_count} coefficients",
                data.len()
            ),
        });
    }

    let mut coeffs = Vec::with_capacity(coeff_count);
    for i in 0..coeff_count {
        let at = 1 + i * 4;
        coeffs.push(i32::from_le_bytes([
            data[at],
            data[at + 1],
            data[at + 2],
            data[at + 3],
        ]));
    }

    let mut pos = 1 + coeff_count * 4;
    let shift_bits = data[pos];
    pos += 1;
    let encoding_byte = data[pos];
    pos += 1;
    let residual_encoding = ResidualEncoding::from_u8(encoding_byte).ok_or_else(|| {
        FormatError::ChannelSizeMismatch {
            detail: format!("unknown residual encoding {encoding_byte}"),
        }
    })?;

    let rice_parameter = if residual_encoding == ResidualEncoding::Raw {
        0
    } else {
        if pos >= data.len() {
            return Err(FormatError::ChannelSizeMismatch {
                detail: "missing entropy parameter byte".into(),
            });
        }
        let p = data[pos];
        pos += 1;
        p
    };

    Ok(ChannelPayload::Alpc {
        coeffs,
        shift_bits,
        residual_encoding,
        rice_parameter,
        residuals: data[pos..].to_vec(),
    })
}

#[inline]
fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

#[inline]
fn read_u64(data: &[u8], at: usize) -> u64 {
    u64::from_le_bytes([
        data[at],
        data[at + 1],
        data[at + 2],
        data[at + 3],
        data[at + 4],
        data[at + 5],
        data[at + 6],
        data[at + 7],
    ])
}
