//! Incremental decoder: parses container bytes as they arrive and emits PCM
//! one complete frame at a time.
//!
//! `feed` never consumes past an incomplete record and `next_frame` never
//! emits a partial frame. "No data yet" is `Ok(None)`; corruption is an
//! error. The DATA CRC covers the whole chunk and therefore cannot be
//! checked mid-stream; callers wanting integrity run `validate` on the
//! complete file.

use flo_codec::{pcm, Decoder as LosslessDecoder, Result, TransformDecoder};
use flo_format::{parse_frame, FrameType, Header, Reader, TocEntry, HEADER_SIZE};

/// Parsing state of a [`StreamingDecoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// The fixed header is not complete yet.
    AwaitingHeader,
    /// The header is parsed; the TOC is not complete yet.
    AwaitingToc,
    /// Frames can be decoded as their bytes arrive.
    Ready,
    /// Every indexed frame has been decoded.
    Finished,
}

/// Stream parameters, available once the header is parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    pub sample_rate: u32,
    pub channels: u8,
    pub bit_depth: u8,
    pub total_frames: u64,
    pub is_lossy: bool,
}

/// Incremental flo decoder. Single-owner: one instance per stream, freed
/// explicitly with [`StreamingDecoder::free`].
pub struct StreamingDecoder {
    buffer: Vec<u8>,
    state: DecoderState,
    header: Option<Header>,
    toc: Vec<TocEntry>,
    data_offset: usize,
    next_frame_index: usize,
    lossless: LosslessDecoder,
    transform: Option<TransformDecoder>,
}

impl StreamingDecoder {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(64 * 1024),
            state: DecoderState::AwaitingHeader,
            header: None,
            toc: Vec::new(),
            data_offset: 0,
            next_frame_index: 0,
            lossless: LosslessDecoder::new(),
            transform: None,
        }
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Append bytes. Returns whether at least one new complete frame became
    /// decodable.
    pub fn feed(&mut self, data: &[u8]) -> Result<bool> {
        self.buffer.extend_from_slice(data);
        self.try_advance()
    }

    /// Stream parameters, once the header is complete.
    pub fn get_info(&self) -> Option<StreamInfo> {
        self.header.as_ref().map(|h| StreamInfo {
            sample_rate: h.sample_rate,
            channels: h.channels,
            bit_depth: h.bit_depth,
            total_frames: h.total_frames,
            is_lossy: h.is_lossy(),
        })
    }

    /// Decode the next frame if all of its bytes are buffered.
    pub fn next_frame(&mut self) -> Result<Option<Vec<f32>>> {
        self.try_advance()?;
        if self.state != DecoderState::Ready {
            return Ok(None);
        }
        let header = self
            .header
            .clone()
            .expect("Ready state always has a header");

        if self.next_frame_index >= self.toc.len() {
            self.state = DecoderState::Finished;
            return Ok(None);
        }

        let entry = &self.toc[self.next_frame_index];
        let start = self.data_offset.saturating_add(entry.byte_offset as usize);
        let end = start.saturating_add(entry.frame_size as usize);
        if end > self.buffer.len() {
            return Ok(None);
        }

        let (frame, _) = parse_frame(&self.buffer[start..end], header.channels)?;
        let samples = match frame.frame_type {
            FrameType::Transform => {
                let transform = self.transform.get_or_insert_with(|| {
                    TransformDecoder::new(header.sample_rate, header.channels)
                });
                transform.decode_frame(&frame)?
            }
            _ => {
                let planes = self.lossless.decode_frame(&frame, &header)?;
                pcm::interleave_to_float(&planes, header.bit_depth)
            }
        };

        self.next_frame_index += 1;
        if self.next_frame_index >= self.toc.len() {
            self.state = DecoderState::Finished;
        }
        Ok(Some(samples))
    }

    /// Decode every frame that is fully buffered, concatenated.
    pub fn decode_available(&mut self) -> Result<Vec<f32>> {
        let mut out = Vec::new();
        while let Some(samples) = self.next_frame()? {
            out.extend(samples);
        }
        Ok(out)
    }

    /// Frames fully buffered but not yet decoded.
    pub fn available_frames(&self) -> usize {
        self.toc
            .iter()
            .skip(self.next_frame_index)
            .take_while(|entry| {
                self.data_offset
                    .saturating_add(entry.byte_offset as usize)
                    .saturating_add(entry.frame_size as usize)
                    <= self.buffer.len()
            })
            .count()
    }

    /// Index of the next frame to decode.
    pub fn current_frame_index(&self) -> usize {
        self.next_frame_index
    }

    /// Bytes currently buffered.
    pub fn buffered_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Discard all parsed state but keep the buffered bytes; the stream is
    /// re-parsed from the start on the next call.
    pub fn reset(&mut self) {
        self.state = DecoderState::AwaitingHeader;
        self.header = None;
        self.toc.clear();
        self.data_offset = 0;
        self.next_frame_index = 0;
        self.transform = None;
    }

    /// Release the decoder and its buffer.
    pub fn free(self) {}

    fn try_advance(&mut self) -> Result<bool> {
        if self.state == DecoderState::AwaitingHeader {
            let fixed = 4 + HEADER_SIZE as usize;
            if self.buffer.len() < fixed {
                return Ok(false);
            }
            let header = Reader::new().read_header(&self.buffer)?;
            tracing::debug!(
                sample_rate = header.sample_rate,
                channels = header.channels,
                lossy = header.is_lossy(),
                "stream header parsed"
            );
            self.header = Some(header);
            self.state = DecoderState::AwaitingToc;
        }

        if self.state == DecoderState::AwaitingToc {
            let header = self.header.as_ref().expect("state past AwaitingHeader");
            let max_toc = 4 + flo_format::MAX_TOC_ENTRIES as u64 * flo_format::TOC_ENTRY_SIZE as u64;
            if header.toc_size > max_toc {
                return Err(flo_format::FormatError::CorruptToc {
                    detail: format!("declared TOC of {} bytes exceeds limit", header.toc_size),
                }
                .into());
            }
            let toc_start = (4 + header.header_size) as usize;
            let toc_end = toc_start + header.toc_size as usize;
            if self.buffer.len() < toc_end {
                return Ok(false);
            }
            self.toc = parse_toc_chunk(&self.buffer[toc_start..toc_end], header.data_size)?;
            self.data_offset = toc_end;
            self.state = DecoderState::Ready;
            tracing::debug!(entries = self.toc.len(), "stream TOC parsed");
        }

        Ok(self.available_frames() > 0)
    }
}

impl Default for StreamingDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a complete TOC chunk and validate its invariants. Same wire rules
/// as the container reader, applied to the chunk in isolation.
fn parse_toc_chunk(chunk: &[u8], data_size: u64) -> Result<Vec<TocEntry>> {
    use flo_format::{toc::validate_toc, FormatError, MAX_TOC_ENTRIES, TOC_ENTRY_SIZE};

    if chunk.is_empty() {
        return Ok(Vec::new());
    }
    if chunk.len() < 4 {
        return Err(FormatError::TruncatedChunk {
            chunk: "TOC",
            needed: 4,
            available: chunk.len(),
        }
        .into());
    }
    let count = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    if count > MAX_TOC_ENTRIES {
        return Err(FormatError::CorruptToc {
            detail: format!("{count} entries exceeds limit {MAX_TOC_ENTRIES}"),
        }
        .into());
    }
    let needed = 4 + count as usize * TOC_ENTRY_SIZE;
    if chunk.len() < needed {
        return Err(FormatError::TruncatedChunk {
            chunk: "TOC",
            needed,
            available: chunk.len(),
        }
        .into());
    }

    let mut entries = Vec::with_capacity(count as usize);
    for i in 0..count as usize {
        let at = 4 + i * TOC_ENTRY_SIZE;
        entries.push(TocEntry {
            frame_index: u32::from_le_bytes([chunk[at], chunk[at + 1], chunk[at + 2], chunk[at + 3]]),
            byte_offset: u64::from_le_bytes([
                chunk[at + 4],
                chunk[at + 5],
                chunk[at + 6],
                chunk[at + 7],
                chunk[at + 8],
                chunk[at + 9],
                chunk[at + 10],
                chunk[at + 11],
            ]),
            frame_size: u32::from_le_bytes([
                chunk[at + 12],
                chunk[at + 13],
                chunk[at + 14],
                chunk[at + 15],
            ]),
            timestamp_ms: u32::from_le_bytes([
                chunk[at + 16],
                chunk[at + 17],
                chunk[at + 18],
                chunk[at + 19],
            ]),
        });
    }
    validate_toc(&entries, data_size)?;
    Ok(entries)
}
