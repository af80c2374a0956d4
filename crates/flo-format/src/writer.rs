//! Container writer — serializes frames and metadata into a flo file.
//!
//! The writer uses a builder pattern: create a [`Writer`] with the stream
//! parameters, adjust options, then call [`Writer::finalize`] with the
//! encoded frames. Output is deterministic byte-for-byte for identical
//! inputs: the DATA chunk is built first, its CRC32 computed, and only then
//! is the header assembled.

use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Write;

use crate::crc::compute_crc32;
use crate::error::Result;
use crate::frame::{ChannelPayload, Frame, FrameType, ResidualEncoding};
use crate::header::{HEADER_SIZE, MAGIC, VERSION_MAJOR, VERSION_MINOR};
use crate::toc::TOC_ENTRY_SIZE;

/// Builder for flo files.
pub struct Writer {
    sample_rate: u32,
    channels: u8,
    bit_depth: u8,
    compression_level: u8,
    lossy_quality: Option<u8>,
}

impl Writer {
    /// Create a writer for the given stream parameters.
    pub fn new(sample_rate: u32, channels: u8, bit_depth: u8) -> Self {
        Self {
            sample_rate,
            channels,
            bit_depth,
            compression_level: 5,
            lossy_quality: None,
        }
    }

    /// Set the lossless order-search hint recorded in the header (0-9).
    pub fn with_compression_level(mut self, level: u8) -> Self {
        self.compression_level = level.min(9);
        self
    }

    /// Mark the file as lossy with the given quality level (0-4).
    pub fn with_lossy_quality(mut self, quality_level: u8) -> Self {
        self.lossy_quality = Some(quality_level.min(4));
        self
    }

    /// Serialize the complete file: magic, header, TOC, DATA, EXTRA (empty),
    /// META.
    pub fn finalize(&self, frames: &[Frame], metadata: &[u8]) -> Result<Vec<u8>> {
        let data_chunk = build_data_chunk(frames);
        let toc_chunk = build_toc_chunk(frames, self.sample_rate);
        let data_crc32 = compute_crc32(&data_chunk);

        let toc_size = toc_chunk.len() as u64;
        let data_size = data_chunk.len() as u64;
        let extra_size = 0u64;
        let meta_size = metadata.len() as u64;

        let mut flags: u16 = 0;
        if let Some(q) = self.lossy_quality {
            flags |= crate::header::FLAG_LOSSY;
            flags |= u16::from(q) << crate::header::FLAG_QUALITY_SHIFT;
        }

        let total =
            4 + HEADER_SIZE as usize + toc_chunk.len() + data_chunk.len() + metadata.len();
        let mut out = Vec::with_capacity(total);

        out.write_all(&MAGIC).expect("write to Vec cannot fail");
        out.write_u8(VERSION_MAJOR).expect("write to Vec cannot fail");
        out.write_u8(VERSION_MINOR).expect("write to Vec cannot fail");
        out.write_u16::<LittleEndian>(flags)
            .expect("write to Vec cannot fail");
        out.write_u32::<LittleEndian>(self.sample_rate)
            .expect("write to Vec cannot fail");
        out.write_u8(self.channels).expect("write to Vec cannot fail");
        out.write_u8(self.bit_depth).expect("write to Vec cannot fail");
        out.write_u64::<LittleEndian>(frames.len() as u64)
            .expect("write to Vec cannot fail");
        out.write_u8(self.compression_level)
            .expect("write to Vec cannot fail");
        out.write_all(&[0u8; 3]).expect("write to Vec cannot fail");
        out.write_u32::<LittleEndian>(data_crc32)
            .expect("write to Vec cannot fail");
        out.write_u64::<LittleEndian>(HEADER_SIZE)
            .expect("write to Vec cannot fail");
        out.write_u64::<LittleEndian>(toc_size)
            .expect("write to Vec cannot fail");
        out.write_u64::<LittleEndian>(data_size)
            .expect("write to Vec cannot fail");
        out.write_u64::<LittleEndian>(extra_size)
            .expect("write to Vec cannot fail");
        out.write_u64::<LittleEndian>(meta_size)
            .expect("write to Vec cannot fail");

        out.extend_from_slice(&toc_chunk);
        out.extend_from_slice(&data_chunk);
        // EXTRA is empty by default.
        out.extend_from_slice(metadata);

        tracing::debug!(
            frames = frames.len(),
            toc_size,
            data_size,
            meta_size,
            crc = format!("{data_crc32:#010x}"),
            "assembled flo file"
        );

        Ok(out)
    }
}

/// Serialize the TOC chunk: u32 entry count, then one 20-byte entry per
/// frame. Timestamps accumulate the real per-frame sample counts so that
/// shorter lossy frames still index correctly.
fn build_toc_chunk(frames: &[Frame], sample_rate: u32) -> Vec<u8> {
    let mut toc = Vec::with_capacity(4 + frames.len() * TOC_ENTRY_SIZE);
    toc.write_u32::<LittleEndian>(frames.len() as u32)
        .expect("write to Vec cannot fail");

    let mut byte_offset = 0u64;
    let mut sample_offset = 0u64;
    for (i, frame) in frames.iter().enumerate() {
        let frame_size = frame.byte_len() as u32;
        let timestamp_ms = if sample_rate == 0 {
            0
        } else {
            (sample_offset * 1000 / u64::from(sample_rate)) as u32
        };

        toc.write_u32::<LittleEndian>(i as u32)
            .expect("write to Vec cannot fail");
        toc.write_u64::<LittleEndian>(byte_offset)
            .expect("write to Vec cannot fail");
        toc.write_u32::<LittleEndian>(frame_size)
            .expect("write to Vec cannot fail");
        toc.write_u32::<LittleEndian>(timestamp_ms)
            .expect("write to Vec cannot fail");

        byte_offset += u64::from(frame_size);
        sample_offset += u64::from(frame.frame_samples);
    }

    toc
}

fn build_data_chunk(frames: &[Frame]) -> Vec<u8> {
    let mut data = Vec::new();
    for frame in frames {
        write_frame(&mut data, frame);
    }
    data
}

/// Serialize one frame record into `out`.
pub fn write_frame(out: &mut Vec<u8>, frame: &Frame) {
    out.write_u8(frame.frame_type.as_u8())
        .expect("write to Vec cannot fail");
    out.write_u32::<LittleEndian>(frame.frame_samples)
        .expect("write to Vec cannot fail");
    out.write_u8(frame.flags).expect("write to Vec cannot fail");

    for channel in &frame.channels {
        out.write_u32::<LittleEndian>(channel.byte_len() as u32)
            .expect("write to Vec cannot fail");
        write_channel_payload(out, channel, frame.frame_type);
    }
}

fn write_channel_payload(out: &mut Vec<u8>, channel: &ChannelPayload, frame_type: FrameType) {
    match (frame_type, channel) {
        (FrameType::Silence, ChannelPayload::Silence) => {}
        (FrameType::Raw, ChannelPayload::Raw { samples }) => out.extend_from_slice(samples),
        (FrameType::Transform, ChannelPayload::Transform { blocks }) => {
            out.extend_from_slice(blocks)
        }
        (
            FrameType::Alpc(_),
            ChannelPayload::Alpc {
                coeffs,
                shift_bits,
                residual_encoding,
                rice_parameter,
                residuals,
            },
        ) => {
            out.write_u8(coeffs.len() as u8)
                .expect("write to Vec cannot fail");
            for &c in coeffs {
                out.write_i32::<LittleEndian>(c)
                    .expect("write to Vec cannot fail");
            }
            out.write_u8(*shift_bits).expect("write to Vec cannot fail");
            out.write_u8(*residual_encoding as u8)
                .expect("write to Vec cannot fail");
            if *residual_encoding != ResidualEncoding::Raw {
                out.write_u8(*rice_parameter)
                    .expect("write to Vec cannot fail");
            }
            out.extend_from_slice(residuals);
        }
        // A payload that does not match the frame type is a construction bug;
        // writers only build frames through the encoders, which cannot
        // produce this shape.
        _ => debug_assert!(false, "channel payload does not match frame type"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::Reader;

    fn silence_frame(channels: usize, samples: u32) -> Frame {
        let mut f = Frame::new(FrameType::Silence, samples);
        for _ in 0..channels {
            f.channels.push(ChannelPayload::Silence);
        }
        f
    }

    #[test]
    fn writer_output_is_deterministic() {
        let frames = vec![silence_frame(2, 48_000), silence_frame(2, 1_000)];
        let writer = Writer::new(48_000, 2, 16);
        let a = writer.finalize(&frames, b"meta").unwrap();
        let b = writer.finalize(&frames, b"meta").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn file_length_invariant_holds() {
        let frames = vec![silence_frame(1, 44_100)];
        let bytes = Writer::new(44_100, 1, 16)
            .finalize(&frames, b"hello")
            .unwrap();
        let header = Reader::new().read_header(&bytes).unwrap();
        assert_eq!(header.expected_file_len(), bytes.len() as u64);
    }

    #[test]
    fn round_trip_through_reader() {
        let mut frame = Frame::new(FrameType::Alpc(2), 100);
        frame.channels.push(ChannelPayload::Alpc {
            coeffs: vec![1 << 14, -(1 << 13)],
            shift_bits: 14,
            residual_encoding: ResidualEncoding::Rice,
            rice_parameter: 3,
            residuals: vec![0xDE, 0xAD, 0xBE],
        });
        let frames = vec![frame.clone()];

        let bytes = Writer::new(44_100, 1, 16).finalize(&frames, &[]).unwrap();
        let file = Reader::new().read(&bytes).unwrap();

        assert_eq!(file.frames.len(), 1);
        assert_eq!(file.frames[0], frame);
        assert_eq!(file.toc.len(), 1);
        assert_eq!(file.toc[0].frame_size as usize, frame.byte_len());
        assert!(Reader::new().verify_crc(&bytes).is_ok());
    }

    #[test]
    fn toc_timestamps_accumulate_samples() {
        let frames = vec![
            silence_frame(1, 44_100),
            silence_frame(1, 44_100),
            silence_frame(1, 22_050),
        ];
        let bytes = Writer::new(44_100, 1, 16).finalize(&frames, &[]).unwrap();
        let file = Reader::new().read(&bytes).unwrap();
        let stamps: Vec<u32> = file.toc.iter().map(|e| e.timestamp_ms).collect();
        assert_eq!(stamps, vec![0, 1000, 2000]);
    }

    #[test]
    fn lossy_flag_round_trips() {
        let frames = vec![silence_frame(1, 1024)];
        let bytes = Writer::new(44_100, 1, 16)
            .with_lossy_quality(2)
            .finalize(&frames, &[])
            .unwrap();
        let header = Reader::new().read_header(&bytes).unwrap();
        assert!(header.is_lossy());
        assert_eq!(header.lossy_quality(), 2);
    }
}
