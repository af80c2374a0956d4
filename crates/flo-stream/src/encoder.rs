//! Incremental encoder: accepts PCM as it is captured and emits encoded
//! frames one second at a time; `finalize` assembles the frames it still
//! holds into a complete file.

use flo_codec::{check_params, Encoder, Result};
use flo_format::{write_frame, Frame, Writer};

/// One encoded frame ready for transmission.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub index: u32,
    pub timestamp_ms: u32,
    /// The serialized frame record.
    pub data: Vec<u8>,
    /// Samples per channel in this frame.
    pub samples: u32,
}

/// Incremental lossless encoder.
pub struct StreamingEncoder {
    sample_rate: u32,
    channels: u8,
    bit_depth: u8,
    compression_level: u8,
    encoder: Encoder,
    sample_buffer: Vec<f32>,
    /// Encoded frames not yet drained by `next_frame`.
    pending: Vec<(Frame, EncodedFrame)>,
    total_samples: u64,
    frame_index: u32,
}

impl StreamingEncoder {
    pub fn new(sample_rate: u32, channels: u8, bit_depth: u8) -> Self {
        Self {
            sample_rate,
            channels,
            bit_depth,
            compression_level: 5,
            encoder: Encoder::new(sample_rate, channels, bit_depth),
            sample_buffer: Vec::with_capacity(sample_rate as usize * channels as usize),
            pending: Vec::new(),
            total_samples: 0,
            frame_index: 0,
        }
    }

    /// Set the lossless order-search effort (0-9).
    pub fn with_compression(mut self, level: u8) -> Self {
        self.compression_level = level.min(9);
        self.encoder =
            Encoder::new(self.sample_rate, self.channels, self.bit_depth).with_compression(level);
        self
    }

    /// Samples per channel buffered but not yet encoded.
    pub fn pending_samples(&self) -> usize {
        self.sample_buffer.len() / self.channels as usize
    }

    /// Encoded frames waiting to be drained.
    pub fn pending_frames(&self) -> usize {
        self.pending.len()
    }

    /// Append interleaved samples, encoding every completed one-second
    /// frame.
    pub fn push_samples(&mut self, samples: &[f32]) -> Result<()> {
        check_params(self.sample_rate, self.channels, self.bit_depth)?;
        self.sample_buffer.extend_from_slice(samples);
        let per_frame = self.sample_rate as usize * self.channels as usize;
        while self.sample_buffer.len() >= per_frame {
            let frame_samples: Vec<f32> = self.sample_buffer.drain(..per_frame).collect();
            self.encode_buffered(&frame_samples)?;
        }
        Ok(())
    }

    /// Pop the next encoded frame, if any.
    pub fn next_frame(&mut self) -> Option<EncodedFrame> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.pending.remove(0).1)
        }
    }

    /// Encode whatever remains in the sample buffer as a short final frame.
    pub fn flush(&mut self) -> Result<Option<EncodedFrame>> {
        if self.sample_buffer.is_empty() {
            return Ok(None);
        }
        let rest = std::mem::take(&mut self.sample_buffer);
        self.encode_buffered(&rest)?;
        Ok(self.pending.last().map(|(_, e)| e.clone()))
    }

    /// Flush and assemble every frame still held into a complete file.
    /// Frames already drained with [`StreamingEncoder::next_frame`] are the
    /// caller's responsibility and are not re-included.
    pub fn finalize(&mut self, metadata: &[u8]) -> Result<Vec<u8>> {
        self.flush()?;
        let frames: Vec<Frame> = self.pending.drain(..).map(|(f, _)| f).collect();
        let writer = Writer::new(self.sample_rate, self.channels, self.bit_depth)
            .with_compression_level(self.compression_level);
        Ok(writer.finalize(&frames, metadata)?)
    }

    fn encode_buffered(&mut self, samples: &[f32]) -> Result<()> {
        let samples_per_channel = (samples.len() / self.channels as usize) as u32;
        let timestamp_ms =
            (self.total_samples * 1000 / u64::from(self.sample_rate)) as u32;

        let frame = self.encoder.encode_frame(samples);
        let mut data = Vec::with_capacity(frame.byte_len());
        write_frame(&mut data, &frame);

        let encoded = EncodedFrame {
            index: self.frame_index,
            timestamp_ms,
            data,
            samples: samples_per_channel,
        };
        tracing::debug!(
            index = encoded.index,
            bytes = encoded.data.len(),
            samples = encoded.samples,
            "streaming frame encoded"
        );

        self.pending.push((frame, encoded));
        self.total_samples += u64::from(samples_per_channel);
        self.frame_index += 1;
        Ok(())
    }
}
