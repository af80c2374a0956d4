//! Lossless decoder: exact inverse of the ALPC encoder.

use flo_format::{ChannelPayload, FloFile, Frame, Header, Reader, ResidualEncoding};

use super::lpc;
use crate::error::{CodecError, Result};
use crate::pcm;
use crate::rice;

/// Lossless ALPC decoder.
pub struct Decoder;

impl Decoder {
    pub fn new() -> Self {
        Decoder
    }

    /// Decode a complete flo file to interleaved float PCM.
    pub fn decode(&self, data: &[u8]) -> Result<Vec<f32>> {
        let file = Reader::new().read(data)?;
        self.decode_file(&file)
    }

    /// Decode an already-parsed file.
    pub fn decode_file(&self, file: &FloFile) -> Result<Vec<f32>> {
        let channels = file.header.channels as usize;
        let mut planes: Vec<Vec<i32>> = vec![Vec::new(); channels];

        for frame in &file.frames {
            let decoded = self.decode_frame(frame, &file.header)?;
            for (plane, samples) in planes.iter_mut().zip(decoded) {
                plane.extend(samples);
            }
        }

        Ok(pcm::interleave_to_float(&planes, file.header.bit_depth))
    }

    /// Decode one frame into per-channel integer planes.
    pub fn decode_frame(&self, frame: &Frame, header: &Header) -> Result<Vec<Vec<i32>>> {
        let channels = header.channels as usize;
        if frame.channels.len() != channels {
            return Err(CodecError::Format(flo_format::FormatError::ChannelSizeMismatch {
                detail: format!(
                    "frame carries {} channels, header declares {channels}",
                    frame.channels.len()
                ),
            }));
        }

        let frame_samples = frame.frame_samples as usize;
        let mut planes: Vec<Vec<i32>> = frame
            .channels
            .iter()
            .map(|ch| self.decode_channel(ch, frame_samples, header.bit_depth))
            .collect::<Result<_>>()?;

        if frame.is_mid_side() && planes.len() == 2 {
            let (left, right) = pcm::from_mid_side(&planes[0], &planes[1]);
            planes[0] = left;
            planes[1] = right;
        }

        Ok(planes)
    }

    fn decode_channel(
        &self,
        payload: &ChannelPayload,
        frame_samples: usize,
        bit_depth: u8,
    ) -> Result<Vec<i32>> {
        match payload {
            ChannelPayload::Silence => Ok(vec![0; frame_samples]),

            ChannelPayload::Raw { samples } => {
                let decoded = pcm::unpack_pcm(samples, bit_depth);
                if decoded.len() != frame_samples {
                    return Err(CodecError::TruncatedBitstream {
                        detail: format!(
                            "raw channel holds {} samples, frame declares {frame_samples}",
                            decoded.len()
                        ),
                    });
                }
                Ok(decoded)
            }

            ChannelPayload::Alpc {
                coeffs,
                shift_bits,
                residual_encoding,
                rice_parameter,
                residuals,
            } => {
                if *shift_bits > 31 {
                    return Err(CodecError::PredictorUnstable {
                        detail: format!("shift of {shift_bits} bits out of range"),
                    });
                }
                let decoded = match residual_encoding {
                    ResidualEncoding::Rice => {
                        rice::decode_rice(residuals, *rice_parameter, frame_samples)?
                    }
                    ResidualEncoding::Golomb => {
                        rice::decode_golomb(residuals, u32::from(*rice_parameter), frame_samples)?
                    }
                    ResidualEncoding::Raw => {
                        rice::decode_raw(residuals, bit_depth, frame_samples)?
                    }
                };
                Ok(lpc::reconstruct(&decoded, coeffs, *shift_bits, frame_samples))
            }

            ChannelPayload::Transform { .. } => Err(CodecError::TransformOverflow {
                detail: "transform payload in a lossless frame".into(),
            }),
        }
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}
