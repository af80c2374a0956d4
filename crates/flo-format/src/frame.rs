//! Frame records and per-channel payloads within the DATA chunk.

use serde::{Deserialize, Serialize};

/// Highest ALPC predictor order representable by a frame type.
pub const MAX_LPC_ORDER: usize = 12;

/// Frame flag: stereo channels are stored as mid/side (mid = L+R, side = L-R).
pub const FRAME_FLAG_MID_SIDE: u8 = 0x01;

/// The wire tag of a frame.
///
/// | value | kind      |
/// |-------|-----------|
/// | 0     | silence   |
/// | 1-12  | ALPC, order N |
/// | 253   | transform (MDCT lossy) |
/// | 254   | raw integer PCM |
/// | 255   | reserved  |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameType {
    Silence,
    Alpc(u8),
    Transform,
    Raw,
}

impl FrameType {
    /// Decode a wire tag. Returns `None` for reserved or unknown values.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(FrameType::Silence),
            1..=12 => Some(FrameType::Alpc(value)),
            253 => Some(FrameType::Transform),
            254 => Some(FrameType::Raw),
            _ => None,
        }
    }

    /// The wire tag for this frame type.
    pub fn as_u8(self) -> u8 {
        match self {
            FrameType::Silence => 0,
            FrameType::Alpc(order) => order,
            FrameType::Transform => 253,
            FrameType::Raw => 254,
        }
    }

    /// Nominal predictor order for ALPC frames.
    pub fn lpc_order(self) -> Option<usize> {
        match self {
            FrameType::Alpc(order) => Some(order as usize),
            _ => None,
        }
    }
}

/// How the residual bitstream of an ALPC channel is coded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ResidualEncoding {
    Rice = 0,
    Golomb = 1,
    Raw = 2,
}

impl ResidualEncoding {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ResidualEncoding::Rice),
            1 => Some(ResidualEncoding::Golomb),
            2 => Some(ResidualEncoding::Raw),
            _ => None,
        }
    }
}

/// One channel's payload inside a frame, tagged by the frame type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChannelPayload {
    /// No data; the channel is digital silence.
    Silence,
    /// Linear-predictive channel: quantized coefficients plus an entropy-coded
    /// residual bitstream. `coeffs.len()` may be below the frame's nominal
    /// order when the predictor was truncated at an unstable step.
    Alpc {
        coeffs: Vec<i32>,
        shift_bits: u8,
        residual_encoding: ResidualEncoding,
        /// Rice parameter k, or the Golomb modulus low byte; meaningful only
        /// for the matching `residual_encoding`.
        rice_parameter: u8,
        residuals: Vec<u8>,
    },
    /// Serialized MDCT block sequence; decoded by the lossy codec.
    Transform { blocks: Vec<u8> },
    /// Uncompressed integer PCM at the declared bit depth, little-endian.
    Raw { samples: Vec<u8> },
}

impl ChannelPayload {
    /// Serialized size of this payload in bytes (excluding the u32 prefix).
    pub fn byte_len(&self) -> usize {
        match self {
            ChannelPayload::Silence => 0,
            ChannelPayload::Alpc {
                coeffs,
                residual_encoding,
                residuals,
                ..
            } => {
                // coeff_count + coeffs + shift_bits + residual_encoding
                let mut len = 1 + coeffs.len() * 4 + 1 + 1;
                if *residual_encoding != ResidualEncoding::Raw {
                    len += 1; // rice parameter / golomb modulus byte
                }
                len + residuals.len()
            }
            ChannelPayload::Transform { blocks } => blocks.len(),
            ChannelPayload::Raw { samples } => samples.len(),
        }
    }
}

/// One frame of audio: up to one second of samples across all channels.
///
/// Layout: frame_type u8, frame_samples u32, flags u8, then one
/// `channel_size: u32` + payload per channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub frame_type: FrameType,
    /// Samples per channel carried by this frame. Equals the sample rate for
    /// full lossless frames; the final frame may be shorter.
    pub frame_samples: u32,
    pub flags: u8,
    pub channels: Vec<ChannelPayload>,
}

impl Frame {
    pub fn new(frame_type: FrameType, frame_samples: u32) -> Self {
        Self {
            frame_type,
            frame_samples,
            flags: 0,
            channels: Vec::new(),
        }
    }

    /// Whether the mid/side flag is set.
    pub fn is_mid_side(&self) -> bool {
        self.flags & FRAME_FLAG_MID_SIDE != 0
    }

    /// Serialized size of the whole frame record in bytes.
    pub fn byte_len(&self) -> usize {
        6 + self
            .channels
            .iter()
            .map(|ch| 4 + ch.byte_len())
            .sum::<usize>()
    }
}

/// A fully parsed flo file.
#[derive(Debug, Clone)]
pub struct FloFile {
    pub header: crate::Header,
    pub toc: Vec<crate::TocEntry>,
    pub frames: Vec<Frame>,
    pub extra: Vec<u8>,
    pub metadata: Vec<u8>,
}

impl FloFile {
    /// Total decoded samples per channel, summed over all frames.
    pub fn total_samples(&self) -> u64 {
        self.frames.iter().map(|f| u64::from(f.frame_samples)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_type_tags_round_trip() {
        for tag in [0u8, 1, 7, 12, 253, 254] {
            let ft = FrameType::from_u8(tag).unwrap();
            assert_eq!(ft.as_u8(), tag);
        }
        assert_eq!(FrameType::from_u8(13), None);
        assert_eq!(FrameType::from_u8(255), None);
        assert_eq!(FrameType::Alpc(8).lpc_order(), Some(8));
        assert_eq!(FrameType::Raw.lpc_order(), None);
    }

    #[test]
    fn alpc_payload_len_counts_parameter_byte() {
        let with_rice = ChannelPayload::Alpc {
            coeffs: vec![1, 2, 3],
            shift_bits: 14,
            residual_encoding: ResidualEncoding::Rice,
            rice_parameter: 6,
            residuals: vec![0; 10],
        };
        // 1 + 12 + 1 + 1 + 1 + 10
        assert_eq!(with_rice.byte_len(), 26);

        let raw_mode = ChannelPayload::Alpc {
            coeffs: vec![],
            shift_bits: 0,
            residual_encoding: ResidualEncoding::Raw,
            rice_parameter: 0,
            residuals: vec![0; 10],
        };
        // 1 + 0 + 1 + 1 + 10
        assert_eq!(raw_mode.byte_len(), 13);
    }

    #[test]
    fn frame_len_includes_channel_prefixes() {
        let mut frame = Frame::new(FrameType::Silence, 44_100);
        frame.channels.push(ChannelPayload::Silence);
        frame.channels.push(ChannelPayload::Silence);
        assert_eq!(frame.byte_len(), 6 + 4 + 4);
    }
}
