//! Transform decoder: dequantization, IMDCT and overlap-add with state
//! persisted across frames.

use flo_format::{ChannelPayload, Frame};

use crate::error::{CodecError, Result};
use crate::lossy::blocks::{group_into_slots, parse_channel_blocks, BlockRecord};
use crate::lossy::mdct::{Block, Mdct, SLOT_HOP, SLOT_SIZE};
use crate::lossy::psycho::{freq_to_band, scale_from_u16};

/// MDCT lossy decoder. A single instance must see every frame of a stream
/// in order: the per-channel overlap tail carries across frame boundaries.
pub struct TransformDecoder {
    sample_rate: u32,
    channels: u8,
    mdct: Mdct,
    /// Overlap tail (one hop) per channel.
    tail: Vec<Vec<f32>>,
    /// Decoded-but-unclaimed output per channel.
    pending: Vec<Vec<f32>>,
    /// Whether the pre-roll hop has been discarded yet.
    dropped_preroll: bool,
}

impl TransformDecoder {
    pub fn new(sample_rate: u32, channels: u8) -> Self {
        let channels_usize = channels as usize;
        Self {
            sample_rate,
            channels,
            mdct: Mdct::new(),
            tail: vec![vec![0.0; SLOT_HOP]; channels_usize],
            pending: vec![Vec::new(); channels_usize],
            dropped_preroll: false,
        }
    }

    /// Decode one transform frame into interleaved samples
    /// (`frame_samples × channels` values).
    pub fn decode_frame(&mut self, frame: &Frame) -> Result<Vec<f32>> {
        let channels = self.channels as usize;
        if frame.channels.len() != channels {
            return Err(CodecError::Format(
                flo_format::FormatError::ChannelSizeMismatch {
                    detail: format!(
                        "frame carries {} channels, stream has {channels}",
                        frame.channels.len()
                    ),
                },
            ));
        }

        // Parse every channel payload into per-slot block groups.
        let mut per_channel_slots = Vec::with_capacity(channels);
        for payload in &frame.channels {
            let ChannelPayload::Transform { blocks } = payload else {
                return Err(CodecError::TransformOverflow {
                    detail: "non-transform payload in a transform frame".into(),
                });
            };
            per_channel_slots.push(group_into_slots(parse_channel_blocks(blocks)?)?);
        }

        let slot_count = per_channel_slots[0].len();
        if per_channel_slots.iter().any(|s| s.len() != slot_count) {
            return Err(CodecError::TransformOverflow {
                detail: "channels disagree on slot count".into(),
            });
        }

        // Overlap-add slot by slot, channel by channel.
        for slot_index in 0..slot_count {
            let first_slot_of_stream = !self.dropped_preroll && slot_index == 0;
            for ch in 0..channels {
                let blocks = self.dequantize_slot(&per_channel_slots[ch][slot_index]);
                let slot_signal = self.mdct.synthesize_slot(&blocks)?;

                let mut emitted = Vec::with_capacity(SLOT_HOP);
                for i in 0..SLOT_HOP {
                    emitted.push(self.tail[ch][i] + slot_signal[i]);
                }
                self.tail[ch].copy_from_slice(&slot_signal[SLOT_HOP..SLOT_SIZE]);

                if !first_slot_of_stream {
                    self.pending[ch].extend(emitted);
                }
            }
            if first_slot_of_stream {
                self.dropped_preroll = true;
            }
        }

        // Claim this frame's samples from the pending output.
        let take = frame.frame_samples as usize;
        if self.pending.iter().any(|p| p.len() < take) {
            return Err(CodecError::TransformOverflow {
                detail: format!(
                    "frame declares {take} samples but its blocks produce only {}",
                    self.pending.iter().map(Vec::len).min().unwrap_or(0)
                ),
            });
        }

        let mut out = Vec::with_capacity(take * channels);
        for i in 0..take {
            for pending in &self.pending {
                out.push(pending[i].clamp(-1.0, 1.0));
            }
        }
        for pending in &mut self.pending {
            pending.drain(..take);
        }
        Ok(out)
    }

    /// Reset the overlap and output state (for a new stream or after a
    /// seek).
    pub fn reset(&mut self) {
        for tail in &mut self.tail {
            tail.iter_mut().for_each(|t| *t = 0.0);
        }
        for pending in &mut self.pending {
            pending.clear();
        }
        self.dropped_preroll = false;
    }

    /// Rebuild real coefficients from a slot's quantized records.
    fn dequantize_slot(&self, records: &[BlockRecord]) -> Vec<Block> {
        records
            .iter()
            .map(|record| {
                let n2 = record.quantized.len();
                let bin_hz = self.sample_rate as f32 / (2.0 * n2 as f32);
                let scales: Vec<f32> = record
                    .scale_factors
                    .iter()
                    .map(|&e| scale_from_u16(e))
                    .collect();
                let coeffs = record
                    .quantized
                    .iter()
                    .enumerate()
                    .map(|(k, &q)| {
                        let band = freq_to_band((k as f32 + 0.5) * bin_hz);
                        f32::from(q) * scales[band]
                    })
                    .collect();
                Block {
                    kind: record.kind,
                    coeffs,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lossy::TransformEncoder;

    fn sine(len: usize, freq: f32, amp: f32, rate: f32) -> Vec<f32> {
        (0..len)
            .map(|i| {
                let t = i as f32 / rate;
                (2.0 * std::f32::consts::PI * freq * t).sin() * amp
            })
            .collect()
    }

    fn psnr(reference: &[f32], decoded: &[f32]) -> f64 {
        assert_eq!(reference.len(), decoded.len());
        let mse: f64 = reference
            .iter()
            .zip(decoded)
            .map(|(&a, &b)| (f64::from(a) - f64::from(b)).powi(2))
            .sum::<f64>()
            / reference.len() as f64;
        if mse == 0.0 {
            return f64::INFINITY;
        }
        10.0 * (1.0 / mse).log10()
    }

    fn round_trip(samples: &[f32], rate: u32, channels: u8, quality: f32) -> Vec<f32> {
        let encoder = TransformEncoder::new(rate, channels, quality);
        let frames = encoder.encode_frames(samples).unwrap();
        let mut decoder = TransformDecoder::new(rate, channels);
        let mut out = Vec::new();
        for frame in &frames {
            out.extend(decoder.decode_frame(frame).unwrap());
        }
        out
    }

    #[test]
    fn transparent_sine_is_clean() {
        let samples = sine(2 * 44_100, 440.0, 0.5, 44_100.0);
        let decoded = round_trip(&samples, 44_100, 1, 0.95);
        assert_eq!(decoded.len(), samples.len());
        let p = psnr(&samples, &decoded);
        assert!(p >= 60.0, "PSNR {p:.1} dB");
    }

    #[test]
    fn high_quality_sine_stays_strong() {
        let samples = sine(44_100, 880.0, 0.8, 44_100.0);
        let decoded = round_trip(&samples, 44_100, 1, 0.55);
        let p = psnr(&samples, &decoded);
        assert!(p >= 40.0, "PSNR {p:.1} dB");
    }

    #[test]
    fn stereo_keeps_channels_apart() {
        let rate = 48_000u32;
        let left = sine(rate as usize, 440.0, 0.8, rate as f32);
        let right = sine(rate as usize, 554.37, 0.8, rate as f32);
        let interleaved: Vec<f32> = left
            .iter()
            .zip(&right)
            .flat_map(|(&l, &r)| [l, r])
            .collect();

        let decoded = round_trip(&interleaved, rate, 2, 0.55);
        assert_eq!(decoded.len(), interleaved.len());

        let decoded_left: Vec<f32> = decoded.iter().step_by(2).copied().collect();
        let decoded_right: Vec<f32> = decoded.iter().skip(1).step_by(2).copied().collect();
        assert!(psnr(&left, &decoded_left) >= 40.0);
        assert!(psnr(&right, &decoded_right) >= 40.0);
    }

    #[test]
    fn transient_content_round_trips() {
        let mut samples = vec![0.0f32; 2048];
        samples.extend(sine(6 * 1024, 1200.0, 0.9, 44_100.0));
        let decoded = round_trip(&samples, 44_100, 1, 0.75);
        assert_eq!(decoded.len(), samples.len());
        // The silent lead-in must stay quiet after the round trip.
        let lead_peak = decoded[..1024]
            .iter()
            .fold(0.0f32, |m, &s| m.max(s.abs()));
        assert!(lead_peak < 0.05, "lead peak {lead_peak}");
    }

    #[test]
    fn reset_restarts_the_stream() {
        let samples = sine(44_100, 440.0, 0.5, 44_100.0);
        let encoder = TransformEncoder::new(44_100, 1, 0.55);
        let frames = encoder.encode_frames(&samples).unwrap();

        let mut decoder = TransformDecoder::new(44_100, 1);
        let first: Vec<f32> = frames
            .iter()
            .flat_map(|f| decoder.decode_frame(f).unwrap())
            .collect();
        decoder.reset();
        let second: Vec<f32> = frames
            .iter()
            .flat_map(|f| decoder.decode_frame(f).unwrap())
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn corrupt_payload_is_an_error() {
        let samples = sine(20_000, 440.0, 0.5, 44_100.0);
        let encoder = TransformEncoder::new(44_100, 1, 0.5);
        let mut frames = encoder.encode_frames(&samples).unwrap();
        if let ChannelPayload::Transform { blocks } = &mut frames[0].channels[0] {
            blocks.truncate(10);
        }
        let mut decoder = TransformDecoder::new(44_100, 1);
        assert!(decoder.decode_frame(&frames[0]).is_err());
    }
}
