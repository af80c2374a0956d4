//! Lossless encoder: per-frame silence detection, optional mid/side
//! decorrelation, order search over ALPC predictors, and residual coding
//! mode selection by exact bit cost.

use flo_format::{
    ChannelPayload, Frame, FrameType, ResidualEncoding, Writer, FRAME_FLAG_MID_SIDE,
    MAX_LPC_ORDER,
};

use super::lpc;
use crate::error::{check_params, CodecError, Result};
use crate::pcm;
use crate::rice;

/// Any frame whose peak magnitude stays below 2^-30 is digital silence.
const SILENCE_THRESHOLD: f32 = 1.0 / (1u64 << 30) as f32;

/// Lossless ALPC encoder.
pub struct Encoder {
    sample_rate: u32,
    channels: u8,
    bit_depth: u8,
    compression_level: u8,
}

impl Encoder {
    pub fn new(sample_rate: u32, channels: u8, bit_depth: u8) -> Self {
        Self {
            sample_rate,
            channels,
            bit_depth,
            compression_level: 5,
        }
    }

    /// Set the order-search effort (0-9). Level 0 searches orders 1-3,
    /// level 5 orders 1-8, level 9 all orders 1-12.
    pub fn with_compression(mut self, level: u8) -> Self {
        self.compression_level = level.min(9);
        self
    }

    /// Encode interleaved float PCM into a complete flo file.
    pub fn encode(&self, samples: &[f32], metadata: &[u8]) -> Result<Vec<u8>> {
        let frames = self.encode_frames(samples)?;
        let writer = Writer::new(self.sample_rate, self.channels, self.bit_depth)
            .with_compression_level(self.compression_level);
        Ok(writer.finalize(&frames, metadata)?)
    }

    /// Encode interleaved float PCM into frame records without a container.
    pub fn encode_frames(&self, samples: &[f32]) -> Result<Vec<Frame>> {
        check_params(self.sample_rate, self.channels, self.bit_depth)?;
        let channels = self.channels as usize;
        if samples.len() % channels != 0 {
            return Err(CodecError::UnsupportedParameter {
                detail: format!(
                    "{} samples do not divide into {channels} channels",
                    samples.len()
                ),
            });
        }

        let per_frame = self.sample_rate as usize * channels;
        let mut frames = Vec::with_capacity(samples.len().div_ceil(per_frame.max(1)));
        for chunk in samples.chunks(per_frame) {
            frames.push(self.encode_frame(chunk));
        }
        tracing::debug!(frames = frames.len(), "lossless encode complete");
        Ok(frames)
    }

    /// Encode a single frame of interleaved samples.
    pub fn encode_frame(&self, samples: &[f32]) -> Frame {
        let channels = self.channels as usize;
        let frame_samples = (samples.len() / channels) as u32;

        if samples.iter().all(|&s| s.abs() < SILENCE_THRESHOLD) {
            let mut frame = Frame::new(FrameType::Silence, frame_samples);
            frame.channels = vec![ChannelPayload::Silence; channels];
            return frame;
        }

        let quantized = pcm::quantize(samples, self.bit_depth);
        let mut planes = pcm::deinterleave(&quantized, channels);

        // Mid/side needs one bit of headroom; at 32-bit depth l+r would
        // overflow the integer domain.
        let mid_side =
            channels == 2 && self.bit_depth < 32 && side_is_cheaper(&planes[0], &planes[1]);
        if mid_side {
            let (mid, side) = pcm::to_mid_side(&planes[0], &planes[1]);
            planes[0] = mid;
            planes[1] = side;
        }

        let max_order = (3 + self.compression_level as usize).min(MAX_LPC_ORDER);
        let encoded: Vec<ChannelEncoding> = planes
            .iter()
            .map(|plane| self.encode_channel(plane, max_order))
            .collect();

        let all_raw = encoded.iter().all(|e| e.order == 0 && e.is_plain_raw);
        let frame_type = if all_raw {
            FrameType::Raw
        } else {
            let order = encoded.iter().map(|e| e.order).max().unwrap_or(1).max(1);
            FrameType::Alpc(order as u8)
        };

        let mut frame = Frame::new(frame_type, frame_samples);
        if mid_side {
            frame.flags |= FRAME_FLAG_MID_SIDE;
        }
        frame.channels = encoded
            .into_iter()
            .map(|e| match frame_type {
                FrameType::Raw => ChannelPayload::Raw {
                    samples: e.raw_pcm.unwrap_or_default(),
                },
                _ => e.payload,
            })
            .collect();
        frame
    }

    /// Search predictor orders and residual coding modes for one channel.
    fn encode_channel(&self, samples: &[i32], max_order: usize) -> ChannelEncoding {
        // Baseline: verbatim samples, Rice coded with no predictor.
        let mut best = self.residual_candidate(samples, Vec::new(), 0);
        let mut best_order = 0usize;

        // Plain PCM candidate, usable as a Raw frame when every channel
        // prefers it.
        let plain_raw_ok = rice::fits_width(samples, self.bit_depth);
        let raw_cost = samples.len() * (self.bit_depth as usize / 8);
        let mut is_plain_raw = plain_raw_ok && raw_cost < best.1;
        if is_plain_raw {
            best.1 = raw_cost;
        }

        let autocorr = lpc::autocorrelation(samples, max_order);
        let mut seen_orders = 0usize;
        for order in 1..=max_order.min(samples.len().saturating_sub(1)) {
            let Some(coeffs) = lpc::levinson_durbin(&autocorr, order) else {
                continue;
            };
            // Instability truncation can map several nominal orders to the
            // same achieved predictor; evaluate each achieved order once.
            if coeffs.len() <= seen_orders {
                continue;
            }
            seen_orders = coeffs.len();

            let (qcoeffs, shift) = lpc::quantize_coefficients(&coeffs);
            let residuals = lpc::residuals(samples, &qcoeffs, shift);
            if residuals.iter().any(|&r| r.unsigned_abs() > 1 << 28) {
                // Quantized predictor diverged; an escape hatch, not a path
                // the stability truncation normally leaves open.
                continue;
            }

            let candidate = self.residual_candidate(samples, qcoeffs, shift);
            if candidate.1 < best.1 {
                best_order = seen_orders;
                best = candidate;
                is_plain_raw = false;
            }
        }

        ChannelEncoding {
            payload: best.0,
            order: best_order,
            is_plain_raw,
            raw_pcm: if is_plain_raw {
                Some(pcm::pack_pcm(samples, self.bit_depth))
            } else {
                None
            },
        }
    }

    /// Build the cheapest residual coding (Rice / Golomb / Raw) for the
    /// given predictor, returning the payload and its byte size.
    fn residual_candidate(
        &self,
        samples: &[i32],
        coeffs: Vec<i32>,
        shift: u8,
    ) -> (ChannelPayload, usize) {
        let residuals = lpc::residuals(samples, &coeffs, shift);
        let header_len = 1 + coeffs.len() * 4 + 2;

        let k = rice::select_rice_parameter(&residuals);
        let rice_bits = rice::rice_bit_cost(&residuals, k);
        let mut mode = ResidualEncoding::Rice;
        let mut parameter = k;
        let mut best_bits = rice_bits;

        if let Some(m) = rice::select_golomb_modulus(&residuals) {
            let golomb_bits = rice::golomb_bit_cost(&residuals, m);
            if golomb_bits < best_bits {
                mode = ResidualEncoding::Golomb;
                parameter = m as u8;
                best_bits = golomb_bits;
            }
        }

        let raw_bits = residuals.len() as u64 * u64::from(self.bit_depth);
        if raw_bits < best_bits && rice::fits_width(&residuals, self.bit_depth) {
            mode = ResidualEncoding::Raw;
            parameter = 0;
        }

        let encoded = match mode {
            ResidualEncoding::Rice => rice::encode_rice(&residuals, parameter),
            ResidualEncoding::Golomb => rice::encode_golomb(&residuals, u32::from(parameter)),
            ResidualEncoding::Raw => rice::encode_raw(&residuals, self.bit_depth),
        };

        let payload = ChannelPayload::Alpc {
            coeffs,
            shift_bits: shift,
            residual_encoding: mode,
            rice_parameter: parameter,
            residuals: encoded,
        };
        let total = header_len
            + match &payload {
                ChannelPayload::Alpc { residuals, residual_encoding, .. } => {
                    residuals.len() + usize::from(*residual_encoding != ResidualEncoding::Raw)
                }
                _ => 0,
            };
        (payload, total)
    }
}

struct ChannelEncoding {
    payload: ChannelPayload,
    order: usize,
    is_plain_raw: bool,
    raw_pcm: Option<Vec<u8>>,
}

/// Mid/side pays off when the side signal carries less energy than the
/// average of the two input channels.
fn side_is_cheaper(left: &[i32], right: &[i32]) -> bool {
    let mut energy_l = 0.0f64;
    let mut energy_r = 0.0f64;
    let mut energy_side = 0.0f64;
    for (&l, &r) in left.iter().zip(right) {
        energy_l += f64::from(l) * f64::from(l);
        energy_r += f64::from(r) * f64::from(r);
        let s = f64::from(l) - f64::from(r);
        energy_side += s * s;
    }
    energy_side < (energy_l + energy_r) / 2.0
}
