//! Transform encoder: block scheduling on the slot grid, psychoacoustic
//! quantization, and frame assembly.

use flo_format::{ChannelPayload, Frame, FrameType, Writer};

use crate::error::{check_params, CodecError, Result};
use crate::lossy::blocks::{write_block, BlockRecord};
use crate::lossy::mdct::{Block, BlockKind, Mdct, SHORT_SIZE, SLOT_HOP, SLOT_SIZE};
use crate::lossy::psycho::{scale_to_u16, PsychoModel, NUM_BARK_BANDS};
use crate::lossy::QualityPreset;

/// Energy ratio between consecutive 256-sample sub-blocks that flags a
/// transient.
const TRANSIENT_RATIO: f32 = 3.0;

/// Sub-block energy below this is never treated as a transient target.
const TRANSIENT_FLOOR: f32 = 1.0e-4;

/// MDCT lossy encoder.
pub struct TransformEncoder {
    sample_rate: u32,
    channels: u8,
    bit_depth: u8,
    quality: f32,
    mdct: Mdct,
    psycho: PsychoModel,
}

impl TransformEncoder {
    pub fn new(sample_rate: u32, channels: u8, quality: f32) -> Self {
        Self {
            sample_rate,
            channels,
            bit_depth: 16,
            quality: quality.clamp(0.0, 1.0),
            mdct: Mdct::new(),
            psycho: PsychoModel::new(sample_rate),
        }
    }

    /// Declared bit depth recorded in the header (advisory for lossy files).
    pub fn with_bit_depth(mut self, bit_depth: u8) -> Self {
        self.bit_depth = bit_depth;
        self
    }

    pub fn quality(&self) -> f32 {
        self.quality
    }

    /// Encode interleaved float PCM into a complete lossy flo file.
    pub fn encode(&self, samples: &[f32], metadata: &[u8]) -> Result<Vec<u8>> {
        let frames = self.encode_frames(samples)?;
        let writer = Writer::new(self.sample_rate, self.channels, self.bit_depth)
            .with_lossy_quality(QualityPreset::nearest(self.quality).level());
        Ok(writer.finalize(&frames, metadata)?)
    }

    /// Encode interleaved float PCM into transform frame records.
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
        let samples_per_channel = samples.len() / channels;
        if samples_per_channel == 0 {
            return Ok(Vec::new());
        }

        // Pre-roll one hop of silence so the first real samples have an
        // overlap partner, and pad the tail so the last window closes.
        let n_slots = (SLOT_HOP + samples_per_channel).div_ceil(SLOT_HOP) + 1;
        let padded_len = (n_slots + 1) * SLOT_HOP;
        let mut planes = vec![vec![0.0f32; padded_len]; channels];
        for (i, &s) in samples.iter().enumerate() {
            planes[i % channels][SLOT_HOP + i / channels] = s;
        }

        let schedule = build_schedule(&planes, n_slots);
        tracing::debug!(
            slots = n_slots,
            short_slots = schedule.iter().filter(|s| s.short).count(),
            quality = self.quality,
            "transform schedule built"
        );

        // Serialize every slot's block records per channel.
        let mut slot_payloads: Vec<Vec<Vec<u8>>> = Vec::with_capacity(n_slots);
        for (t, slot_kind) in schedule.iter().enumerate() {
            let mut per_channel = Vec::with_capacity(channels);
            for plane in &planes {
                let slot = &plane[t * SLOT_HOP..t * SLOT_HOP + SLOT_SIZE];
                let blocks = self.mdct.analyze_slot(slot, slot_kind.short, slot_kind.kind);
                let mut payload = Vec::new();
                for block in blocks {
                    write_block(&mut payload, &self.quantize_block(&block));
                }
                per_channel.push(payload);
            }
            slot_payloads.push(per_channel);
        }

        Ok(assemble_frames(
            slot_payloads,
            channels,
            self.sample_rate,
            samples_per_channel,
        ))
    }

    /// Quantize one block's coefficients with its scale factors.
    fn quantize_block(&self, block: &Block) -> BlockRecord {
        let scales = self.psycho.scale_factors(&block.coeffs, self.quality);
        let n2 = block.coeffs.len();
        let bin_hz = self.sample_rate as f32 / (2.0 * n2 as f32);

        let mut encoded_scales = [0u16; NUM_BARK_BANDS];
        for (slot, &scale) in encoded_scales.iter_mut().zip(&scales) {
            *slot = scale_to_u16(scale);
        }

        // Quantize against the scale the decoder will reconstruct, so
        // rounding in the u16 log encoding does not bias the result.
        let decoded_scales: Vec<f32> = encoded_scales
            .iter()
            .map(|&e| crate::lossy::psycho::scale_from_u16(e))
            .collect();

        let quantized = block
            .coeffs
            .iter()
            .enumerate()
            .map(|(k, &c)| {
                let band = crate::lossy::psycho::freq_to_band((k as f32 + 0.5) * bin_hz);
                let scale = decoded_scales[band];
                if scale > 0.0 {
                    (c / scale)
                        .round()
                        .clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16
                } else {
                    0
                }
            })
            .collect();

        BlockRecord {
            kind: block.kind,
            scale_factors: encoded_scales,
            quantized,
        }
    }
}

/// Per-slot schedule entry.
#[derive(Debug, Clone, Copy)]
struct SlotKind {
    short: bool,
    kind: BlockKind,
}

/// Decide short/long per slot from sub-block energy rises, then legalize
/// the sequence with Start/Stop transitions.
fn build_schedule(planes: &[Vec<f32>], n_slots: usize) -> Vec<SlotKind> {
    let mut short = vec![false; n_slots];
    for (t, slot) in short.iter_mut().enumerate() {
        *slot = slot_has_transient(planes, t);
    }
    // The pre-roll slot and the flush slot stay long so the stream always
    // opens and closes on a long-family window.
    short[0] = false;
    short[n_slots - 1] = false;

    // A lone long slot between short runs cannot be both Stop and Start;
    // absorb it into the short run.
    for t in 1..n_slots - 1 {
        if !short[t] && short[t - 1] && short[t + 1] {
            short[t] = true;
        }
    }

    (0..n_slots)
        .map(|t| {
            if short[t] {
                return SlotKind {
                    short: true,
                    kind: BlockKind::Short,
                };
            }
            let next_short = t + 1 < n_slots && short[t + 1];
            let prev_short = t > 0 && short[t - 1];
            let kind = if next_short {
                BlockKind::Start
            } else if prev_short {
                BlockKind::Stop
            } else {
                BlockKind::Long
            };
            SlotKind { short: false, kind }
        })
        .collect()
}

/// Whether any channel shows a sharp energy rise between consecutive
/// 256-sample sub-blocks of slot `t`.
fn slot_has_transient(planes: &[Vec<f32>], t: usize) -> bool {
    let sub_blocks = SLOT_SIZE / SHORT_SIZE;
    for plane in planes {
        let slot = &plane[t * SLOT_HOP..t * SLOT_HOP + SLOT_SIZE];
        let mut prev_energy = f32::MAX;
        for sub in 0..sub_blocks {
            let at = sub * SHORT_SIZE;
            let energy: f32 = slot[at..at + SHORT_SIZE].iter().map(|&s| s * s).sum();
            if energy > TRANSIENT_FLOOR && energy > TRANSIENT_RATIO * prev_energy.max(TRANSIENT_FLOOR)
            {
                return true;
            }
            prev_energy = energy;
        }
    }
    false
}

/// Group slot payloads into roughly one-second frames and distribute the
/// decoded sample budget across them.
fn assemble_frames(
    slot_payloads: Vec<Vec<Vec<u8>>>,
    channels: usize,
    sample_rate: u32,
    samples_per_channel: usize,
) -> Vec<Frame> {
    let slots_per_frame = (sample_rate as usize / SLOT_HOP).max(1);
    let n_slots = slot_payloads.len();

    let mut frames: Vec<Frame> = Vec::new();
    let mut assigned = 0usize;
    let mut slot_at = 0usize;
    while slot_at < n_slots {
        let end = (slot_at + slots_per_frame).min(n_slots);
        // One hop of output per slot; the very first slot only primes the
        // overlap and its hop is discarded.
        let preroll = if slot_at == 0 { SLOT_HOP } else { 0 };
        let emitted = (end - slot_at) * SLOT_HOP - preroll;
        let take = emitted.min(samples_per_channel - assigned);
        assigned += take;

        let mut channel_payloads = vec![Vec::new(); channels];
        for slot in &slot_payloads[slot_at..end] {
            for (ch, payload) in slot.iter().enumerate() {
                channel_payloads[ch].extend_from_slice(payload);
            }
        }

        if take == 0 {
            // The sample budget ran out before the flush slots; their blocks
            // still belong to the stream, so fold them into the last frame.
            let last = frames
                .last_mut()
                .expect("flush slots cannot precede the first frame");
            for (ch, payload) in channel_payloads.into_iter().enumerate() {
                if let ChannelPayload::Transform { blocks } = &mut last.channels[ch] {
                    blocks.extend_from_slice(&payload);
                }
            }
        } else {
            let mut frame = Frame::new(FrameType::Transform, take as u32);
            frame.channels = channel_payloads
                .into_iter()
                .map(|blocks| ChannelPayload::Transform { blocks })
                .collect();
            frames.push(frame);
        }

        slot_at = end;
    }

    debug_assert_eq!(assigned, samples_per_channel);
    frames
}
