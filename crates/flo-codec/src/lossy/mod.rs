//! Transform-based lossy path: windowed MDCT, psychoacoustic quantization,
//! and sparse run-length coefficient coding.

pub mod blocks;
pub mod decoder;
pub mod encoder;
pub mod mdct;
pub mod psycho;

pub use decoder::TransformDecoder;
pub use encoder::TransformEncoder;
pub use mdct::{Block, BlockKind, Mdct};
pub use psycho::{PsychoModel, BARK_BAND_EDGES, NUM_BARK_BANDS};

/// Quality presets for lossy encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityPreset {
    /// Speech / low-bandwidth material.
    Low,
    /// General music at strong compression.
    Medium,
    /// Quality-conscious listening.
    High,
    /// Near-transparent for most content.
    VeryHigh,
    /// Perceptually lossless for almost all content.
    Transparent,
}

impl QualityPreset {
    /// The continuous quality value of this preset.
    pub fn as_f32(self) -> f32 {
        match self {
            QualityPreset::Low => 0.10,
            QualityPreset::Medium => 0.30,
            QualityPreset::High => 0.55,
            QualityPreset::VeryHigh => 0.75,
            QualityPreset::Transparent => 0.95,
        }
    }

    /// The preset level stored in the header flags (0-4).
    pub fn level(self) -> u8 {
        match self {
            QualityPreset::Low => 0,
            QualityPreset::Medium => 1,
            QualityPreset::High => 2,
            QualityPreset::VeryHigh => 3,
            QualityPreset::Transparent => 4,
        }
    }

    pub fn from_level(level: u8) -> Self {
        match level {
            0 => QualityPreset::Low,
            1 => QualityPreset::Medium,
            2 => QualityPreset::High,
            3 => QualityPreset::VeryHigh,
            _ => QualityPreset::Transparent,
        }
    }

    /// The preset whose quality value is nearest to `quality`.
    pub fn nearest(quality: f32) -> Self {
        let mut best = QualityPreset::Low;
        let mut best_dist = f32::MAX;
        for preset in [
            QualityPreset::Low,
            QualityPreset::Medium,
            QualityPreset::High,
            QualityPreset::VeryHigh,
            QualityPreset::Transparent,
        ] {
            let dist = (preset.as_f32() - quality).abs();
            if dist < best_dist {
                best = preset;
                best_dist = dist;
            }
        }
        best
    }
}

/// Translate a target bitrate into a quality value:
/// `clamp(0.1 + 0.85 · bits_per_second / (rate · channels · 16), 0.05, 0.99)`.
pub fn quality_for_bitrate(bitrate_kbps: u32, sample_rate: u32, channels: u8) -> f32 {
    let raw_bits = sample_rate as f64 * f64::from(channels) * 16.0;
    let quality = 0.1 + 0.85 * (f64::from(bitrate_kbps) * 1000.0) / raw_bits;
    quality.clamp(0.05, 0.99) as f32
}
