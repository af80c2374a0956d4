//! # flo-codec
//!
//! The flo audio codecs: a lossless predictive coder (ALPC with
//! Rice/Golomb residuals) and a lossy perceptual transform coder (windowed
//! MDCT with Bark-band masking), both writing the container defined by
//! [`flo_format`].
//!
//! The byte-level entry points mirror the format's public surface:
//!
//! ```
//! use flo_codec::{decode, encode_lossless, info, validate};
//!
//! let pcm: Vec<f32> = (0..44_100)
//!     .map(|i| (i as f32 * 0.05).sin() * 0.4)
//!     .collect();
//! let file = encode_lossless(&pcm, 44_100, 1, 16, 5, None).unwrap();
//! assert!(validate(&file));
//! assert_eq!(info(&file).unwrap().sample_rate, 44_100);
//! let decoded = decode(&file).unwrap();
//! assert_eq!(decoded.pcm.len(), pcm.len());
//! ```

pub mod analysis;
pub mod bits;
pub mod error;
pub mod lossless;
pub mod lossy;
pub mod pcm;
pub mod rice;

pub use analysis::{extract_waveform_peaks, WaveformPeaks};
pub use error::{check_params, CodecError, Result};
pub use lossless::{Decoder, Encoder};
pub use lossy::{quality_for_bitrate, QualityPreset, TransformDecoder, TransformEncoder};

use flo_format::{FloFile, Frame, FrameType, Reader};

/// Decoded audio returned by [`decode`].
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Interleaved float samples in [-1, 1].
    pub pcm: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u8,
    /// Samples per channel.
    pub total_samples: u64,
}

/// File facts returned by [`info`].
#[derive(Debug, Clone, PartialEq)]
pub struct AudioInfo {
    /// Format version, e.g. "1.1".
    pub version: String,
    pub sample_rate: u32,
    pub channels: u8,
    pub bit_depth: u8,
    pub total_frames: u64,
    /// Samples per channel, summed over the parsed frames (authoritative
    /// even when the header's `total_frames` disagrees with the TOC).
    pub total_samples: u64,
    pub duration_secs: f64,
    pub file_size: usize,
    /// Raw PCM size over file size.
    pub compression_ratio: f64,
    pub crc_valid: bool,
    pub is_lossy: bool,
    /// Quality preset level 0-4 when the file is lossy.
    pub lossy_quality: Option<u8>,
}

/// Encode float PCM losslessly. `level` (0-9) bounds the predictor order
/// search.
pub fn encode_lossless(
    pcm: &[f32],
    sample_rate: u32,
    channels: u8,
    bit_depth: u8,
    level: u8,
    metadata: Option<&[u8]>,
) -> Result<Vec<u8>> {
    Encoder::new(sample_rate, channels, bit_depth)
        .with_compression(level)
        .encode(pcm, metadata.unwrap_or_default())
}

/// Encode float PCM with the perceptual transform coder at a continuous
/// quality in [0, 1] (see [`QualityPreset`] for the named points).
pub fn encode_lossy(
    pcm: &[f32],
    sample_rate: u32,
    channels: u8,
    bit_depth: u8,
    quality: f32,
    metadata: Option<&[u8]>,
) -> Result<Vec<u8>> {
    TransformEncoder::new(sample_rate, channels, quality)
        .with_bit_depth(bit_depth)
        .encode(pcm, metadata.unwrap_or_default())
}

/// Encode lossily at a quality derived from a target bitrate.
pub fn encode_with_bitrate(
    pcm: &[f32],
    sample_rate: u32,
    channels: u8,
    bit_depth: u8,
    bitrate_kbps: u32,
    metadata: Option<&[u8]>,
) -> Result<Vec<u8>> {
    let quality = quality_for_bitrate(bitrate_kbps, sample_rate, channels);
    encode_lossy(pcm, sample_rate, channels, bit_depth, quality, metadata)
}

/// Decode a flo file, dispatching each frame to the matching codec.
pub fn decode(data: &[u8]) -> Result<DecodedAudio> {
    let file = Reader::new().read(data)?;
    let pcm = decode_file(&file)?;
    let total_samples = file.total_samples();
    Ok(DecodedAudio {
        pcm,
        sample_rate: file.header.sample_rate,
        channels: file.header.channels,
        total_samples,
    })
}

/// Decode an already-parsed file.
pub fn decode_file(file: &FloFile) -> Result<Vec<f32>> {
    let lossless = Decoder::new();
    let mut transform: Option<TransformDecoder> = None;

    let mut pcm = Vec::new();
    for frame in &file.frames {
        pcm.extend(decode_frame(&lossless, &mut transform, frame, file)?);
    }
    Ok(pcm)
}

fn decode_frame(
    lossless: &Decoder,
    transform: &mut Option<TransformDecoder>,
    frame: &Frame,
    file: &FloFile,
) -> Result<Vec<f32>> {
    match frame.frame_type {
        FrameType::Transform => {
            let decoder = transform.get_or_insert_with(|| {
                TransformDecoder::new(file.header.sample_rate, file.header.channels)
            });
            decoder.decode_frame(frame)
        }
        _ => {
            let planes = lossless.decode_frame(frame, &file.header)?;
            Ok(pcm::interleave_to_float(&planes, file.header.bit_depth))
        }
    }
}

/// Verify the DATA CRC32. Returns `false` for any unreadable or mismatching
/// file; no other operation enforces the CRC.
pub fn validate(data: &[u8]) -> bool {
    Reader::new().verify_crc(data).is_ok()
}

/// Inspect a flo file without decoding its audio.
pub fn info(data: &[u8]) -> Result<AudioInfo> {
    let file = Reader::new().read(data)?;
    let header = &file.header;

    let total_samples = file.total_samples();
    let duration_secs = if header.sample_rate > 0 {
        total_samples as f64 / f64::from(header.sample_rate)
    } else {
        0.0
    };
    let original_size =
        total_samples * u64::from(header.channels) * u64::from(header.bit_depth) / 8;
    let compression_ratio = if data.is_empty() {
        0.0
    } else {
        original_size as f64 / data.len() as f64
    };

    Ok(AudioInfo {
        version: format!("{}.{}", header.version_major, header.version_minor),
        sample_rate: header.sample_rate,
        channels: header.channels,
        bit_depth: header.bit_depth,
        total_frames: header.total_frames,
        total_samples,
        duration_secs,
        file_size: data.len(),
        compression_ratio,
        crc_valid: validate(data),
        is_lossy: header.is_lossy(),
        lossy_quality: header.is_lossy().then(|| header.lossy_quality()),
    })
}
