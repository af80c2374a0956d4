//! End-to-end tests of the byte-level codec API: encode, decode, info,
//! validate, and the behaviors promised for silence, tonal and noise
//! content.

use flo_codec::{
    decode, encode_lossless, encode_lossy, encode_with_bitrate, info, validate, QualityPreset,
};
use flo_format::{FrameType, Reader};

fn sine(seconds: f64, freq: f64, amp: f64, rate: u32) -> Vec<f32> {
    let n = (seconds * f64::from(rate)) as usize;
    (0..n)
        .map(|i| {
            let t = i as f64 / f64::from(rate);
            ((2.0 * std::f64::consts::PI * freq * t).sin() * amp) as f32
        })
        .collect()
}

fn white_noise(n: usize, amp: f32) -> Vec<f32> {
    let mut state = 0x1357_9BDFu32;
    (0..n)
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state as f32 / u32::MAX as f32 - 0.5) * 2.0 * amp
        })
        .collect()
}

fn requantize(samples: &[f32], bit_depth: u8) -> Vec<f32> {
    let scale = f64::from(1u32 << (bit_depth - 1));
    samples
        .iter()
        .map(|&s| {
            let q = (f64::from(s) * scale).round().clamp(-scale, scale - 1.0);
            (q / scale) as f32
        })
        .collect()
}

fn psnr(reference: &[f32], decoded: &[f32]) -> f64 {
    let mse: f64 = reference
        .iter()
        .zip(decoded)
        .map(|(&a, &b)| (f64::from(a) - f64::from(b)).powi(2))
        .sum::<f64>()
        / reference.len() as f64;
    if mse == 0.0 {
        f64::INFINITY
    } else {
        10.0 * (1.0 / mse).log10()
    }
}

// One second of digital silence: a single silence frame in a tiny file.
#[test]
fn silence_second_collapses_to_one_tiny_frame() {
    let pcm = vec![0.0f32; 44_100];
    let file = encode_lossless(&pcm, 44_100, 1, 16, 5, None).unwrap();

    assert!(file.len() <= 200, "file is {} bytes", file.len());
    assert!(validate(&file));

    let parsed = Reader::new().read(&file).unwrap();
    assert_eq!(parsed.frames.len(), 1);
    assert_eq!(parsed.frames[0].frame_type, FrameType::Silence);

    let decoded = decode(&file).unwrap();
    assert_eq!(decoded.pcm, vec![0.0f32; 44_100]);
    assert_eq!(decoded.total_samples, 44_100);
}

// Two seconds of a 440 Hz sine: two low-order ALPC frames, exact decode.
#[test]
fn sine_two_seconds_exact_alpc() {
    let pcm = sine(2.0, 440.0, 0.8, 44_100);
    let file = encode_lossless(&pcm, 44_100, 1, 16, 5, None).unwrap();

    let parsed = Reader::new().read(&file).unwrap();
    assert_eq!(parsed.frames.len(), 2);
    for frame in &parsed.frames {
        match frame.frame_type {
            FrameType::Alpc(order) => assert!((1..=6).contains(&order), "order {order}"),
            other => panic!("expected ALPC frames, got {other:?}"),
        }
    }

    let decoded = decode(&file).unwrap();
    assert_eq!(decoded.pcm, requantize(&pcm, 16));
}

// Stereo with independent tones: exact lossless reconstruction per channel.
#[test]
fn stereo_tones_lossless_exact() {
    let rate = 48_000u32;
    let left = sine(1.0, 440.0, 0.8, rate);
    let right = sine(1.0, 554.37, 0.8, rate);
    let pcm: Vec<f32> = left.iter().zip(&right).flat_map(|(&l, &r)| [l, r]).collect();

    let file = encode_lossless(&pcm, rate, 2, 16, 5, None).unwrap();
    let decoded = decode(&file).unwrap();
    assert_eq!(decoded.channels, 2);
    assert_eq!(decoded.pcm, requantize(&pcm, 16));
}

// Stereo tones through the lossy path at High quality.
#[test]
fn stereo_tones_lossy_high_quality() {
    let rate = 48_000u32;
    let left = sine(1.0, 440.0, 0.8, rate);
    let right = sine(1.0, 554.37, 0.8, rate);
    let pcm: Vec<f32> = left.iter().zip(&right).flat_map(|(&l, &r)| [l, r]).collect();

    let file = encode_lossy(&pcm, rate, 2, 16, QualityPreset::High.as_f32(), None).unwrap();
    let decoded = decode(&file).unwrap();
    assert_eq!(decoded.pcm.len(), pcm.len());

    let out_left: Vec<f32> = decoded.pcm.iter().step_by(2).copied().collect();
    let out_right: Vec<f32> = decoded.pcm.iter().skip(1).step_by(2).copied().collect();
    assert!(psnr(&left, &out_left) >= 40.0);
    assert!(psnr(&right, &out_right) >= 40.0);
}

// Three seconds of white noise at High quality: the coder must stay well
// under the raw PCM size. Flat spectra take the brunt of the quantizer, so
// the fidelity bar is low.
#[test]
fn noise_lossy_high_compresses() {
    let pcm = white_noise(3 * 44_100, 0.5);
    let file = encode_lossy(&pcm, 44_100, 1, 16, QualityPreset::High.as_f32(), None).unwrap();

    let raw_size = pcm.len() * 2;
    let ratio = raw_size as f64 / file.len() as f64;
    assert!(ratio >= 4.0, "compression ratio {ratio:.2}");

    let decoded = decode(&file).unwrap();
    assert_eq!(decoded.pcm.len(), pcm.len());
    let p = psnr(&pcm, &decoded.pcm);
    assert!(p >= 8.0, "PSNR {p:.1} dB");
}

// Transparent quality on a loud sine: better than 60 dB PSNR.
#[test]
fn transparent_sine_psnr() {
    let pcm = sine(1.0, 997.0, 0.5, 44_100);
    let file = encode_lossy(
        &pcm,
        44_100,
        1,
        16,
        QualityPreset::Transparent.as_f32(),
        None,
    )
    .unwrap();
    let decoded = decode(&file).unwrap();
    let p = psnr(&pcm, &decoded.pcm);
    assert!(p >= 60.0, "PSNR {p:.1} dB");
}

// File sizes are strictly ordered across the quality presets.
#[test]
fn preset_sizes_ascend() {
    // Off-grid tones: the leakage skirts put coefficients at every level,
    // so each preset's finer steps keep strictly more of them.
    let pcm: Vec<f32> = sine(2.0, 440.0, 0.5, 44_100)
        .iter()
        .zip(sine(2.0, 2_931.0, 0.2, 44_100))
        .map(|(&a, b)| a + b)
        .collect();

    let mut sizes = Vec::new();
    for preset in [
        QualityPreset::Low,
        QualityPreset::Medium,
        QualityPreset::High,
        QualityPreset::VeryHigh,
        QualityPreset::Transparent,
    ] {
        let file = encode_lossy(&pcm, 44_100, 1, 16, preset.as_f32(), None).unwrap();
        sizes.push(file.len());
    }
    for pair in sizes.windows(2) {
        assert!(pair[0] < pair[1], "sizes not ascending: {sizes:?}");
    }
}

#[test]
fn bitrate_encoding_lands_between_presets() {
    let pcm = sine(1.0, 440.0, 0.6, 44_100);
    let low = encode_with_bitrate(&pcm, 44_100, 1, 16, 32, None).unwrap();
    let high = encode_with_bitrate(&pcm, 44_100, 1, 16, 512, None).unwrap();
    assert!(low.len() < high.len());

    let low_info = info(&low).unwrap();
    assert!(low_info.is_lossy);
}

#[test]
fn info_reports_lossless_facts() {
    let pcm = sine(2.0, 440.0, 0.8, 44_100);
    let file = encode_lossless(&pcm, 44_100, 1, 16, 7, None).unwrap();
    let i = info(&file).unwrap();

    assert_eq!(i.version, "1.1");
    assert_eq!(i.sample_rate, 44_100);
    assert_eq!(i.channels, 1);
    assert_eq!(i.bit_depth, 16);
    assert_eq!(i.total_frames, 2);
    assert_eq!(i.total_samples, 88_200);
    assert!((i.duration_secs - 2.0).abs() < 1e-9);
    assert!(i.crc_valid);
    assert!(!i.is_lossy);
    assert_eq!(i.lossy_quality, None);
    assert!(i.compression_ratio > 1.0);
}

#[test]
fn info_reports_lossy_quality_level() {
    let pcm = sine(1.0, 440.0, 0.5, 44_100);
    let file = encode_lossy(&pcm, 44_100, 1, 16, QualityPreset::VeryHigh.as_f32(), None).unwrap();
    let i = info(&file).unwrap();
    assert!(i.is_lossy);
    assert_eq!(i.lossy_quality, Some(QualityPreset::VeryHigh.level()));
}

#[test]
fn corrupting_data_fails_validate_only() {
    let pcm = sine(1.0, 440.0, 0.8, 44_100);
    let file = encode_lossless(&pcm, 44_100, 1, 16, 5, None).unwrap();
    assert!(validate(&file));

    let header = Reader::new().read_header(&file).unwrap();
    let mut corrupted = file.clone();
    // Flip an unused bit in the first frame's flags byte: the structure and
    // the audio decode are untouched, only the CRC notices.
    let at = header.data_offset() as usize + 5;
    corrupted[at] ^= 0x40;

    assert!(!validate(&corrupted));
    // Best-effort decode still succeeds; the CRC is advisory here.
    assert!(decode(&corrupted).is_ok());
}

#[test]
fn unsupported_parameters_rejected() {
    let pcm = vec![0.1f32; 1000];
    assert!(encode_lossless(&pcm, 4_000, 1, 16, 5, None).is_err());
    assert!(encode_lossless(&pcm, 44_100, 3, 16, 5, None).is_err());
    assert!(encode_lossless(&pcm, 44_100, 1, 12, 5, None).is_err());
    assert!(encode_lossy(&pcm, 200_000, 1, 16, 0.5, None).is_err());
}

#[test]
fn high_rate_and_depth_round_trip() {
    let pcm = sine(0.25, 10_000.0, 0.7, 192_000);
    let file = encode_lossless(&pcm, 192_000, 1, 24, 9, None).unwrap();
    let decoded = decode(&file).unwrap();
    assert_eq!(decoded.pcm, requantize(&pcm, 24));
}

#[test]
fn metadata_bytes_pass_through_encoding() {
    let pcm = sine(0.5, 440.0, 0.5, 44_100);
    let meta = b"\x82\xa5title\xa4demo\xa3bpm\x78";
    let file = encode_lossless(&pcm, 44_100, 1, 16, 5, Some(meta)).unwrap();
    let parsed = Reader::new().read(&file).unwrap();
    assert_eq!(parsed.metadata, meta);
}
