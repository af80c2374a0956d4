//! Offline waveform analysis used to pre-compute visualization data at
//! encode time.

/// Extracted waveform peaks: `peaks_per_second` max-abs values per second,
/// interleaved per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformPeaks {
    pub peaks_per_second: u32,
    pub channels: u8,
    pub peaks: Vec<f32>,
}

/// Reduce interleaved PCM to per-window peak magnitudes.
pub fn extract_waveform_peaks(
    samples: &[f32],
    channels: u8,
    sample_rate: u32,
    peaks_per_second: u32,
) -> WaveformPeaks {
    let channels_usize = channels.max(1) as usize;
    let frames = samples.len() / channels_usize;
    let window = (sample_rate / peaks_per_second.max(1)).max(1) as usize;
    let windows = frames.div_ceil(window.max(1));

    let mut peaks = Vec::with_capacity(windows * channels_usize);
    for w in 0..windows {
        let start = w * window;
        let end = ((w + 1) * window).min(frames);
        for ch in 0..channels_usize {
            let mut peak = 0.0f32;
            for frame in start..end {
                peak = peak.max(samples[frame * channels_usize + ch].abs());
            }
            peaks.push(peak.min(1.0));
        }
    }

    WaveformPeaks {
        peaks_per_second,
        channels,
        peaks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_count_matches_duration() {
        let samples = vec![0.5f32; 44_100];
        let peaks = extract_waveform_peaks(&samples, 1, 44_100, 50);
        assert_eq!(peaks.peaks.len(), 50);
        assert!(peaks.peaks.iter().all(|&p| (p - 0.5).abs() < 1e-6));
    }

    #[test]
    fn stereo_peaks_interleave() {
        let mut samples = Vec::new();
        for _ in 0..1000 {
            samples.push(0.25);
            samples.push(0.75);
        }
        let peaks = extract_waveform_peaks(&samples, 2, 1000, 1);
        assert_eq!(peaks.peaks, vec![0.25, 0.75]);
    }

    #[test]
    fn partial_trailing_window_still_counts() {
        let samples = vec![0.9f32; 1500];
        let peaks = extract_waveform_peaks(&samples, 1, 1000, 1);
        assert_eq!(peaks.peaks.len(), 2);
    }
}
