//! Psychoacoustic model: Bark-band analysis, absolute threshold of hearing,
//! inter-band masking spread, and the per-band scale factors that drive
//! quantization.

/// Number of critical bands.
pub const NUM_BARK_BANDS: usize = 25;

/// Critical band edges in Hz.
pub const BARK_BAND_EDGES: [f32; 26] = [
    0.0, 100.0, 200.0, 300.0, 400.0, 510.0, 630.0, 770.0, 920.0, 1080.0, 1270.0, 1480.0, 1720.0,
    2000.0, 2320.0, 2700.0, 3150.0, 3700.0, 4400.0, 5300.0, 6400.0, 7700.0, 9500.0, 12000.0,
    15500.0, 20500.0,
];

/// Largest quantized coefficient the i16 wire format may carry, with
/// headroom below i16::MAX.
const QUANT_CEILING: f32 = 30_000.0;

/// Band index for a frequency in Hz.
pub fn freq_to_band(freq: f32) -> usize {
    for (i, &edge) in BARK_BAND_EDGES.iter().enumerate().skip(1) {
        if freq < edge {
            return i - 1;
        }
    }
    NUM_BARK_BANDS - 1
}

/// Absolute threshold of hearing in dB SPL (Terhardt's approximation).
pub fn absolute_threshold_db(freq: f32) -> f32 {
    if !(20.0..=20_000.0).contains(&freq) {
        return 96.0;
    }
    let f = freq / 1000.0;
    let quiet = 3.64 * f.powf(-0.8) - 6.5 * (-0.6 * (f - 3.3).powi(2)).exp() + 0.001 * f.powi(4);
    quiet.clamp(-10.0, 96.0)
}

/// The global quantizer divisor: strictly increasing in quality so that
/// higher quality always means finer steps (and larger files).
pub fn quantizer_for_quality(quality: f32) -> f32 {
    2.0f32.powf(8.0 * quality.clamp(0.0, 1.0) - 3.0)
}

/// Psychoacoustic model for one sample rate.
pub struct PsychoModel {
    sample_rate: u32,
    /// Inter-band masking gains: `spread[source][target]`.
    spread: [[f32; NUM_BARK_BANDS]; NUM_BARK_BANDS],
}

impl PsychoModel {
    pub fn new(sample_rate: u32) -> Self {
        let mut spread = [[0.0f32; NUM_BARK_BANDS]; NUM_BARK_BANDS];
        for (source, row) in spread.iter_mut().enumerate() {
            for (target, cell) in row.iter_mut().enumerate() {
                let delta = target as f32 - source as f32;
                // Masking reaches further up the spectrum than down.
                let attenuation_db = if delta >= 0.0 { 15.0 * delta } else { -30.0 * delta };
                *cell = 10.0f32.powf(-attenuation_db / 10.0);
            }
        }
        Self {
            sample_rate,
            spread,
        }
    }

    /// Per-band scale factors for one block of MDCT coefficients.
    ///
    /// For each band: mean coefficient energy, masking threshold
    /// `T_b = max(ATH_b, spread(E)_b · tonality)`, then
    /// `s_b = sqrt(T_b) / Q`. Bands with no signal get a scale of zero.
    /// The scale is floored so the loudest coefficient of the band always
    /// fits the i16 range after quantization.
    pub fn scale_factors(&self, coeffs: &[f32], quality: f32) -> [f32; NUM_BARK_BANDS] {
        let n2 = coeffs.len();
        let bin_hz = self.sample_rate as f32 / (2.0 * n2 as f32);
        // MDCT gain grows with the transform size; refer ATH to the same
        // domain as the coefficient energies.
        let coeff_gain = (n2 as f32 / 2.0).powi(2);

        let mut energy = [0.0f64; NUM_BARK_BANDS];
        let mut peak = [0.0f32; NUM_BARK_BANDS];
        let mut count = [0u32; NUM_BARK_BANDS];
        for (k, &c) in coeffs.iter().enumerate() {
            let band = freq_to_band((k as f32 + 0.5) * bin_hz);
            energy[band] += f64::from(c) * f64::from(c);
            peak[band] = peak[band].max(c.abs());
            count[band] += 1;
        }

        let mean_energy: Vec<f32> = energy
            .iter()
            .zip(&count)
            .map(|(&e, &c)| if c > 0 { (e / f64::from(c)) as f32 } else { 0.0 })
            .collect();

        let occupied: Vec<f32> = mean_energy
            .iter()
            .zip(&count)
            .filter(|(_, &c)| c > 0)
            .map(|(&e, _)| e)
            .collect();
        let tonality = self.tonality_factor(&occupied);
        let quantizer = quantizer_for_quality(quality);

        let mut scales = [0.0f32; NUM_BARK_BANDS];
        for target in 0..NUM_BARK_BANDS {
            if count[target] == 0 || peak[target] == 0.0 {
                continue;
            }
            let spread_energy: f32 = (0..NUM_BARK_BANDS)
                .map(|source| mean_energy[source] * self.spread[source][target])
                .sum();

            let center = (BARK_BAND_EDGES[target] + BARK_BAND_EDGES[target + 1]) / 2.0;
            let ath = 10.0f32.powf((absolute_threshold_db(center) - 96.0) / 10.0) * coeff_gain;

            let threshold = ath.max(spread_energy * tonality);
            let scale = (threshold.sqrt() / quantizer).max(peak[target] / QUANT_CEILING);
            scales[target] = scale;
        }
        scales
    }

    /// Spectral-flatness-based tonality: near 0 for tonal content (deep
    /// masking thresholds), larger for noise (noise masks itself well).
    /// Flatness is the geometric/arithmetic mean ratio over the occupied
    /// bands, with empty bands floored relative to the loudest so that
    /// concentrated energy reads as tonal.
    fn tonality_factor(&self, band_energy: &[f32]) -> f32 {
        let peak = band_energy.iter().copied().fold(0.0f32, f32::max);
        if peak <= 0.0 {
            return 0.005;
        }
        let floor = f64::from(peak) * 1e-10;
        let floored: Vec<f64> = band_energy
            .iter()
            .map(|&e| f64::from(e).max(floor))
            .collect();
        let log_mean = floored.iter().map(|&e| e.ln()).sum::<f64>() / floored.len() as f64;
        let mean = floored.iter().sum::<f64>() / floored.len() as f64;
        let flatness = (log_mean.exp() / mean).clamp(0.0, 1.0) as f32;
        // Noise-like spectra tolerate steps far above the simultaneous
        // masking level; the quadratic term only bites when the spectrum is
        // close to flat.
        0.005 + 0.295 * flatness + 120.0 * flatness.powi(2)
    }
}

/// Encode a scale factor for the wire: log2 with 1/256 steps, biased to
/// u16; zero means the band carries nothing.
pub fn scale_to_u16(scale: f32) -> u16 {
    if scale <= 1e-10 {
        return 0;
    }
    ((scale.log2() * 256.0) + 32_768.0).clamp(0.0, 65_535.0) as u16
}

/// Inverse of [`scale_to_u16`].
pub fn scale_from_u16(encoded: u16) -> f32 {
    if encoded == 0 {
        return 0.0;
    }
    2.0f32.powf((f32::from(encoded) - 32_768.0) / 256.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_lookup_covers_spectrum() {
        assert_eq!(freq_to_band(0.0), 0);
        assert_eq!(freq_to_band(99.0), 0);
        assert_eq!(freq_to_band(150.0), 1);
        assert_eq!(freq_to_band(1_000.0), 8);
        assert_eq!(freq_to_band(25_000.0), NUM_BARK_BANDS - 1);
    }

    #[test]
    fn ath_dips_in_midrange() {
        // The ear is most sensitive around 3-4 kHz.
        let at_3k = absolute_threshold_db(3_300.0);
        assert!(at_3k < absolute_threshold_db(100.0));
        assert!(at_3k < absolute_threshold_db(15_000.0));
        assert_eq!(absolute_threshold_db(10.0), 96.0);
    }

    #[test]
    fn quantizer_strictly_increases_with_quality() {
        let qualities = [0.05f32, 0.10, 0.30, 0.55, 0.75, 0.95];
        for pair in qualities.windows(2) {
            assert!(quantizer_for_quality(pair[1]) > quantizer_for_quality(pair[0]));
        }
    }

    #[test]
    fn scale_factor_wire_round_trip() {
        for scale in [1e-4f32, 0.01, 1.0, 17.5, 4096.0] {
            let decoded = scale_from_u16(scale_to_u16(scale));
            let ratio = decoded / scale;
            assert!((0.995..=1.005).contains(&ratio), "scale {scale} -> {decoded}");
        }
        assert_eq!(scale_to_u16(0.0), 0);
        assert_eq!(scale_from_u16(0), 0.0);
    }

    #[test]
    fn quantized_peak_fits_i16() {
        let model = PsychoModel::new(44_100);
        // A loud single partial: energy concentrated in one band.
        let mut coeffs = vec![0.0f32; 1024];
        coeffs[40] = 420.0;
        let scales = model.scale_factors(&coeffs, 0.99);
        let band = freq_to_band((40.5) * 44_100.0 / 2048.0);
        let q = (coeffs[40] / scales[band]).round();
        assert!(q.abs() <= f32::from(i16::MAX), "quantized peak {q}");
    }

    #[test]
    fn silent_bands_have_zero_scale() {
        let model = PsychoModel::new(44_100);
        let coeffs = vec![0.0f32; 1024];
        let scales = model.scale_factors(&coeffs, 0.5);
        assert!(scales.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn higher_quality_means_finer_steps() {
        let model = PsychoModel::new(44_100);
        let coeffs: Vec<f32> = (0..1024)
            .map(|k| (k as f32 * 0.37).sin() * 30.0)
            .collect();
        let coarse = model.scale_factors(&coeffs, 0.2);
        let fine = model.scale_factors(&coeffs, 0.9);
        for (c, f) in coarse.iter().zip(&fine) {
            if *c > 0.0 {
                assert!(f < c);
            }
        }
    }
}
