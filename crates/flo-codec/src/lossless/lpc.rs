//! Linear-prediction analysis for the lossless path.
//!
//! Autocorrelation is accumulated in f64 over the integer samples,
//! Levinson-Durbin runs in f64, and the resulting coefficients are quantized
//! to i32 with a shared power-of-two shift for the integer prediction
//! recursion used on both sides of the codec.

/// Autocorrelation of `samples` at lags `0..=max_lag`.
pub fn autocorrelation(samples: &[i32], max_lag: usize) -> Vec<f64> {
    let mut autocorr = vec![0.0f64; max_lag + 1];
    for (lag, slot) in autocorr.iter_mut().enumerate() {
        let mut sum = 0.0f64;
        for i in lag..samples.len() {
            sum += f64::from(samples[i]) * f64::from(samples[i - lag]);
        }
        *slot = sum;
    }
    autocorr
}

/// Levinson-Durbin recursion up to `order`.
///
/// If a reflection coefficient goes non-finite or reaches magnitude 1, the
/// recursion stops and the coefficients of the last stable step are
/// returned, so the result may have fewer than `order` entries. Returns
/// `None` when not even order 1 is stable (e.g. zero-energy input).
pub fn levinson_durbin(autocorr: &[f64], order: usize) -> Option<Vec<f64>> {
    if autocorr.is_empty() || autocorr[0] <= 0.0 || !autocorr[0].is_finite() {
        return None;
    }

    let mut coeffs = vec![0.0f64; order];
    let mut achieved = 0usize;
    let mut error = autocorr[0];

    for i in 0..order {
        let mut acc = autocorr.get(i + 1).copied().unwrap_or(0.0);
        for j in 0..i {
            acc -= coeffs[j] * autocorr.get(i - j).copied().unwrap_or(0.0);
        }

        if error.abs() < f64::EPSILON {
            break;
        }
        let reflection = acc / error;
        if !reflection.is_finite() || reflection.abs() >= 1.0 {
            break;
        }

        let prev = coeffs[..i].to_vec();
        coeffs[i] = reflection;
        for j in 0..i {
            coeffs[j] = prev[j] - reflection * prev[i - 1 - j];
        }

        error *= 1.0 - reflection * reflection;
        achieved = i + 1;
    }

    if achieved == 0 {
        return None;
    }
    coeffs.truncate(achieved);
    Some(coeffs)
}

/// Quantize coefficients to i32 with a shared shift of at most 15 fractional
/// bits, chosen so the largest magnitude keeps full headroom.
pub fn quantize_coefficients(coeffs: &[f64]) -> (Vec<i32>, u8) {
    let max_mag = coeffs.iter().fold(0.0f64, |m, &c| m.max(c.abs()));
    if max_mag == 0.0 || !max_mag.is_finite() {
        return (vec![0; coeffs.len()], 0);
    }

    let headroom = (f64::from(1u32 << 30) / max_mag).log2().floor();
    let shift = headroom.clamp(0.0, 15.0) as u8;
    let scale = f64::from(1u32 << shift);
    let quantized = coeffs.iter().map(|&c| (c * scale).round() as i32).collect();
    (quantized, shift)
}

/// Prediction residuals with the integer recursion. The first
/// `coeffs.len()` entries carry the warm-up samples verbatim.
pub fn residuals(samples: &[i32], coeffs: &[i32], shift: u8) -> Vec<i32> {
    let order = coeffs.len();
    let mut out = Vec::with_capacity(samples.len());
    out.extend_from_slice(&samples[..order.min(samples.len())]);

    for i in order..samples.len() {
        let mut prediction = 0i64;
        for (j, &c) in coeffs.iter().enumerate() {
            prediction += i64::from(c) * i64::from(samples[i - j - 1]);
        }
        prediction >>= shift;
        out.push(samples[i].wrapping_sub(prediction as i32));
    }
    out
}

/// Inverse of [`residuals`]: rebuild `target_len` samples.
pub fn reconstruct(residuals: &[i32], coeffs: &[i32], shift: u8, target_len: usize) -> Vec<i32> {
    let order = coeffs.len();
    let take = target_len.min(residuals.len());
    let mut samples = Vec::with_capacity(target_len);
    samples.extend_from_slice(&residuals[..order.min(take)]);

    for i in order..take {
        let mut prediction = 0i64;
        for (j, &c) in coeffs.iter().enumerate() {
            prediction += i64::from(c) * i64::from(samples[i - j - 1]);
        }
        prediction >>= shift;
        samples.push((prediction as i32).wrapping_add(residuals[i]));
    }

    samples.resize(target_len, 0);
    samples
}
