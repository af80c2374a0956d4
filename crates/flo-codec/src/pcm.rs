//! Sample-domain conversions between float PCM and the integer domain the
//! lossless path operates in.
//!
//! Floats are scaled by 2^(bit_depth-1) and clipped to the signed range; the
//! inverse divides by the same constant, so the float->int->float round trip
//! is the identity on already-quantized input.

/// Scale factor for the given depth: 2^(bit_depth-1).
#[inline]
pub fn depth_scale(bit_depth: u8) -> f64 {
    f64::from(1u32 << (bit_depth - 1))
}

/// Quantize one float sample to the integer domain.
#[inline]
pub fn sample_to_int(sample: f32, bit_depth: u8) -> i32 {
    let scale = depth_scale(bit_depth);
    let max = scale - 1.0;
    (f64::from(sample) * scale).round().clamp(-scale, max) as i32
}

/// Convert one integer sample back to float.
#[inline]
pub fn sample_to_float(sample: i32, bit_depth: u8) -> f32 {
    (f64::from(sample) / depth_scale(bit_depth)) as f32
}

/// Quantize an interleaved float buffer.
pub fn quantize(samples: &[f32], bit_depth: u8) -> Vec<i32> {
    samples.iter().map(|&s| sample_to_int(s, bit_depth)).collect()
}

/// Split an interleaved integer buffer into per-channel planes.
pub fn deinterleave(samples: &[i32], channels: usize) -> Vec<Vec<i32>> {
    let per_channel = samples.len() / channels;
    let mut planes = vec![Vec::with_capacity(per_channel); channels];
    for (i, &s) in samples.iter().enumerate() {
        planes[i % channels].push(s);
    }
    planes
}

/// Interleave per-channel integer planes back into floats.
pub fn interleave_to_float(planes: &[Vec<i32>], bit_depth: u8) -> Vec<f32> {
    let channels = planes.len();
    let len = planes.iter().map(Vec::len).max().unwrap_or(0);
    let mut out = Vec::with_capacity(len * channels);
    for i in 0..len {
        for plane in planes {
            out.push(sample_to_float(plane.get(i).copied().unwrap_or(0), bit_depth));
        }
    }
    out
}

/// Pack integer samples as little-endian PCM at the declared depth.
pub fn pack_pcm(samples: &[i32], bit_depth: u8) -> Vec<u8> {
    let bytes_per = bit_depth as usize / 8;
    let mut out = Vec::with_capacity(samples.len() * bytes_per);
    for &s in samples {
        out.extend_from_slice(&s.to_le_bytes()[..bytes_per]);
    }
    out
}

/// Unpack little-endian PCM at the declared depth into integer samples.
pub fn unpack_pcm(data: &[u8], bit_depth: u8) -> Vec<i32> {
    let bytes_per = bit_depth as usize / 8;
    let shift = 32 - bit_depth as u32;
    data.chunks_exact(bytes_per)
        .map(|chunk| {
            let mut raw = [0u8; 4];
            raw[..bytes_per].copy_from_slice(chunk);
            (i32::from_le_bytes(raw) << shift) >> shift
        })
        .collect()
}

/// Stereo decorrelation: mid = L+R, side = L-R. Exactly invertible because
/// mid+side = 2L is always even.
pub fn to_mid_side(left: &[i32], right: &[i32]) -> (Vec<i32>, Vec<i32>) {
    let mid = left.iter().zip(right).map(|(&l, &r)| l + r).collect();
    let side = left.iter().zip(right).map(|(&l, &r)| l - r).collect();
    (mid, side)
}

/// Inverse of [`to_mid_side`].
pub fn from_mid_side(mid: &[i32], side: &[i32]) -> (Vec<i32>, Vec<i32>) {
    let left = mid.iter().zip(side).map(|(&m, &s)| (m + s) / 2).collect();
    let right = mid.iter().zip(side).map(|(&m, &s)| (m - s) / 2).collect();
    (left, right)
}
