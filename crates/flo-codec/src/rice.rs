//! Rice/Golomb entropy coding of prediction residuals.
//!
//! Signed residuals are zig-zag folded to non-negative integers, then coded
//! as a unary quotient (q one-bits, one zero bit) followed by the remainder:
//! the low k bits LSB-first for Rice, truncated binary MSB-first for Golomb
//! (MSB-first is required there so the one-bit extension stays prefix-free).
//! Raw mode packs the residuals as sign-extended fixed-width integers,
//! MSB-first.

use crate::bits::{BitReader, BitWriter};
use crate::error::{CodecError, Result};

/// Zig-zag fold: 0, -1, 1, -2, 2, ... -> 0, 1, 2, 3, 4, ...
#[inline]
pub fn zigzag(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

/// Inverse zig-zag fold.
#[inline]
pub fn unzigzag(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

/// Exact bit cost of Rice-coding `residuals` with parameter `k`.
pub fn rice_bit_cost(residuals: &[i32], k: u8) -> u64 {
    residuals
        .iter()
        .map(|&r| u64::from(zigzag(r) >> k) + 1 + u64::from(k))
        .sum()
}

/// Pick the Rice parameter: start from floor(log2(mean |zigzag|)) and refine
/// one step either side by exact bit count.
pub fn select_rice_parameter(residuals: &[i32]) -> u8 {
    if residuals.is_empty() {
        return 0;
    }
    let sum: u64 = residuals.iter().map(|&r| u64::from(zigzag(r))).sum();
    let mean = sum / residuals.len() as u64;
    let base = if mean < 1 { 0 } else { 63 - mean.leading_zeros() as u8 };

    let candidates = [base.saturating_sub(1), base, (base + 1).min(30)];
    let mut best = candidates[0];
    let mut best_cost = rice_bit_cost(residuals, best);
    for &k in &candidates[1..] {
        let cost = rice_bit_cost(residuals, k);
        if cost < best_cost {
            best = k;
            best_cost = cost;
        }
    }
    best
}

/// Rice-encode residuals with parameter `k`, zero-padded to a whole byte.
pub fn encode_rice(residuals: &[i32], k: u8) -> Vec<u8> {
    let mut bits = BitWriter::new();
    for &r in residuals {
        let z = zigzag(r);
        let quotient = z >> k;
        for _ in 0..quotient {
            bits.write_bit(1);
        }
        bits.write_bit(0);
        bits.write_bits_lsb(z, k);
    }
    bits.into_bytes()
}

/// Decode `count` Rice-coded residuals.
pub fn decode_rice(data: &[u8], k: u8, count: usize) -> Result<Vec<i32>> {
    if k > 32 {
        return Err(CodecError::TruncatedBitstream {
            detail: format!("Rice parameter {k} out of range"),
        });
    }
    let mut bits = BitReader::new(data);
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let mut quotient = 0u32;
        while bits.read_bit()? == 1 {
            quotient += 1;
            if quotient > 1 << 24 {
                return Err(CodecError::TruncatedBitstream {
                    detail: "unary quotient unreasonably long".into(),
                });
            }
        }
        let remainder = bits.read_bits_lsb(k)?;
        out.push(unzigzag((quotient << k) | remainder));
    }
    Ok(out)
}

/// Exact bit cost of Golomb-coding with modulus `m`.
pub fn golomb_bit_cost(residuals: &[i32], m: u32) -> u64 {
    let b = 32 - (m - 1).max(1).leading_zeros() as u64;
    let cutoff = (1u64 << b) as u32 - m;
    residuals
        .iter()
        .map(|&r| {
            let z = zigzag(r);
            let quotient = u64::from(z / m);
            let remainder = z % m;
            let rem_bits = if remainder < cutoff { b - 1 } else { b };
            quotient + 1 + rem_bits
        })
        .sum()
}

/// Best-fit Golomb modulus from the residual mean, clamped to the u8
/// parameter byte. Returns `None` when the mean is too large to store.
pub fn select_golomb_modulus(residuals: &[i32]) -> Option<u32> {
    if residuals.is_empty() {
        return None;
    }
    let sum: u64 = residuals.iter().map(|&r| u64::from(zigzag(r))).sum();
    let mean = (sum / residuals.len() as u64).max(1);
    if mean > 255 {
        return None;
    }
    Some(mean as u32)
}

/// Golomb-encode residuals with modulus `m` (1..=255).
pub fn encode_golomb(residuals: &[i32], m: u32) -> Vec<u8> {
    debug_assert!((1..=255).contains(&m));
    let b = (32 - (m - 1).max(1).leading_zeros()) as u8;
    let cutoff = (1u32 << b) - m;

    let mut bits = BitWriter::new();
    for &r in residuals {
        let z = zigzag(r);
        let quotient = z / m;
        let remainder = z % m;
        for _ in 0..quotient {
            bits.write_bit(1);
        }
        bits.write_bit(0);
        if remainder < cutoff {
            bits.write_bits_msb(remainder, b - 1);
        } else {
            bits.write_bits_msb(remainder + cutoff, b);
        }
    }
    bits.into_bytes()
}

/// Decode `count` Golomb-coded residuals with modulus `m`.
pub fn decode_golomb(data: &[u8], m: u32, count: usize) -> Result<Vec<i32>> {
    if m == 0 {
        return Err(CodecError::TruncatedBitstream {
            detail: "Golomb modulus of zero".into(),
        });
    }
    let b = (32 - (m - 1).max(1).leading_zeros()) as u8;
    let cutoff = (1u32 << b) - m;

    let mut bits = BitReader::new(data);
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let mut quotient = 0u32;
        while bits.read_bit()? == 1 {
            quotient += 1;
            if quotient > 1 << 24 {
                return Err(CodecError::TruncatedBitstream {
                    detail: "unary quotient unreasonably long".into(),
                });
            }
        }
        let head = bits.read_bits_msb(b - 1)?;
        let remainder = if head < cutoff {
            head
        } else {
            (head << 1 | bits.read_bit()?) - cutoff
        };
        out.push(unzigzag(quotient * m + remainder));
    }
    Ok(out)
}

/// Pack residuals as `width`-bit sign-extended integers, MSB-first.
/// Callers must ensure every value fits in `width` bits.
pub fn encode_raw(residuals: &[i32], width: u8) -> Vec<u8> {
    let mask = if width == 32 {
        u32::MAX
    } else {
        (1u32 << width) - 1
    };
    let mut bits = BitWriter::new();
    for &r in residuals {
        bits.write_bits_msb(r as u32 & mask, width);
    }
    bits.into_bytes()
}

/// Decode `count` raw `width`-bit sign-extended integers.
pub fn decode_raw(data: &[u8], width: u8, count: usize) -> Result<Vec<i32>> {
    let mut bits = BitReader::new(data);
    let mut out = Vec::with_capacity(count);
    let shift = 32 - width as u32;
    for _ in 0..count {
        let raw = bits.read_bits_msb(width)?;
        out.push(((raw << shift) as i32) >> shift);
    }
    Ok(out)
}

/// Whether every residual fits a `width`-bit signed integer.
pub fn fits_width(residuals: &[i32], width: u8) -> bool {
    if width >= 32 {
        return true;
    }
    let max = (1i32 << (width - 1)) - 1;
    let min = -(1i32 << (width - 1));
    residuals.iter().all(|&r| (min..=max).contains(&r))
}
