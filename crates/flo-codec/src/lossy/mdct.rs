//! FFT-accelerated MDCT/IMDCT with the window family used by the transform
//! coder.
//!
//! The coder operates on a fixed slot grid: 2048-sample slots hopping by
//! 1024. A slot holds either one Long/Start/Stop block (2048-point
//! transform) or a group of eight Short blocks (256-point transforms at slot
//! offsets 448 + 128j). Start and Stop are asymmetric: one half follows the
//! long window, the other half carries a short-window flank between flat-one
//! and zero regions, so the time-domain aliasing of every region cancels
//! against its neighbour regardless of the block sizes meeting there.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

use crate::error::{CodecError, Result};

/// Samples per slot (the long transform size).
pub const SLOT_SIZE: usize = 2048;
/// Output samples contributed per slot.
pub const SLOT_HOP: usize = 1024;
/// Short transform size.
pub const SHORT_SIZE: usize = 256;
/// Hop between the shorts of a group.
pub const SHORT_HOP: usize = 128;
/// Slot offset of the first short in a group.
pub const SHORT_OFFSET: usize = 448;
/// Shorts per slot.
pub const SHORTS_PER_SLOT: usize = 8;
/// Coefficients of a long-family block.
pub const LONG_COEFFS: usize = SLOT_SIZE / 2;
/// Coefficients of a short block.
pub const SHORT_COEFFS: usize = SHORT_SIZE / 2;

/// Wire tag of a transform block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BlockKind {
    Long = 0,
    Short = 1,
    Start = 2,
    Stop = 3,
}

impl BlockKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(BlockKind::Long),
            1 => Some(BlockKind::Short),
            2 => Some(BlockKind::Start),
            3 => Some(BlockKind::Stop),
            _ => None,
        }
    }

    /// Coefficient count of a block of this kind.
    pub fn num_coeffs(self) -> usize {
        match self {
            BlockKind::Short => SHORT_COEFFS,
            _ => LONG_COEFFS,
        }
    }
}

/// Vorbis window: sin(π/2 · sin²(π(n+½)/N)).
pub fn vorbis_window(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| {
            let x = (PI * (i as f32 + 0.5) / n as f32).sin();
            (PI / 2.0 * x * x).sin()
        })
        .collect()
}

/// Start window: rising long half, flat top, falling short half, zero tail.
fn start_window(long: &[f32], short: &[f32]) -> Vec<f32> {
    let mut w = vec![0.0f32; SLOT_SIZE];
    w[..SLOT_HOP].copy_from_slice(&long[..SLOT_HOP]);
    let flat_end = SLOT_HOP + SHORT_OFFSET;
    for slot in w[SLOT_HOP..flat_end].iter_mut() {
        *slot = 1.0;
    }
    for j in 0..SHORT_HOP {
        w[flat_end + j] = short[SHORT_HOP + j];
    }
    // remaining tail stays zero
    w
}

/// Stop window: time reverse of the start window.
fn stop_window(long: &[f32], short: &[f32]) -> Vec<f32> {
    let mut w = vec![0.0f32; SLOT_SIZE];
    for j in 0..SHORT_HOP {
        w[SHORT_OFFSET + j] = short[j];
    }
    for slot in w[SHORT_OFFSET + SHORT_HOP..SLOT_HOP].iter_mut() {
        *slot = 1.0;
    }
    w[SLOT_HOP..].copy_from_slice(&long[SLOT_HOP..]);
    w
}

/// One transform size: FFT plan plus twiddle factors.
struct MdctKernel {
    n: usize,
    fft: Arc<dyn Fft<f32>>,
    twiddle: Vec<Complex<f32>>,
}

impl MdctKernel {
    fn new(n: usize) -> Self {
        let n2 = n / 2;
        let n4 = n / 4;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(n4);
        let twiddle = (0..n4)
            .map(|k| {
                let theta = PI / n2 as f32 * (k as f32 + 0.125);
                Complex::new(theta.cos(), theta.sin())
            })
            .collect();
        Self { n, fft, twiddle }
    }

    /// Forward MDCT of pre-windowed samples: N inputs -> N/2 coefficients.
    fn forward(&self, x: &[f32]) -> Vec<f32> {
        let n = self.n;
        let n2 = n / 2;
        let n4 = n / 4;
        let n8 = n4 / 2;
        let n3 = 3 * n4;

        // Fold N samples into N/4 complex FFT inputs with pre-rotation.
        let mut z = vec![Complex::new(0.0f32, 0.0f32); n4];
        for i in 0..n8 {
            let re = -x[2 * i + n3] - x[n3 - 1 - 2 * i];
            let im = -x[n4 + 2 * i] + x[n4 - 1 - 2 * i];
            let w = self.twiddle[i];
            z[i] = Complex::new(-re * w.re - im * w.im, re * w.im - im * w.re);

            let re2 = x[2 * i] - x[n2 - 1 - 2 * i];
            let im2 = -x[n2 + 2 * i] - x[n - 1 - 2 * i];
            let w2 = self.twiddle[n8 + i];
            z[n8 + i] = Complex::new(-re2 * w2.re - im2 * w2.im, re2 * w2.im - im2 * w2.re);
        }

        self.fft.process(&mut z);

        // Post-rotation, interleaving the conjugate-symmetric halves.
        let mut out = vec![0.0f32; n2];
        for i in 0..n8 {
            let idx1 = n8 - i - 1;
            let idx2 = n8 + i;

            let w1 = self.twiddle[idx1];
            let z1 = z[idx1];
            let im1 = -z1.re * w1.im + z1.im * w1.re;
            let re0 = -z1.re * w1.re - z1.im * w1.im;

            let w2 = self.twiddle[idx2];
            let z2 = z[idx2];
            let im0 = -z2.re * w2.im + z2.im * w2.re;
            let re1 = -z2.re * w2.re - z2.im * w2.im;

            out[2 * idx1] = re0;
            out[2 * idx1 + 1] = im0;
            out[2 * idx2] = re1;
            out[2 * idx2 + 1] = im1;
        }
        out
    }

    /// Inverse MDCT: N/2 coefficients -> N time samples, not yet windowed.
    fn inverse(&self, spec: &[f32]) -> Vec<f32> {
        let n = self.n;
        let n2 = n / 2;
        let n4 = n / 4;
        let n8 = n4 / 2;

        let mut z = Vec::with_capacity(n4);
        for i in 0..n4 {
            let even = spec[2 * i];
            let odd = -spec[n2 - 1 - 2 * i];
            let w = self.twiddle[i];
            z.push(Complex::new(
                odd * w.im - even * w.re,
                odd * w.re + even * w.im,
            ));
        }

        self.fft.process(&mut z);

        let scale = 2.0 / n2 as f32;
        let mut out = vec![0.0f32; n];
        for i in 0..n8 {
            let w = self.twiddle[i];
            let vr = (w.re * z[i].re + w.im * z[i].im) * scale;
            let vi = (w.im * z[i].re - w.re * z[i].im) * scale;
            let fi = 2 * i;
            let ri = n4 - 1 - 2 * i;
            out[ri] = -vi;
            out[n4 + fi] = vi;
            out[n2 + ri] = vr;
            out[n2 + n4 + fi] = vr;
        }
        for i in 0..n8 {
            let idx = n8 + i;
            let w = self.twiddle[idx];
            let vr = (w.re * z[idx].re + w.im * z[idx].im) * scale;
            let vi = (w.im * z[idx].re - w.re * z[idx].im) * scale;
            let fi = 2 * i;
            let ri = n4 - 1 - 2 * i;
            out[fi] = -vr;
            out[n4 + ri] = vr;
            out[n2 + fi] = vi;
            out[n2 + n4 + ri] = vi;
        }
        out
    }
}

/// One transform block: its kind and raw MDCT coefficients.
#[derive(Debug, Clone)]
pub struct Block {
    pub kind: BlockKind,
    pub coeffs: Vec<f32>,
}

/// MDCT processor holding both kernel sizes and the four windows.
pub struct Mdct {
    long: MdctKernel,
    short: MdctKernel,
    win_long: Vec<f32>,
    win_short: Vec<f32>,
    win_start: Vec<f32>,
    win_stop: Vec<f32>,
}

impl Mdct {
    pub fn new() -> Self {
        let win_long = vorbis_window(SLOT_SIZE);
        let win_short = vorbis_window(SHORT_SIZE);
        let win_start = start_window(&win_long, &win_short);
        let win_stop = stop_window(&win_long, &win_short);
        Self {
            long: MdctKernel::new(SLOT_SIZE),
            short: MdctKernel::new(SHORT_SIZE),
            win_long,
            win_short,
            win_start,
            win_stop,
        }
    }

    fn long_window(&self, kind: BlockKind) -> &[f32] {
        match kind {
            BlockKind::Long => &self.win_long,
            BlockKind::Start => &self.win_start,
            BlockKind::Stop => &self.win_stop,
            BlockKind::Short => unreachable!("short blocks use the short window"),
        }
    }

    /// Analyze one slot of input (2048 samples) into its blocks.
    pub fn analyze_slot(&self, slot: &[f32], short: bool, kind: BlockKind) -> Vec<Block> {
        debug_assert_eq!(slot.len(), SLOT_SIZE);
        if short {
            (0..SHORTS_PER_SLOT)
                .map(|j| {
                    let at = SHORT_OFFSET + j * SHORT_HOP;
                    let windowed: Vec<f32> = slot[at..at + SHORT_SIZE]
                        .iter()
                        .zip(&self.win_short)
                        .map(|(&s, &w)| s * w)
                        .collect();
                    Block {
                        kind: BlockKind::Short,
                        coeffs: self.short.forward(&windowed),
                    }
                })
                .collect()
        } else {
            let window = self.long_window(kind);
            let windowed: Vec<f32> = slot.iter().zip(window).map(|(&s, &w)| s * w).collect();
            vec![Block {
                kind,
                coeffs: self.long.forward(&windowed),
            }]
        }
    }

    /// Synthesize the windowed time signal of one slot from its blocks
    /// (either one long-family block or eight shorts).
    pub fn synthesize_slot(&self, blocks: &[Block]) -> Result<Vec<f32>> {
        match blocks {
            [block] if block.kind != BlockKind::Short => {
                if block.coeffs.len() != LONG_COEFFS {
                    return Err(CodecError::TransformOverflow {
                        detail: format!(
                            "{:?} block carries {} coefficients, expected {LONG_COEFFS}",
                            block.kind,
                            block.coeffs.len()
                        ),
                    });
                }
                let window = self.long_window(block.kind);
                let mut time = self.long.inverse(&block.coeffs);
                for (t, &w) in time.iter_mut().zip(window) {
                    *t *= w;
                }
                Ok(time)
            }
            group if group.len() == SHORTS_PER_SLOT
                && group.iter().all(|b| b.kind == BlockKind::Short) =>
            {
                let mut slot = vec![0.0f32; SLOT_SIZE];
                for (j, block) in group.iter().enumerate() {
                    if block.coeffs.len() != SHORT_COEFFS {
                        return Err(CodecError::TransformOverflow {
                            detail: format!(
                                "short block carries {} coefficients, expected {SHORT_COEFFS}",
                                block.coeffs.len()
                            ),
                        });
                    }
                    let time = self.short.inverse(&block.coeffs);
                    let at = SHORT_OFFSET + j * SHORT_HOP;
                    for (i, (&t, &w)) in time.iter().zip(&self.win_short).enumerate() {
                        slot[at + i] += t * w;
                    }
                }
                Ok(slot)
            }
            other => Err(CodecError::TransformOverflow {
                detail: format!("illegal block group of {} block(s) in slot", other.len()),
            }),
        }
    }
}

impl Default for Mdct {
    fn default() -> Self {
        Self::new()
    }
}
