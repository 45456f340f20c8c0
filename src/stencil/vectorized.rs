//! Eight-wide 3×3 convolution.
//!
//! Each interior row is processed `LANES` columns at a time. For the rows
//! above, at and below the output row three overlapping windows (offset −1, 0,
//! +1) are loaded and accumulated against the nine broadcast weights with
//! fused multiply-add, always nested the same way:
//!
//! ```text
//! acc = r0l*k00 + (r0m*k01 + (r0r*k02 + ... + (r2m*k21 + r2r*k22)))
//! ```
//!
//! so the AVX2, NEON and portable paths produce identical bits. Columns that
//! do not fill a whole vector fall back to the scalar formula.

use std::sync::OnceLock;

use tracing::debug;

use super::{LANES, cell, check_shapes};
use crate::{Tensor, error::TensorError};

/// Vector instruction sets usable by the convolution on this CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimdCapabilities {
    pub avx2_fma: bool,
    pub neon: bool,
}

impl SimdCapabilities {
    fn detect() -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            Self {
                avx2_fma: is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma"),
                neon: false,
            }
        }

        #[cfg(target_arch = "aarch64")]
        {
            Self {
                avx2_fma: false,
                neon: std::arch::is_aarch64_feature_detected!("neon"),
            }
        }

        #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
        {
            Self {
                avx2_fma: false,
                neon: false,
            }
        }
    }
}

static CAPABILITIES: OnceLock<SimdCapabilities> = OnceLock::new();

/// CPU capabilities, detected once per process.
pub fn simd_capabilities() -> SimdCapabilities {
    *CAPABILITIES.get_or_init(|| {
        let caps = SimdCapabilities::detect();
        debug!(?caps, "detected SIMD capabilities");
        caps
    })
}

/// Computes the vector part of one output row and returns the first column
/// it did not write.
///
/// All four slices have the same length `width >= 3`.
type RowKernel = unsafe fn(&[f32], &[f32], &[f32], &[f32; 9], &mut [f32]) -> usize;

fn select_row_kernel() -> RowKernel {
    #[cfg(all(feature = "avx2", target_arch = "x86_64"))]
    if simd_capabilities().avx2_fma {
        return avx2::row;
    }

    #[cfg(all(feature = "neon", target_arch = "aarch64"))]
    if simd_capabilities().neon {
        return neon::row;
    }

    portable::row
}

/// Vectorized 3×3 convolution; same contract and interior range as
/// [`super::conv3x3`].
///
/// # Errors
///
/// Returns [`TensorError::InconsistentDimensions`] on kernel or output shape mismatch.
pub fn conv3x3_vectorized(
    input: &Tensor<f32, 2>,
    kernel: &Tensor<f32, 2>,
    output: &mut Tensor<f32, 2>,
) -> Result<(), TensorError> {
    check_shapes(input, kernel, output)?;
    let [n_rows, n_cols] = *input.dims();
    if n_rows < 3 || n_cols < 3 {
        return Ok(());
    }

    let weights = kernel.as_slice();
    let k: [f32; 9] = std::array::from_fn(|i| weights[i]);
    let src = input.as_slice();
    let dst = output.as_mut_slice();
    let row_kernel = select_row_kernel();

    for y in 1..n_rows - 1 {
        let r0 = &src[(y - 1) * n_cols..y * n_cols];
        let r1 = &src[y * n_cols..(y + 1) * n_cols];
        let r2 = &src[(y + 1) * n_cols..(y + 2) * n_cols];
        let drow = &mut dst[y * n_cols..(y + 1) * n_cols];

        // SAFETY: `select_row_kernel` only returns kernels whose target
        // features were detected on this CPU; all rows have `n_cols >= 3` elements.
        let tail = unsafe { row_kernel(r0, r1, r2, &k, drow) };
        for x in tail..n_cols - 1 {
            drow[x] = cell(r0, r1, r2, &k, x);
        }
    }
    Ok(())
}

mod portable {
    use super::LANES;

    #[inline(always)]
    fn fused(r0: &[f32], r1: &[f32], r2: &[f32], k: &[f32; 9], x: usize) -> f32 {
        let mut acc = r2[x + 1] * k[8];
        acc = r2[x].mul_add(k[7], acc);
        acc = r2[x - 1].mul_add(k[6], acc);
        acc = r1[x + 1].mul_add(k[5], acc);
        acc = r1[x].mul_add(k[4], acc);
        acc = r1[x - 1].mul_add(k[3], acc);
        acc = r0[x + 1].mul_add(k[2], acc);
        acc = r0[x].mul_add(k[1], acc);
        r0[x - 1].mul_add(k[0], acc)
    }

    pub(super) fn row(r0: &[f32], r1: &[f32], r2: &[f32], k: &[f32; 9], drow: &mut [f32]) -> usize {
        let width = drow.len();
        let mut x = 1;
        while x + LANES < width {
            for c in x..x + LANES {
                drow[c] = fused(r0, r1, r2, k, c);
            }
            x += LANES;
        }
        x
    }
}

#[cfg(all(feature = "avx2", target_arch = "x86_64"))]
mod avx2 {
    use std::arch::x86_64::{
        _mm256_fmadd_ps, _mm256_loadu_ps, _mm256_mul_ps, _mm256_set1_ps, _mm256_storeu_ps,
    };

    use super::LANES;

    /// # Safety
    ///
    /// The CPU must support AVX2 and FMA. All slices must share one length.
    #[target_feature(enable = "avx2,fma")]
    pub(super) unsafe fn row(
        r0: &[f32],
        r1: &[f32],
        r2: &[f32],
        k: &[f32; 9],
        drow: &mut [f32],
    ) -> usize {
        let width = drow.len();
        debug_assert!(r0.len() == width && r1.len() == width && r2.len() == width);
        let (p0, p1, p2, out) = (r0.as_ptr(), r1.as_ptr(), r2.as_ptr(), drow.as_mut_ptr());
        let mut x = 1;

        // SAFETY: while `x + LANES < width`, loads read `[x - 1, x + LANES]` and
        // the store writes `[x, x + LANES)`, all inside rows of `width` elements.
        unsafe {
            let k00 = _mm256_set1_ps(k[0]);
            let k01 = _mm256_set1_ps(k[1]);
            let k02 = _mm256_set1_ps(k[2]);
            let k10 = _mm256_set1_ps(k[3]);
            let k11 = _mm256_set1_ps(k[4]);
            let k12 = _mm256_set1_ps(k[5]);
            let k20 = _mm256_set1_ps(k[6]);
            let k21 = _mm256_set1_ps(k[7]);
            let k22 = _mm256_set1_ps(k[8]);

            while x + LANES < width {
                let r0l = _mm256_loadu_ps(p0.add(x - 1));
                let r0m = _mm256_loadu_ps(p0.add(x));
                let r0r = _mm256_loadu_ps(p0.add(x + 1));
                let r1l = _mm256_loadu_ps(p1.add(x - 1));
                let r1m = _mm256_loadu_ps(p1.add(x));
                let r1r = _mm256_loadu_ps(p1.add(x + 1));
                let r2l = _mm256_loadu_ps(p2.add(x - 1));
                let r2m = _mm256_loadu_ps(p2.add(x));
                let r2r = _mm256_loadu_ps(p2.add(x + 1));

                let acc = _mm256_fmadd_ps(
                    r0l,
                    k00,
                    _mm256_fmadd_ps(
                        r0m,
                        k01,
                        _mm256_fmadd_ps(
                            r0r,
                            k02,
                            _mm256_fmadd_ps(
                                r1l,
                                k10,
                                _mm256_fmadd_ps(
                                    r1m,
                                    k11,
                                    _mm256_fmadd_ps(
                                        r1r,
                                        k12,
                                        _mm256_fmadd_ps(
                                            r2l,
                                            k20,
                                            _mm256_fmadd_ps(r2m, k21, _mm256_mul_ps(r2r, k22)),
                                        ),
                                    ),
                                ),
                            ),
                        ),
                    ),
                );

                _mm256_storeu_ps(out.add(x), acc);
                x += LANES;
            }
        }
        x
    }
}

#[cfg(all(feature = "neon", target_arch = "aarch64"))]
mod neon {
    use std::arch::aarch64::{vdupq_n_f32, vfmaq_f32, vld1q_f32, vmulq_f32, vst1q_f32};

    use super::LANES;

    /// Two 4-lane registers cover one 8-column step.
    ///
    /// # Safety
    ///
    /// The CPU must support NEON. All slices must share one length.
    #[target_feature(enable = "neon")]
    pub(super) unsafe fn row(
        r0: &[f32],
        r1: &[f32],
        r2: &[f32],
        k: &[f32; 9],
        drow: &mut [f32],
    ) -> usize {
        let width = drow.len();
        debug_assert!(r0.len() == width && r1.len() == width && r2.len() == width);
        let (p0, p1, p2, out) = (r0.as_ptr(), r1.as_ptr(), r2.as_ptr(), drow.as_mut_ptr());
        let mut x = 1;

        // SAFETY: while `x + LANES < width`, loads read `[x - 1, x + LANES]` and
        // the stores write `[x, x + LANES)`, all inside rows of `width` elements.
        unsafe {
            let k00 = vdupq_n_f32(k[0]);
            let k01 = vdupq_n_f32(k[1]);
            let k02 = vdupq_n_f32(k[2]);
            let k10 = vdupq_n_f32(k[3]);
            let k11 = vdupq_n_f32(k[4]);
            let k12 = vdupq_n_f32(k[5]);
            let k20 = vdupq_n_f32(k[6]);
            let k21 = vdupq_n_f32(k[7]);
            let k22 = vdupq_n_f32(k[8]);

            while x + LANES < width {
                for c in [x, x + 4] {
                    let mut acc = vmulq_f32(vld1q_f32(p2.add(c + 1)), k22);
                    acc = vfmaq_f32(acc, vld1q_f32(p2.add(c)), k21);
                    acc = vfmaq_f32(acc, vld1q_f32(p2.add(c - 1)), k20);
                    acc = vfmaq_f32(acc, vld1q_f32(p1.add(c + 1)), k12);
                    acc = vfmaq_f32(acc, vld1q_f32(p1.add(c)), k11);
                    acc = vfmaq_f32(acc, vld1q_f32(p1.add(c - 1)), k10);
                    acc = vfmaq_f32(acc, vld1q_f32(p0.add(c + 1)), k02);
                    acc = vfmaq_f32(acc, vld1q_f32(p0.add(c)), k01);
                    acc = vfmaq_f32(acc, vld1q_f32(p0.add(c - 1)), k00);
                    vst1q_f32(out.add(c), acc);
                }
                x += LANES;
            }
        }
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(width: usize) -> [Vec<f32>; 3] {
        std::array::from_fn(|r| (0..width).map(|c| ((r * 31 + c * 7) % 13) as f32 * 0.1).collect())
    }

    #[test]
    fn detection_is_cached() {
        assert_eq!(simd_capabilities(), simd_capabilities());
    }

    #[test]
    fn portable_row_stops_before_partial_vector() {
        let k = [0.05, 0.2, 0.05, 0.2, -1.0, 0.2, 0.05, 0.2, 0.05];
        for (width, expected) in [(3, 1), (9, 1), (10, 9), (17, 9), (18, 17), (25, 17)] {
            let [r0, r1, r2] = rows(width);
            let mut out = vec![f32::NAN; width];
            assert_eq!(portable::row(&r0, &r1, &r2, &k, &mut out), expected, "width {width}");
            assert!(out[0].is_nan() && out[expected..].iter().all(|v| v.is_nan()));
        }
    }

    #[test]
    fn selected_kernel_matches_portable_bits() {
        let k = [0.1, -0.3, 0.25, 0.7, 0.05, -0.45, 0.2, 0.15, -0.6];
        let [r0, r1, r2] = rows(67);
        let mut expected = vec![0.0; 67];
        let mut actual = vec![0.0; 67];
        let end = portable::row(&r0, &r1, &r2, &k, &mut expected);
        // SAFETY: the selected kernel's features were detected on this CPU.
        let got = unsafe { select_row_kernel()(&r0, &r1, &r2, &k, &mut actual) };
        assert_eq!(end, got);
        assert_eq!(expected, actual);
    }
}
