//! 3×3 stencil convolution over 2-D fields.
//!
//! Both implementations write every interior cell `(i, j)` with
//! `1 <= i <= rows - 2` and `1 <= j <= cols - 2` and never touch the outermost
//! ring: no boundary condition is applied, callers own the border cells.

mod scalar;
mod vectorized;

pub use scalar::conv3x3;
pub use vectorized::{SimdCapabilities, conv3x3_vectorized, simd_capabilities};

use crate::{Tensor, error::TensorError};

/// Number of interior columns produced per vector iteration.
pub const LANES: usize = 8;

/// A 3×3 convolution strategy used by the solver.
pub trait Stencil {
    /// Short identifier used in logs and by the backend factory.
    const NAME: &'static str;

    /// Convolves the interior of `input` with `kernel` into `output`.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::InconsistentDimensions`] when `kernel` is not
    /// 3×3 or `output` does not match `input`.
    fn apply(
        input: &Tensor<f32, 2>,
        kernel: &Tensor<f32, 2>,
        output: &mut Tensor<f32, 2>,
    ) -> Result<(), TensorError>;
}

/// Scalar reference convolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scalar;

/// Eight-wide fused multiply-add convolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct Vectorized;

impl Stencil for Scalar {
    const NAME: &'static str = "reference";

    fn apply(
        input: &Tensor<f32, 2>,
        kernel: &Tensor<f32, 2>,
        output: &mut Tensor<f32, 2>,
    ) -> Result<(), TensorError> {
        conv3x3(input, kernel, output)
    }
}

impl Stencil for Vectorized {
    const NAME: &'static str = "vectorized";

    fn apply(
        input: &Tensor<f32, 2>,
        kernel: &Tensor<f32, 2>,
        output: &mut Tensor<f32, 2>,
    ) -> Result<(), TensorError> {
        conv3x3_vectorized(input, kernel, output)
    }
}

fn check_shapes(
    input: &Tensor<f32, 2>,
    kernel: &Tensor<f32, 2>,
    output: &Tensor<f32, 2>,
) -> Result<(), TensorError> {
    if kernel.dims() != &[3, 3] {
        return Err(TensorError::InconsistentDimensions {
            expected: vec![3, 3],
            received: kernel.dims().to_vec(),
        });
    }
    if output.dims() != input.dims() {
        return Err(TensorError::InconsistentDimensions {
            expected: input.dims().to_vec(),
            received: output.dims().to_vec(),
        });
    }
    Ok(())
}

/// The scalar formula for one cell, summed left to right `k00..k22`.
///
/// `r0`, `r1`, `r2` are the rows above, at and below the cell.
#[inline(always)]
fn cell(r0: &[f32], r1: &[f32], r2: &[f32], k: &[f32; 9], x: usize) -> f32 {
    r0[x - 1] * k[0]
        + r0[x] * k[1]
        + r0[x + 1] * k[2]
        + r1[x - 1] * k[3]
        + r1[x] * k[4]
        + r1[x + 1] * k[5]
        + r2[x - 1] * k[6]
        + r2[x] * k[7]
        + r2[x + 1] * k[8]
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    type Field = Tensor<f32, 2>;

    const ABS_EPS: f64 = 1e-6;
    const REL_EPS: f64 = 1e-5;

    fn laplacian() -> Field {
        Field::new([[0.05, 0.2, 0.05], [0.2, -1.0, 0.2], [0.05, 0.2, 0.05]]).unwrap()
    }

    fn assert_interior_agrees(rows: usize, cols: usize, kernel: &Field, seed: u64) {
        let input = Field::randu((rows, cols), &mut ChaCha8Rng::seed_from_u64(seed)).unwrap();
        let mut reference = Field::full((rows, cols), f32::NAN).unwrap();
        let mut vectorized = Field::full((rows, cols), f32::NAN).unwrap();
        conv3x3(&input, kernel, &mut reference).unwrap();
        conv3x3_vectorized(&input, kernel, &mut vectorized).unwrap();

        for i in 0..rows {
            for j in 0..cols {
                let (a, b) = (reference[[i, j]], vectorized[[i, j]]);
                let interior = (1..rows - 1).contains(&i) && (1..cols - 1).contains(&j);
                if interior {
                    let tol = ABS_EPS + REL_EPS * f64::from(a.abs().max(b.abs()));
                    assert!(
                        f64::from((a - b).abs()) <= tol,
                        "{rows}x{cols} mismatch at ({i}, {j}): {a} vs {b}"
                    );
                } else {
                    assert!(a.is_nan() && b.is_nan(), "border ({i}, {j}) was written");
                }
            }
        }
    }

    #[test]
    fn constant_field_gives_kernel_sum() {
        let input = Field::full((5, 6), 2.0).unwrap();
        let kernel = Field::full((3, 3), 1.0).unwrap();
        let mut out = Field::zeros((5, 6)).unwrap();
        conv3x3(&input, &kernel, &mut out).unwrap();
        assert_eq!(out[[2, 3]], 18.0);
        assert_eq!(out[[0, 0]], 0.0);
        assert_eq!(out[[4, 5]], 0.0);
    }

    #[test]
    fn laplacian_of_constant_is_zero() {
        let input = Field::full((16, 21), 0.75).unwrap();
        let mut out = Field::zeros((16, 21)).unwrap();
        conv3x3_vectorized(&input, &laplacian(), &mut out).unwrap();
        assert!(out.as_slice().iter().all(|x| x.abs() < 1e-6));
    }

    #[test]
    fn kernel_weights_are_row_major() {
        // A single hot cell picks out the kernel weight at its offset from the centre.
        let mut input = Field::zeros((3, 3)).unwrap();
        input[[1, 1]] = 1.0;
        let kernel = Field::new([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]).unwrap();
        let mut out = Field::zeros((3, 3)).unwrap();
        conv3x3(&input, &kernel, &mut out).unwrap();
        assert_eq!(out[[1, 1]], 5.0);

        let mut input = Field::zeros((3, 3)).unwrap();
        input[[0, 0]] = 1.0;
        conv3x3(&input, &kernel, &mut out).unwrap();
        assert_eq!(out[[1, 1]], 1.0);
    }

    #[test]
    fn small_fields_have_no_interior() {
        let input = Field::full((2, 40), 1.0).unwrap();
        let mut out = Field::full((2, 40), -3.0).unwrap();
        conv3x3_vectorized(&input, &laplacian(), &mut out).unwrap();
        conv3x3(&input, &laplacian(), &mut out).unwrap();
        assert!(out.as_slice().iter().all(|&x| x == -3.0));
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let input = Field::zeros((8, 8)).unwrap();
        let mut out = Field::zeros((8, 9)).unwrap();
        assert!(conv3x3(&input, &laplacian(), &mut out).is_err());
        assert!(conv3x3_vectorized(&input, &laplacian(), &mut out).is_err());

        let mut out = Field::zeros((8, 8)).unwrap();
        let kernel = Field::zeros((2, 3)).unwrap();
        assert!(matches!(
            Vectorized::apply(&input, &kernel, &mut out),
            Err(TensorError::InconsistentDimensions { .. })
        ));
    }

    #[test]
    fn vectorized_matches_scalar_on_reference_sizes() {
        let kernel = laplacian();
        for (seed, (rows, cols)) in [(7, 7), (128, 128), (256, 256), (517, 513)]
            .into_iter()
            .enumerate()
        {
            assert_interior_agrees(rows, cols, &kernel, seed as u64);
        }
    }

    #[test]
    fn vectorized_matches_scalar_with_asymmetric_kernel() {
        let kernel =
            Field::new([[0.1, -0.3, 0.25], [0.7, 0.05, -0.45], [0.2, 0.15, -0.6]]).unwrap();
        assert_interior_agrees(33, 67, &kernel, 11);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_vectorized_matches_scalar(rows in 1usize..40, cols in 1usize..40, seed in any::<u64>()) {
            assert_interior_agrees(rows, cols, &laplacian(), seed);
        }
    }
}
