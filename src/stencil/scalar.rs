use crate::{Tensor, error::TensorError};

use super::check_shapes;

/// Scalar reference 3×3 convolution.
///
/// Walks the interior through views and accumulates the neighbourhood with
/// explicit kernel indices, `k00` first.
///
/// # Errors
///
/// Returns [`TensorError::InconsistentDimensions`] on kernel or output shape mismatch.
pub fn conv3x3(
    input: &Tensor<f32, 2>,
    kernel: &Tensor<f32, 2>,
    output: &mut Tensor<f32, 2>,
) -> Result<(), TensorError> {
    check_shapes(input, kernel, output)?;
    let [n_rows, n_cols] = *input.dims();
    if n_rows < 3 || n_cols < 3 {
        return Ok(());
    }

    let inp = input.view();
    let kern = kernel.view();
    let mut outp = output.view_mut();

    for i in 1..n_rows - 1 {
        let mut out_row = outp.slice_mut(i);
        for j in 1..n_cols - 1 {
            let mut sum = 0.0f32;
            for ki in 0..3 {
                let row = inp.slice(i + ki - 1);
                let weights = kern.slice(ki);
                for kj in 0..3 {
                    sum += row[j + kj - 1] * weights[kj];
                }
            }
            out_row[j] = sum;
        }
    }
    Ok(())
}
