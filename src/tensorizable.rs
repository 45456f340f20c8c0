use crate::{Tensor, element::Element, error::TensorError, shape::Shape, storage::Storage};

pub trait Tensorizable<T, const N: usize> {
    /// Trait to convert arbitrary nested data into a rank-`N` tensor.
    ///
    /// # Errors
    /// Returns an error if the data is ragged or allocation fails.
    fn to_tensor(self) -> Result<Tensor<T, N>, TensorError>;
}

fn build<T: Element, const N: usize>(
    shape: Shape<N>,
    data: impl IntoIterator<Item = T>,
) -> Result<Tensor<T, N>, TensorError> {
    let storage = Storage::from_iter_exact(shape.total_size(), data)?;
    Ok(Tensor::from_raw(storage, shape))
}

impl<T: Element> Tensorizable<T, 1> for Vec<T> {
    fn to_tensor(self) -> Result<Tensor<T, 1>, TensorError> {
        build(Shape::from(self.len()), self)
    }
}

impl<T: Element> Tensorizable<T, 2> for Vec<Vec<T>> {
    fn to_tensor(self) -> Result<Tensor<T, 2>, TensorError> {
        let (dim0, dim1) = (self.len(), self.first().map_or(0, Vec::len));
        if let Some(row) = self.iter().find(|x| x.len() != dim1) {
            let expected = vec![dim0, dim1];
            let received = vec![dim0, row.len()];
            return Err(TensorError::InconsistentDimensions { expected, received });
        }

        build((dim0, dim1).into(), self.into_iter().flatten())
    }
}

fn check_vec_3d<T>(data: &[Vec<Vec<T>>]) -> Result<Shape<3>, TensorError> {
    if data.is_empty() {
        return Ok((0, 0, 0).into());
    }
    let planes = data.len();

    let expected_rows = data[0].len();
    let expected_columns = data[0].first().map_or(0, Vec::len);

    for plane in data {
        let actual_rows = plane.len();
        if actual_rows != expected_rows {
            return Err(TensorError::InconsistentDimensions {
                expected: vec![planes, expected_rows, expected_columns],
                received: vec![planes, actual_rows, expected_columns],
            });
        }

        for row in plane {
            let actual_columns = row.len();
            if actual_columns != expected_columns {
                return Err(TensorError::InconsistentDimensions {
                    expected: vec![planes, expected_rows, expected_columns],
                    received: vec![planes, actual_rows, actual_columns],
                });
            }
        }
    }

    Ok((planes, expected_rows, expected_columns).into())
}

impl<T: Element> Tensorizable<T, 3> for Vec<Vec<Vec<T>>> {
    fn to_tensor(self) -> Result<Tensor<T, 3>, TensorError> {
        let shape = check_vec_3d(&self)?;
        build(shape, self.into_iter().flat_map(|v| v.into_iter().flatten()))
    }
}

impl<T: Element, const N0: usize> Tensorizable<T, 1> for [T; N0] {
    fn to_tensor(self) -> Result<Tensor<T, 1>, TensorError> {
        build(Shape::from(N0), self)
    }
}

impl<T: Element, const N0: usize, const N1: usize> Tensorizable<T, 2> for [[T; N1]; N0] {
    fn to_tensor(self) -> Result<Tensor<T, 2>, TensorError> {
        build((N0, N1).into(), self.into_iter().flatten())
    }
}

impl<T: Element, const N0: usize, const N1: usize, const N2: usize> Tensorizable<T, 3>
    for [[[T; N2]; N1]; N0]
{
    fn to_tensor(self) -> Result<Tensor<T, 3>, TensorError> {
        build(
            (N0, N1, N2).into(),
            self.into_iter().flat_map(|v| v.into_iter().flatten()),
        )
    }
}
