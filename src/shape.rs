use std::{fmt::Display, ops::Index};

/// Dimension sizes of a rank-`N` tensor.
///
/// Strides are never stored: they are always derived row-major from the
/// dimensions, so the two can not drift apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape<const N: usize>([usize; N]);

impl From<(usize, usize, usize)> for Shape<3> {
    fn from(value: (usize, usize, usize)) -> Self {
        Shape([value.0, value.1, value.2])
    }
}

impl From<(usize, usize)> for Shape<2> {
    fn from(value: (usize, usize)) -> Self {
        Shape([value.0, value.1])
    }
}

impl From<usize> for Shape<1> {
    fn from(value: usize) -> Self {
        Shape([value])
    }
}

impl<const N: usize> From<[usize; N]> for Shape<N> {
    fn from(value: [usize; N]) -> Self {
        Shape(value)
    }
}

impl<const N: usize> Default for Shape<N> {
    /// The all-zero shape of an empty tensor.
    fn default() -> Self {
        Shape([0; N])
    }
}

impl<const N: usize> Shape<N> {
    #[inline]
    pub const fn ndims(&self) -> usize {
        N
    }

    #[inline]
    pub fn dims(&self) -> &[usize; N] {
        &self.0
    }

    /// Number of elements, the product of all dimensions.
    #[inline]
    pub fn total_size(&self) -> usize {
        self.0.iter().product()
    }

    /// Number of elements, or `None` if the product overflows `usize`.
    #[inline]
    pub fn checked_total_size(&self) -> Option<usize> {
        self.0.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    /// Row-major strides: the last dimension has stride 1 and every earlier
    /// stride is the product of the dimensions to its right.
    ///
    /// A leading zero dimension lets the element count stay at 0 while the
    /// trailing product overflows (`[0, usize::MAX, 2]`). Such shapes never
    /// back a tensor; for them the strides saturate at `usize::MAX`.
    pub fn strides(&self) -> [usize; N] {
        let mut strides = [0; N];
        let mut acc = 1usize;
        for d in (1..N).rev() {
            strides[d] = acc;
            acc = acc.saturating_mul(self.0[d]);
        }
        if N > 0 {
            strides[0] = acc;
        }
        strides
    }

    /// Row-major strides, or `None` if any of them overflows `usize`.
    pub fn checked_strides(&self) -> Option<[usize; N]> {
        let mut strides = [0; N];
        let mut acc = 1usize;
        for d in (1..N).rev() {
            strides[d] = acc;
            acc = acc.checked_mul(self.0[d])?;
        }
        if N > 0 {
            strides[0] = acc;
        }
        Some(strides)
    }

    /// Returns `true` if every coordinate of `position` is inside the shape.
    #[inline]
    pub fn contains(&self, position: &[usize; N]) -> bool {
        position.iter().zip(&self.0).all(|(p, d)| p < d)
    }

    /// Flat row-major offset of `position`.
    ///
    /// Positions outside the shape are a caller contract violation, caught by
    /// a debug assertion. Release builds return an unspecified offset, which
    /// safe element access then bounds-checks against the allocation.
    #[inline]
    pub fn offset(&self, position: &[usize; N]) -> usize {
        debug_assert!(
            self.contains(position),
            "position {position:?} out of range for {self}"
        );
        position
            .iter()
            .zip(self.strides())
            .fold(0usize, |acc, (&p, s)| acc.wrapping_add(p.wrapping_mul(s)))
    }
}

impl<const N: usize> Index<usize> for Shape<N> {
    type Output = usize;

    fn index(&self, index: usize) -> &Self::Output {
        assert!(index < N);
        &self.0[index]
    }
}

impl<const N: usize> Display for Shape<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Shape(")?;
        for (i, dim) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{dim}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strides_are_row_major() {
        let shape = Shape::from((10, 15, 20));
        assert_eq!(shape.strides(), [300, 20, 1]);
        assert_eq!(shape.total_size(), 3000);
    }

    #[test]
    fn offset_matches_strides() {
        let shape = Shape::from((10, 15, 20));
        assert_eq!(shape.offset(&[0, 0, 0]), 0);
        assert_eq!(shape.offset(&[0, 1, 2]), 22);
        assert_eq!(shape.offset(&[9, 14, 19]), 2999);
    }

    #[test]
    fn zero_dims_give_zero_size() {
        assert_eq!(Shape::from((4, 0)).total_size(), 0);
        assert_eq!(Shape::<3>::default().dims(), &[0, 0, 0]);
    }

    #[test]
    fn empty_shape_with_huge_trailing_dims() {
        let shape = Shape::from([0, usize::MAX, 2]);
        assert_eq!(shape.checked_total_size(), Some(0));
        assert_eq!(shape.checked_strides(), None);
        assert_eq!(shape.strides(), [usize::MAX, 2, 1]);

        let shape = Shape::from([0, usize::MAX]);
        assert_eq!(shape.checked_strides(), Some([usize::MAX, 1]));
    }

    #[test]
    fn display() {
        assert_eq!(Shape::from((2, 3)).to_string(), "Shape(2, 3)");
        assert_eq!(Shape::from(7).to_string(), "Shape(7)");
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "out of range")]
    fn out_of_range_offset_panics_in_debug() {
        Shape::from((2, 3)).offset(&[0, 3]);
    }

    fn dims3() -> impl Strategy<Value = [usize; 3]> {
        prop::array::uniform3(1usize..6)
    }

    proptest! {
        #[test]
        fn prop_offset_is_injective(dims in dims3()) {
            let shape = Shape::from(dims);
            let mut seen = vec![false; shape.total_size()];
            for i in 0..dims[0] {
                for j in 0..dims[1] {
                    for k in 0..dims[2] {
                        let off = shape.offset(&[i, j, k]);
                        prop_assert!(off < seen.len());
                        prop_assert!(!seen[off]);
                        seen[off] = true;
                    }
                }
            }
            prop_assert!(seen.iter().all(|&s| s));
        }

        #[test]
        fn prop_checked_strides_agree(dims in dims3()) {
            let shape = Shape::from(dims);
            prop_assert_eq!(shape.checked_strides(), Some(shape.strides()));
        }

        #[test]
        fn prop_last_coordinate_steps_by_one(dims in dims3(), pick in any::<prop::sample::Index>()) {
            let shape = Shape::from(dims);
            let flat = pick.index(shape.total_size());
            let strides = shape.strides();
            let pos = [flat / strides[0], (flat / strides[1]) % dims[1], flat % dims[2]];
            prop_assert_eq!(shape.offset(&pos), flat);
            if pos[2] + 1 < dims[2] {
                let next = [pos[0], pos[1], pos[2] + 1];
                prop_assert_eq!(shape.offset(&next), flat + 1);
            }
        }
    }
}
