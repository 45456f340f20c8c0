//! Element types storable in a [`crate::Tensor`].

use std::fmt::Debug;

use bytemuck::Zeroable;

/// Absolute epsilon used by [`Element::approx_eq`] for floating point types.
pub const FLOAT_EQ_EPSILON: f64 = 1e-6;

/// A plain value type that can live in tensor storage.
///
/// `Zeroable` guarantees the all-zero bit pattern is a valid value, which is
/// what makes zero-filled allocations safe to expose as initialized.
pub trait Element: Copy + Zeroable + Debug + Send + Sync + 'static {
    const ZERO: Self;
    const ONE: Self;

    /// Tensor element equality: exact for integers and `bool`,
    /// within [`FLOAT_EQ_EPSILON`] for floats.
    fn approx_eq(self, other: Self) -> bool;
}

/// Floating point elements, comparable under a combined tolerance.
pub trait Real: Element + PartialOrd {
    /// `|a - b| <= abs_eps + rel_eps * max(|a|, |b|)`.
    fn almost_equal(self, other: Self, abs_eps: f64, rel_eps: f64) -> bool;
}

macro_rules! impl_float {
    ($($t:ty),*) => {$(
        impl Element for $t {
            const ZERO: Self = 0.0;
            const ONE: Self = 1.0;

            #[inline]
            fn approx_eq(self, other: Self) -> bool {
                f64::from(self - other).abs() <= FLOAT_EQ_EPSILON
            }
        }

        impl Real for $t {
            #[inline]
            fn almost_equal(self, other: Self, abs_eps: f64, rel_eps: f64) -> bool {
                let (a, b) = (f64::from(self), f64::from(other));
                (a - b).abs() <= abs_eps + rel_eps * a.abs().max(b.abs())
            }
        }
    )*};
}

macro_rules! impl_integral {
    ($($t:ty),*) => {$(
        impl Element for $t {
            const ZERO: Self = 0;
            const ONE: Self = 1;

            #[inline]
            fn approx_eq(self, other: Self) -> bool {
                self == other
            }
        }
    )*};
}

impl_float!(f32, f64);
impl_integral!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

impl Element for bool {
    const ZERO: Self = false;
    const ONE: Self = true;

    #[inline]
    fn approx_eq(self, other: Self) -> bool {
        self == other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floats_compare_with_epsilon() {
        assert!(1.0f32.approx_eq(1.0 + 5e-7));
        assert!(!1.0f32.approx_eq(1.0 + 1e-5));
        assert!(2.0f64.approx_eq(2.0 - 9e-7));
    }

    #[test]
    fn integers_compare_exactly() {
        assert!(3i32.approx_eq(3));
        assert!(!3u8.approx_eq(4));
        assert!(!true.approx_eq(false));
    }

    #[test]
    fn almost_equal_scales_with_magnitude() {
        assert!(1000.0f32.almost_equal(1000.005, 1e-6, 1e-5));
        assert!(!1.0f32.almost_equal(1.001, 1e-6, 1e-5));
        assert!(0.0f64.almost_equal(5e-7, 1e-6, 1e-5));
    }
}
