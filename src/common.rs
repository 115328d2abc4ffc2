use ndarray::Array1;
use num::{Float, FromPrimitive};
use std::ops::{AddAssign, DivAssign, MulAssign, SubAssign};

/// Numeric type used for coordinates, bounds and split values.
///
/// # Example
///
/// ```
/// use halfspace_stream::common::FType;
///
/// fn midpoint<F: FType>(lo: F, hi: F) -> F {
///     (lo + hi) / F::from_f64(2.0).unwrap()
/// }
///
/// assert_eq!(midpoint(0.0f32, 10.0f32), 5.0);
/// ```
pub trait FType:
    Float + FromPrimitive + AddAssign + SubAssign + MulAssign + DivAssign + std::fmt::Debug
{
}
impl<T> FType for T where
    T: Float + FromPrimitive + AddAssign + SubAssign + MulAssign + DivAssign + std::fmt::Debug
{
}

/// A point of the stream: a fixed number of ordered coordinates.
///
/// The trees never mutate a sample, they only read coordinate `i` on the split
/// dimension of every node they walk through.
///
/// # Example
///
/// ```
/// use halfspace_stream::common::Sample;
///
/// let point = vec![1.0f64, 2.5];
/// assert_eq!(point.dimensions(), 2);
/// assert_eq!(point.coordinate(1), 2.5);
/// ```
pub trait Sample<F: FType> {
    fn dimensions(&self) -> usize;
    fn coordinate(&self, index: usize) -> F;

    /// Index of the first NaN or infinite coordinate, if any.
    fn first_non_finite(&self) -> Option<usize> {
        (0..self.dimensions()).find(|&i| !self.coordinate(i).is_finite())
    }
}

impl<F: FType> Sample<F> for [F] {
    fn dimensions(&self) -> usize {
        self.len()
    }
    fn coordinate(&self, index: usize) -> F {
        self[index]
    }
}

impl<F: FType> Sample<F> for Vec<F> {
    fn dimensions(&self) -> usize {
        self.len()
    }
    fn coordinate(&self, index: usize) -> F {
        self[index]
    }
}

impl<F: FType, const N: usize> Sample<F> for [F; N] {
    fn dimensions(&self) -> usize {
        N
    }
    fn coordinate(&self, index: usize) -> F {
        self[index]
    }
}

impl<F: FType> Sample<F> for Array1<F> {
    fn dimensions(&self) -> usize {
        self.len()
    }
    fn coordinate(&self, index: usize) -> F {
        self[index]
    }
}
