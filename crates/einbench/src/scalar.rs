//! Scalar trait for tensor element types.

use faer_traits::ComplexField;
use std::fmt::Debug;
use std::ops::{Add, Mul};

/// Element types a benchmark tensor can hold.
///
/// Wraps faer's `ComplexField` so every scalar can go straight into a faer
/// GEMM. Only real floating point types are benchmarked.
pub trait Scalar:
    ComplexField + Copy + Debug + Default + PartialOrd + Add<Output = Self> + Mul<Output = Self> + 'static
{
    /// Returns the additive identity (zero).
    fn zero() -> Self {
        Self::default()
    }

    /// Returns the multiplicative identity (one).
    fn one() -> Self;

    /// Widen to `f64` for error measurement.
    fn to_f64(self) -> f64;
}

impl Scalar for f32 {
    fn one() -> Self {
        1.0
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl Scalar for f64 {
    fn one() -> Self {
        1.0
    }

    fn to_f64(self) -> f64 {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_real_types() {
        assert!(<f32 as ComplexField>::IS_REAL);
        assert!(<f64 as ComplexField>::IS_REAL);
    }

    #[test]
    fn test_zero_one() {
        assert_eq!(f32::zero(), 0.0);
        assert_eq!(f32::one(), 1.0);
        assert_eq!(f64::zero(), 0.0);
        assert_eq!(f64::one(), 1.0);
    }

    #[test]
    fn test_to_f64() {
        assert_eq!(0.5f32.to_f64(), 0.5);
        assert_eq!((-2.25f64).to_f64(), -2.25);
    }
}
