//! Random tensor construction.
//!
//! Benchmarks draw a fresh tensor every iteration, so these constructors go
//! through the same fallible allocation as `DenseTensor::zeros`.

use rand::Rng;
use rand::distr::{Distribution, StandardUniform};
use rand_distr::StandardNormal;

use crate::error::Result;
use crate::scalar::Scalar;
use crate::tensor::{DenseTensor, element_count, try_alloc};

/// Scalars that can be sampled from the uniform distribution on [0, 1).
pub trait RandomUniform: Scalar {
    fn sample_uniform<R: Rng + ?Sized>(rng: &mut R) -> Self;
}

impl RandomUniform for f32 {
    fn sample_uniform<R: Rng + ?Sized>(rng: &mut R) -> Self {
        StandardUniform.sample(rng)
    }
}

impl RandomUniform for f64 {
    fn sample_uniform<R: Rng + ?Sized>(rng: &mut R) -> Self {
        StandardUniform.sample(rng)
    }
}

/// Scalars that can be sampled from the standard normal distribution.
pub trait RandomNormal: Scalar {
    fn sample_normal<R: Rng + ?Sized>(rng: &mut R) -> Self;
}

impl RandomNormal for f32 {
    fn sample_normal<R: Rng + ?Sized>(rng: &mut R) -> Self {
        StandardNormal.sample(rng)
    }
}

impl RandomNormal for f64 {
    fn sample_normal<R: Rng + ?Sized>(rng: &mut R) -> Self {
        StandardNormal.sample(rng)
    }
}

/// Fill a freshly reserved buffer with `len` samples.
pub fn sample_vec<T, R: Rng + ?Sized>(
    len: usize,
    rng: &mut R,
    mut sample: impl FnMut(&mut R) -> T,
) -> Result<Vec<T>> {
    let mut data = try_alloc::<T>(len)?;
    data.extend((0..len).map(|_| sample(rng)));
    Ok(data)
}

impl<T: RandomUniform> DenseTensor<T> {
    /// Tensor of independent uniform samples in [0, 1).
    ///
    /// # Example
    ///
    /// ```
    /// use einbench::DenseTensor;
    /// use rand::SeedableRng;
    /// use rand::rngs::StdRng;
    ///
    /// let mut rng = StdRng::seed_from_u64(42);
    /// let t = DenseTensor::<f32>::random_with_rng(&[2, 3], &mut rng).unwrap();
    /// assert_eq!(t.shape(), &[2, 3]);
    /// assert!(t.data().iter().all(|&v| (0.0..1.0).contains(&v)));
    /// ```
    pub fn random_with_rng<R: Rng + ?Sized>(shape: &[usize], rng: &mut R) -> Result<Self> {
        let data = sample_vec(element_count(shape)?, rng, |r| T::sample_uniform(r))?;
        Self::from_vec(data, shape)
    }
}
