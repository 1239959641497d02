//! Dense column-major tensor.
//!
//! The host-side tensor type shared by the primary CPU backend, the
//! reference contractions and the cross-backend checks. Storage is a flat
//! `Vec` in column-major (Fortran) order, the layout faer expects, so a
//! rank-2 tensor can be viewed as a `faer::MatRef` without copying.

use crate::error::{BenchError, Result};
use crate::scalar::Scalar;

/// An n-dimensional dense tensor in column-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseTensor<T: Scalar> {
    data: Vec<T>,
    shape: Vec<usize>,
    strides: Vec<usize>,
}

impl<T: Scalar> DenseTensor<T> {
    /// Create a zero-initialized tensor.
    ///
    /// # Errors
    ///
    /// Returns `BenchError::Allocation` if the host cannot reserve the
    /// working set.
    ///
    /// # Examples
    ///
    /// ```
    /// use einbench::DenseTensor;
    ///
    /// let t = DenseTensor::<f32>::zeros(&[2, 3, 4]).unwrap();
    /// assert_eq!(t.shape(), &[2, 3, 4]);
    /// assert_eq!(t.len(), 24);
    /// ```
    pub fn zeros(shape: &[usize]) -> Result<Self> {
        let len = element_count(shape)?;
        let mut data = try_alloc::<T>(len)?;
        data.resize(len, T::zero());
        Ok(Self::from_parts(data, shape))
    }

    /// Create a tensor filled with ones.
    pub fn ones(shape: &[usize]) -> Result<Self> {
        let mut t = Self::zeros(shape)?;
        t.data.fill(T::one());
        Ok(t)
    }

    /// Create a tensor from column-major data.
    ///
    /// # Errors
    ///
    /// Returns `BenchError::ShapeMismatch` if `data.len()` does not match the
    /// shape.
    ///
    /// # Examples
    ///
    /// ```
    /// use einbench::DenseTensor;
    ///
    /// let t = DenseTensor::from_vec(vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
    /// assert_eq!(t.get(&[1, 0]), Some(&2.0)); // column-major
    /// assert_eq!(t.get(&[0, 1]), Some(&3.0));
    /// ```
    pub fn from_vec(data: Vec<T>, shape: &[usize]) -> Result<Self> {
        let expected = element_count(shape)?;
        if data.len() != expected {
            return Err(BenchError::ShapeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self::from_parts(data, shape))
    }

    /// Build a tensor by evaluating `f` at every cartesian index.
    pub fn from_fn(shape: &[usize], mut f: impl FnMut(&[usize]) -> T) -> Result<Self> {
        let len = element_count(shape)?;
        let mut data = try_alloc::<T>(len)?;
        let mut index = vec![0usize; shape.len()];
        for _ in 0..len {
            data.push(f(&index));
            advance_index(&mut index, shape);
        }
        Ok(Self::from_parts(data, shape))
    }

    fn from_parts(data: Vec<T>, shape: &[usize]) -> Self {
        Self {
            data,
            strides: column_major_strides(shape),
            shape: shape.to_vec(),
        }
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Get element by cartesian indices, `None` when out of bounds.
    pub fn get(&self, indices: &[usize]) -> Option<&T> {
        self.offset(indices).map(|i| &self.data[i])
    }

    /// Set element by cartesian indices.
    pub fn set(&mut self, indices: &[usize], value: T) -> Result<()> {
        if indices.len() != self.ndim() {
            return Err(BenchError::WrongNumberOfIndices {
                expected: self.ndim(),
                actual: indices.len(),
            });
        }
        if let Some((&index, &dim_size)) = indices
            .iter()
            .zip(&self.shape)
            .find(|&(&i, &d)| i >= d)
        {
            return Err(BenchError::IndexOutOfBounds { index, dim_size });
        }
        let i = linear_offset(indices, &self.strides);
        self.data[i] = value;
        Ok(())
    }

    /// Largest elementwise difference relative to the largest magnitude in
    /// `reference`.
    ///
    /// Returns `None` when the shapes differ.
    pub fn max_relative_error(&self, reference: &Self) -> Option<f64> {
        if self.shape != reference.shape {
            return None;
        }
        let scale = reference
            .data
            .iter()
            .map(|x| x.to_f64().abs())
            .fold(0.0f64, f64::max)
            .max(f64::MIN_POSITIVE);
        let diff = self
            .data
            .iter()
            .zip(&reference.data)
            .map(|(a, b)| (a.to_f64() - b.to_f64()).abs())
            .fold(0.0f64, f64::max);
        Some(diff / scale)
    }

    fn offset(&self, indices: &[usize]) -> Option<usize> {
        if indices.len() != self.ndim() {
            return None;
        }
        if indices.iter().zip(&self.shape).any(|(&i, &d)| i >= d) {
            return None;
        }
        Some(linear_offset(indices, &self.strides))
    }
}

/// Number of elements for a shape; the empty shape holds one scalar.
///
/// A count that overflows `usize` can never be allocated and is reported as
/// an allocation failure of `usize::MAX` bytes.
pub(crate) fn element_count(shape: &[usize]) -> Result<usize> {
    checked_product(shape.iter().copied())
}

pub(crate) fn checked_product(dims: impl IntoIterator<Item = usize>) -> Result<usize> {
    dims.into_iter()
        .try_fold(1usize, usize::checked_mul)
        .ok_or(BenchError::Allocation { bytes: usize::MAX })
}

/// Column-major strides: `[1, d0, d0*d1, ...]`.
pub(crate) fn column_major_strides(shape: &[usize]) -> Vec<usize> {
    shape
        .iter()
        .scan(1usize, |acc, &d| {
            let s = *acc;
            *acc *= d;
            Some(s)
        })
        .collect()
}

#[inline]
pub(crate) fn linear_offset(indices: &[usize], strides: &[usize]) -> usize {
    indices.iter().zip(strides).map(|(&i, &s)| i * s).sum()
}

/// Step a cartesian index forward in column-major order (first axis fastest).
pub(crate) fn advance_index(index: &mut [usize], shape: &[usize]) {
    for (i, &d) in index.iter_mut().zip(shape) {
        *i += 1;
        if *i < d {
            return;
        }
        *i = 0;
    }
}

/// Reserve exactly `len` elements, mapping failure to `BenchError::Allocation`.
pub(crate) fn try_alloc<T>(len: usize) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(|_| BenchError::Allocation {
        bytes: len.saturating_mul(std::mem::size_of::<T>()),
    })?;
    Ok(v)
}
