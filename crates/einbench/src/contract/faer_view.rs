//! Zero-copy faer matrix views over dense tensors.
//!
//! Both sides are column-major, so any tensor can be viewed as a
//! `rows x cols` matrix as long as the element counts agree.

use faer::{MatMut, MatRef};

use crate::scalar::Scalar;
use crate::tensor::DenseTensor;

/// View a tensor's storage as a faer matrix.
pub trait AsFaerMat<T: Scalar> {
    /// Immutable `rows x cols` view.
    ///
    /// # Panics
    ///
    /// Panics if `rows * cols` differs from the tensor length.
    fn as_faer_mat(&self, rows: usize, cols: usize) -> MatRef<'_, T>;

    /// Mutable `rows x cols` view.
    ///
    /// # Panics
    ///
    /// Panics if `rows * cols` differs from the tensor length.
    fn as_faer_mat_mut(&mut self, rows: usize, cols: usize) -> MatMut<'_, T>;
}

impl<T: Scalar> AsFaerMat<T> for DenseTensor<T> {
    fn as_faer_mat(&self, rows: usize, cols: usize) -> MatRef<'_, T> {
        assert!(
            rows.checked_mul(cols) == Some(self.len()),
            "matrix view {rows}x{cols} does not cover tensor of {} elements",
            self.len()
        );
        MatRef::from_column_major_slice(self.data(), rows, cols)
    }

    fn as_faer_mat_mut(&mut self, rows: usize, cols: usize) -> MatMut<'_, T> {
        assert!(
            rows.checked_mul(cols) == Some(self.len()),
            "matrix view {rows}x{cols} does not cover tensor of {} elements",
            self.len()
        );
        MatMut::from_column_major_slice_mut(self.data_mut(), rows, cols)
    }
}
