//! Dimension permutation for dense tensors.

use crate::error::{BenchError, Result};
use crate::scalar::Scalar;
use crate::tensor::{DenseTensor, advance_index, linear_offset, try_alloc};

/// Permute the dimensions of a tensor into a new tensor.
///
/// `perm[i]` is the source dimension that becomes dimension `i` of the
/// result.
///
/// # Errors
///
/// Returns `BenchError::InvalidPermutation` if `perm` is not a permutation
/// of `0..ndim`.
///
/// # Examples
///
/// ```
/// use einbench::DenseTensor;
/// use einbench::contract::permutedims;
///
/// let t = DenseTensor::from_vec(vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
/// let tt = permutedims(&t, &[1, 0]).unwrap();
/// assert_eq!(tt.shape(), &[3, 2]);
/// assert_eq!(t.get(&[1, 2]), tt.get(&[2, 1]));
/// ```
pub fn permutedims<T: Scalar>(tensor: &DenseTensor<T>, perm: &[usize]) -> Result<DenseTensor<T>> {
    validate_permutation(perm, tensor.ndim())?;

    let shape: Vec<usize> = perm.iter().map(|&p| tensor.shape()[p]).collect();
    // Source stride seen from each destination axis.
    let src_strides: Vec<usize> = perm.iter().map(|&p| tensor.strides()[p]).collect();

    let mut data = try_alloc::<T>(tensor.len())?;
    let mut index = vec![0usize; shape.len()];
    for _ in 0..tensor.len() {
        data.push(tensor.data()[linear_offset(&index, &src_strides)]);
        advance_index(&mut index, &shape);
    }
    DenseTensor::from_vec(data, &shape)
}

pub(crate) fn is_identity(perm: &[usize]) -> bool {
    perm.iter().enumerate().all(|(i, &p)| i == p)
}

fn validate_permutation(perm: &[usize], ndim: usize) -> Result<()> {
    let invalid = || BenchError::InvalidPermutation {
        perm: perm.to_vec(),
        ndim,
    };
    if perm.len() != ndim {
        return Err(invalid());
    }
    let mut seen = vec![false; ndim];
    for &p in perm {
        if p >= ndim || seen[p] {
            return Err(invalid());
        }
        seen[p] = true;
    }
    Ok(())
}
