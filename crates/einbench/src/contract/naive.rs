//! Loop-based reference contractions.
//!
//! Slow and obviously correct; the GEMM path and every backend adapter are
//! checked against these.

use crate::contract::plan::ContractionPlan;
use crate::error::{BenchError, Result};
use crate::scalar::Scalar;
use crate::tensor::{DenseTensor, advance_index, linear_offset};

/// Label-based pairwise contraction by direct summation.
///
/// Same conventions and output layout as [`contract_gemm`](super::contract_gemm).
pub fn contract_naive<T: Scalar>(
    a: &DenseTensor<T>,
    labels_a: &[i32],
    b: &DenseTensor<T>,
    labels_b: &[i32],
) -> Result<DenseTensor<T>> {
    let plan = ContractionPlan::new(labels_a, a.shape(), labels_b, b.shape())?;

    // Position of each GEMM-order output axis in the final output.
    let mut out_pos = vec![0usize; plan.gemm_shape.len()];
    match &plan.perm_c {
        Some(perm) => {
            for (pos, &src) in perm.iter().enumerate() {
                out_pos[src] = pos;
            }
        }
        None => out_pos.iter_mut().enumerate().for_each(|(i, p)| *p = i),
    }

    let sum_shape: Vec<usize> = plan.contracted.iter().map(|&(i, _)| a.shape()[i]).collect();
    let sum_len: usize = sum_shape.iter().product();

    let mut out = DenseTensor::<T>::zeros(&plan.output_shape)?;
    let mut out_index = vec![0usize; plan.output_shape.len()];
    let mut a_index = vec![0usize; a.ndim()];
    let mut b_index = vec![0usize; b.ndim()];

    for o in 0..out.len() {
        for (g, &ax) in plan.free_a.iter().enumerate() {
            a_index[ax] = out_index[out_pos[g]];
        }
        for (g, &ax) in plan.free_b.iter().enumerate() {
            b_index[ax] = out_index[out_pos[plan.free_a.len() + g]];
        }

        let mut acc = T::zero();
        let mut sum_index = vec![0usize; sum_shape.len()];
        for _ in 0..sum_len {
            for (s, &(ia, ib)) in plan.contracted.iter().enumerate() {
                a_index[ia] = sum_index[s];
                b_index[ib] = sum_index[s];
            }
            acc = acc
                + a.data()[linear_offset(&a_index, a.strides())]
                    * b.data()[linear_offset(&b_index, b.strides())];
            advance_index(&mut sum_index, &sum_shape);
        }
        out.data_mut()[o] = acc;
        advance_index(&mut out_index, &plan.output_shape);
    }
    Ok(out)
}

/// Reference star contraction `ji,kl,li->jkl`:
/// `z[j,k,l] = sum_i a[j,i] * b[k,l] * c[l,i]`.
///
/// All operands must be `n x n`. O(n^4); meant for small test sizes.
pub fn star_naive<T: Scalar>(
    a: &DenseTensor<T>,
    b: &DenseTensor<T>,
    c: &DenseTensor<T>,
) -> Result<DenseTensor<T>> {
    let n = square_side(a)?;
    for t in [b, c] {
        if square_side(t)? != n {
            return Err(BenchError::ShapeMismatch {
                expected: n,
                actual: t.shape()[0],
            });
        }
    }
    DenseTensor::from_fn(&[n, n, n], |ix| {
        let (j, k, l) = (ix[0], ix[1], ix[2]);
        let mut acc = T::zero();
        for i in 0..n {
            acc = acc + at(a, j, i) * at(b, k, l) * at(c, l, i);
        }
        acc
    })
}

#[inline]
fn at<T: Scalar>(t: &DenseTensor<T>, r: usize, c: usize) -> T {
    t.data()[r * t.strides()[0] + c * t.strides()[1]]
}

/// Side length of a square rank-2 tensor.
pub(crate) fn square_side<T: Scalar>(t: &DenseTensor<T>) -> Result<usize> {
    match t.shape() {
        &[r, c] if r == c => Ok(r),
        &[r, c] => Err(BenchError::ShapeMismatch {
            expected: r,
            actual: c,
        }),
        other => Err(BenchError::WrongNumberOfIndices {
            expected: 2,
            actual: other.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_matrix_multiply() {
        let a = DenseTensor::from_vec(vec![1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
        let b = DenseTensor::from_vec((1..=12).map(|x| x as f64).collect(), &[3, 4]).unwrap();

        let c = contract_naive(&a, &[1, -1], &b, &[-1, 2]).unwrap();
        assert_eq!(c.shape(), &[2, 4]);
        // C[0,0] = 1*1 + 3*2 + 5*3
        assert_relative_eq!(*c.get(&[0, 0]).unwrap(), 22.0);
        // C[1,3] = 2*10 + 4*11 + 6*12
        assert_relative_eq!(*c.get(&[1, 3]).unwrap(), 136.0);
    }

    #[test]
    fn test_outer_product() {
        let a = DenseTensor::from_vec(vec![1.0f64, 2.0], &[2]).unwrap();
        let b = DenseTensor::from_vec(vec![3.0f64, 4.0, 5.0], &[3]).unwrap();

        let c = contract_naive(&a, &[1], &b, &[2]).unwrap();
        assert_eq!(c.shape(), &[2, 3]);
        assert_relative_eq!(*c.get(&[1, 2]).unwrap(), 10.0);
    }

    #[test]
    fn test_output_sorted_by_label() {
        let a = DenseTensor::from_vec(vec![1.0f64, 2.0], &[2]).unwrap();
        let b = DenseTensor::from_vec(vec![3.0f64, 4.0, 5.0], &[3]).unwrap();

        // A carries label 2, B label 1: output axes are [B, A].
        let c = contract_naive(&a, &[2], &b, &[1]).unwrap();
        assert_eq!(c.shape(), &[3, 2]);
        assert_relative_eq!(*c.get(&[2, 1]).unwrap(), 10.0);
    }

    #[test]
    fn test_star_small() {
        // n = 2, all-ones except b[1,0] = 3.
        let a = DenseTensor::<f64>::ones(&[2, 2]).unwrap();
        let mut b = DenseTensor::<f64>::ones(&[2, 2]).unwrap();
        b.set(&[1, 0], 3.0).unwrap();
        let c = DenseTensor::<f64>::ones(&[2, 2]).unwrap();

        let z = star_naive(&a, &b, &c).unwrap();
        assert_eq!(z.shape(), &[2, 2, 2]);
        // sum over i of 1 * b[k,l] * 1 = 2 * b[k,l]
        assert_relative_eq!(*z.get(&[0, 1, 0]).unwrap(), 6.0);
        assert_relative_eq!(*z.get(&[1, 0, 1]).unwrap(), 2.0);
    }

    #[test]
    fn test_star_rejects_non_square() {
        let a = DenseTensor::<f32>::ones(&[2, 3]).unwrap();
        let b = DenseTensor::<f32>::ones(&[2, 2]).unwrap();
        assert!(star_naive(&a, &b, &b).is_err());
        assert!(star_naive(&b, &b, &DenseTensor::<f32>::ones(&[3, 3]).unwrap()).is_err());
    }
}
