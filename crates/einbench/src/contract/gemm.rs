//! GEMM-based pairwise contraction using faer.

use std::borrow::Cow;

use faer::linalg::matmul::matmul;
use faer::{Accum, Par};

use crate::contract::faer_view::AsFaerMat;
use crate::contract::permute::permutedims;
use crate::contract::plan::ContractionPlan;
use crate::error::Result;
use crate::scalar::Scalar;
use crate::tensor::DenseTensor;

/// Contract two tensors by reshaping them to matrices and calling faer's
/// `matmul`.
///
/// Labels follow the usual convention: negative labels are summed over,
/// positive labels survive and the output axes are sorted by label value.
///
/// # Example
///
/// ```
/// use einbench::DenseTensor;
/// use einbench::contract::contract_gemm;
/// use faer::Par;
///
/// // C[i,k] = A[i,j] * B[j,k]
/// let a = DenseTensor::<f32>::ones(&[2, 3]).unwrap();
/// let b = DenseTensor::<f32>::ones(&[3, 4]).unwrap();
/// let c = contract_gemm(&a, &[1, -1], &b, &[-1, 2], Par::Seq).unwrap();
/// assert_eq!(c.shape(), &[2, 4]);
/// assert_eq!(c.get(&[1, 3]), Some(&3.0));
/// ```
pub fn contract_gemm<T: Scalar>(
    a: &DenseTensor<T>,
    labels_a: &[i32],
    b: &DenseTensor<T>,
    labels_b: &[i32],
    par: Par,
) -> Result<DenseTensor<T>> {
    let plan = ContractionPlan::new(labels_a, a.shape(), labels_b, b.shape())?;

    let a_work = permuted(a, plan.perm_a.as_deref())?;
    let b_work = permuted(b, plan.perm_b.as_deref())?;

    let mut c = DenseTensor::<T>::zeros(&plan.gemm_shape)?;
    matmul_into(&mut c, &a_work, &b_work, plan.m, plan.k, plan.n, par);

    match plan.perm_c.as_deref() {
        Some(perm) => permutedims(&c, perm),
        None => Ok(c),
    }
}

/// `c(m, n) = a(m, k) * b(k, n)` on flat column-major storage.
pub(crate) fn matmul_into<T: Scalar>(
    c: &mut DenseTensor<T>,
    a: &DenseTensor<T>,
    b: &DenseTensor<T>,
    m: usize,
    k: usize,
    n: usize,
    par: Par,
) {
    let a_mat = a.as_faer_mat(m, k);
    let b_mat = b.as_faer_mat(k, n);
    matmul(
        c.as_faer_mat_mut(m, n),
        Accum::Replace,
        a_mat,
        b_mat,
        T::one(),
        par,
    );
}

fn permuted<'a, T: Scalar>(
    t: &'a DenseTensor<T>,
    perm: Option<&[usize]>,
) -> Result<Cow<'a, DenseTensor<T>>> {
    Ok(match perm {
        Some(p) => Cow::Owned(permutedims(t, p)?),
        None => Cow::Borrowed(t),
    })
}
