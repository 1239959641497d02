//! Three-operand star contraction `ji,kl,li->jkl`.
//!
//! `z[j,k,l] = sum_i a[j,i] * b[k,l] * c[l,i]`
//!
//! Only `i` is summed and it touches `a` and `c` alone, so the contraction
//! splits into a GEMM `d[j,l] = sum_i a[j,i] * c[l,i]` followed by the
//! broadcast product `z[j,k,l] = d[j,l] * b[k,l]`.

use faer::Par;
use rayon::prelude::*;

use crate::contract::gemm::contract_gemm;
use crate::contract::naive::square_side;
use crate::error::{BenchError, Result};
use crate::scalar::Scalar;
use crate::tensor::DenseTensor;

/// Star contraction of three `n x n` tensors into an `n x n x n` tensor.
///
/// With a parallel `par` the broadcast step is split across the current
/// rayon pool, one `l` slab per task.
///
/// ```
/// use einbench::DenseTensor;
/// use einbench::contract::star_contract;
/// use faer::Par;
///
/// let x = DenseTensor::<f32>::ones(&[3, 3]).unwrap();
/// let z = star_contract(&x, &x, &x, Par::Seq).unwrap();
/// assert_eq!(z.shape(), &[3, 3, 3]);
/// assert_eq!(z.get(&[2, 1, 0]), Some(&3.0));
/// ```
pub fn star_contract<T: Scalar + Send + Sync>(
    a: &DenseTensor<T>,
    b: &DenseTensor<T>,
    c: &DenseTensor<T>,
    par: Par,
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

    // d[j,l] = a[j,-i] c[l,-i]
    let d = contract_gemm(a, &[1, -1], c, &[2, -1], par)?;

    let mut z = DenseTensor::<T>::zeros(&[n, n, n])?;
    let (d, b) = (d.data(), b.data());
    let slab = |(l, out): (usize, &mut [T])| {
        let d_col = &d[l * n..(l + 1) * n];
        for (k, dst) in out.chunks_exact_mut(n).enumerate() {
            let bkl = b[k + l * n];
            for (v, &djl) in dst.iter_mut().zip(d_col) {
                *v = djl * bkl;
            }
        }
    };
    if n > 0 {
        match par {
            Par::Seq => z.data_mut().chunks_exact_mut(n * n).enumerate().for_each(slab),
            _ => z
                .data_mut()
                .par_chunks_exact_mut(n * n)
                .enumerate()
                .for_each(slab),
        }
    }
    Ok(z)
}
