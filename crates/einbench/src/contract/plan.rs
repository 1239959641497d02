//! Reduction of a labelled pairwise contraction to a single GEMM.
//!
//! For `C = A * B` the plan reorders A to `[free..., contracted...]` and B
//! to `[contracted..., free...]`, so the contraction becomes
//! `C(m, n) = A(m, k) * B(k, n)`. The GEMM output has A's free axes followed
//! by B's; a final permutation sorts them by label value.

use crate::contract::permute::is_identity;
use crate::error::{BenchError, Result};
use crate::tensor::checked_product;

/// Everything needed to run one labelled contraction as a GEMM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractionPlan {
    /// Contracted axis pairs `(axis in A, axis in B)`.
    pub contracted: Vec<(usize, usize)>,
    /// Free axes of A, in A's order.
    pub free_a: Vec<usize>,
    /// Free axes of B, in B's order.
    pub free_b: Vec<usize>,
    /// Permutation bringing A to `[free..., contracted...]`, if not identity.
    pub perm_a: Option<Vec<usize>>,
    /// Permutation bringing B to `[contracted..., free...]`, if not identity.
    pub perm_b: Option<Vec<usize>>,
    /// Permutation sorting the GEMM output by label, if not identity.
    pub perm_c: Option<Vec<usize>>,
    /// GEMM rows: product of A's free dimensions.
    pub m: usize,
    /// GEMM inner size: product of contracted dimensions.
    pub k: usize,
    /// GEMM columns: product of B's free dimensions.
    pub n: usize,
    /// Shape of the GEMM output before `perm_c`.
    pub gemm_shape: Vec<usize>,
    /// Shape of the final output.
    pub output_shape: Vec<usize>,
}

impl ContractionPlan {
    /// Analyze labels and shapes.
    ///
    /// Negative labels must appear exactly once in each operand and are
    /// summed over; positive labels are free and must be unique.
    ///
    /// ```
    /// use einbench::contract::ContractionPlan;
    ///
    /// // C[i,k] = A[i,j] * B[j,k]
    /// let plan = ContractionPlan::new(&[1, -1], &[2, 3], &[-1, 2], &[3, 4]).unwrap();
    /// assert_eq!((plan.m, plan.k, plan.n), (2, 3, 4));
    /// assert!(plan.perm_a.is_none() && plan.perm_b.is_none());
    /// ```
    pub fn new(
        labels_a: &[i32],
        shape_a: &[usize],
        labels_b: &[i32],
        shape_b: &[usize],
    ) -> Result<Self> {
        check_arity(labels_a, shape_a)?;
        check_arity(labels_b, shape_b)?;
        check_unique(labels_a)?;
        check_unique(labels_b)?;

        let mut contracted = Vec::new();
        for (i, &la) in labels_a.iter().enumerate().filter(|(_, l)| **l < 0) {
            let j = labels_b
                .iter()
                .position(|&lb| lb == la)
                .ok_or_else(|| BenchError::InvalidLabels {
                    reason: format!("contracted label {la} missing from second operand"),
                })?;
            if shape_a[i] != shape_b[j] {
                return Err(BenchError::ShapeMismatch {
                    expected: shape_a[i],
                    actual: shape_b[j],
                });
            }
            contracted.push((i, j));
        }
        if let Some(&lb) = labels_b
            .iter()
            .find(|&&lb| lb < 0 && !labels_a.contains(&lb))
        {
            return Err(BenchError::InvalidLabels {
                reason: format!("contracted label {lb} missing from first operand"),
            });
        }

        let free_a: Vec<usize> = (0..labels_a.len()).filter(|&i| labels_a[i] > 0).collect();
        let free_b: Vec<usize> = (0..labels_b.len()).filter(|&j| labels_b[j] > 0).collect();
        if let Some(&i) = free_a.iter().find(|&&i| labels_b.contains(&labels_a[i])) {
            return Err(BenchError::InvalidLabels {
                reason: format!("free label {} appears in both operands", labels_a[i]),
            });
        }

        let perm_a: Vec<usize> = free_a
            .iter()
            .copied()
            .chain(contracted.iter().map(|&(i, _)| i))
            .collect();
        let perm_b: Vec<usize> = contracted
            .iter()
            .map(|&(_, j)| j)
            .chain(free_b.iter().copied())
            .collect();

        let out_labels: Vec<i32> = free_a
            .iter()
            .map(|&i| labels_a[i])
            .chain(free_b.iter().map(|&j| labels_b[j]))
            .collect();
        let mut perm_c: Vec<usize> = (0..out_labels.len()).collect();
        perm_c.sort_by_key(|&p| out_labels[p]);

        let gemm_shape: Vec<usize> = free_a
            .iter()
            .map(|&i| shape_a[i])
            .chain(free_b.iter().map(|&j| shape_b[j]))
            .collect();
        let output_shape: Vec<usize> = perm_c.iter().map(|&p| gemm_shape[p]).collect();

        Ok(Self {
            m: checked_product(free_a.iter().map(|&i| shape_a[i]))?,
            k: checked_product(contracted.iter().map(|&(i, _)| shape_a[i]))?,
            n: checked_product(free_b.iter().map(|&j| shape_b[j]))?,
            perm_a: (!is_identity(&perm_a)).then_some(perm_a),
            perm_b: (!is_identity(&perm_b)).then_some(perm_b),
            perm_c: (!is_identity(&perm_c)).then_some(perm_c),
            contracted,
            free_a,
            free_b,
            gemm_shape,
            output_shape,
        })
    }
}

fn check_arity(labels: &[i32], shape: &[usize]) -> Result<()> {
    if labels.len() != shape.len() {
        return Err(BenchError::WrongNumberOfIndices {
            expected: shape.len(),
            actual: labels.len(),
        });
    }
    if labels.contains(&0) {
        return Err(BenchError::InvalidLabels {
            reason: "label 0 is reserved".into(),
        });
    }
    Ok(())
}

fn check_unique(labels: &[i32]) -> Result<()> {
    for (i, l) in labels.iter().enumerate() {
        if labels[..i].contains(l) {
            return Err(BenchError::InvalidLabels {
                reason: format!("label {l} repeated within one operand"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matmul_plan() {
        let plan = ContractionPlan::new(&[1, -1], &[2, 3], &[-1, 2], &[3, 4]).unwrap();
        assert_eq!(plan.contracted, vec![(1, 0)]);
        assert_eq!(plan.output_shape, vec![2, 4]);
        assert!(plan.perm_c.is_none());
    }

    #[test]
    fn test_transposed_operand_plan() {
        // D[j,l] = A[j,i] * C[l,i]: C has to be brought to [i, l].
        let plan = ContractionPlan::new(&[1, -1], &[5, 7], &[2, -1], &[6, 7]).unwrap();
        assert_eq!((plan.m, plan.k, plan.n), (5, 7, 6));
        assert!(plan.perm_a.is_none());
        assert_eq!(plan.perm_b, Some(vec![1, 0]));
        assert_eq!(plan.output_shape, vec![5, 6]);
    }

    #[test]
    fn test_output_sorted_by_label() {
        // C[k,i] from A[2,-1] B[-1,1]: GEMM gives [A free, B free] = labels [2, 1].
        let plan = ContractionPlan::new(&[2, -1], &[3, 4], &[-1, 1], &[4, 5]).unwrap();
        assert_eq!(plan.gemm_shape, vec![3, 5]);
        assert_eq!(plan.perm_c, Some(vec![1, 0]));
        assert_eq!(plan.output_shape, vec![5, 3]);
    }

    #[test]
    fn test_full_contraction() {
        let plan = ContractionPlan::new(&[-1], &[3], &[-1], &[3]).unwrap();
        assert!(plan.free_a.is_empty() && plan.free_b.is_empty());
        assert_eq!((plan.m, plan.k, plan.n), (1, 3, 1));
    }

    #[test]
    fn test_invalid_labels() {
        assert!(matches!(
            ContractionPlan::new(&[1, -1], &[2, 3], &[-2, 2], &[3, 4]),
            Err(BenchError::InvalidLabels { .. })
        ));
        assert!(matches!(
            ContractionPlan::new(&[1, -1], &[2, 3], &[-1, 1], &[3, 4]),
            Err(BenchError::InvalidLabels { .. })
        ));
        assert!(matches!(
            ContractionPlan::new(&[1, -1], &[2, 3], &[-1, 2], &[4, 4]),
            Err(BenchError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            ContractionPlan::new(&[1], &[2, 3], &[-1, 2], &[3, 4]),
            Err(BenchError::WrongNumberOfIndices { .. })
        ));
    }

    #[test]
    fn test_overflowing_free_dimensions() {
        let huge = 1usize << 32;
        assert!(matches!(
            ContractionPlan::new(&[1, 2, -1], &[huge, huge, 1], &[-1, 3], &[1, 2]),
            Err(BenchError::Allocation { .. })
        ));
    }
}
