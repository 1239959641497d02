//! The contractions the harness knows how to time.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BenchError;

/// An einsum-style contraction over `N x N` operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// `ij,jk->ik`
    PairwiseProduct,
    /// `ji,kl,li->jkl`, summed over `i` only.
    TripleStar,
}

impl Operation {
    /// All operations, in report order.
    pub const ALL: [Operation; 2] = [Operation::PairwiseProduct, Operation::TripleStar];

    /// Number of input operands.
    pub fn arity(self) -> usize {
        match self {
            Self::PairwiseProduct => 2,
            Self::TripleStar => 3,
        }
    }

    /// Name printed in report lines.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::PairwiseProduct => "Matmul",
            Self::TripleStar => "Star",
        }
    }

    /// The einsum pattern every backend implements for this operation.
    pub fn index_pattern(self) -> &'static str {
        match self {
            Self::PairwiseProduct => "ij,jk->ik",
            Self::TripleStar => "ji,kl,li->jkl",
        }
    }

    /// Shape of the result for operands of side `n`.
    pub fn output_shape(self, n: usize) -> Vec<usize> {
        match self {
            Self::PairwiseProduct => vec![n, n],
            Self::TripleStar => vec![n, n, n],
        }
    }

    /// Repetitions used when the caller does not choose.
    pub fn default_repetitions(self) -> usize {
        match self {
            Self::PairwiseProduct => 10_000,
            Self::TripleStar => 100,
        }
    }

    /// Floating point operations performed for side `n`.
    ///
    /// The star count is the GEMM over `i` plus one multiply per output
    /// element.
    pub fn flop_count(self, n: usize) -> f64 {
        let n = n as f64;
        match self {
            Self::PairwiseProduct => 2.0 * n * n * n,
            Self::TripleStar => 3.0 * n * n * n,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Operation {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "matmul" | "pairwise" | "pairwise-product" => Ok(Self::PairwiseProduct),
            "star" | "triple-star" | "triple-star-contraction" => Ok(Self::TripleStar),
            other => Err(BenchError::Config {
                reason: format!("unknown operation '{other}' (expected matmul or star)"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_matches_pattern() {
        for op in Operation::ALL {
            let (inputs, output) = op.index_pattern().split_once("->").unwrap();
            assert_eq!(inputs.split(',').count(), op.arity());
            assert_eq!(output.len(), op.output_shape(4).len());
        }
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("Matmul".parse::<Operation>().unwrap(), Operation::PairwiseProduct);
        assert_eq!(" pairwise ".parse::<Operation>().unwrap(), Operation::PairwiseProduct);
        assert_eq!("STAR".parse::<Operation>().unwrap(), Operation::TripleStar);
        assert_eq!(
            "triple-star-contraction".parse::<Operation>().unwrap(),
            Operation::TripleStar
        );
        let err = "conv".parse::<Operation>().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_flop_count() {
        assert_eq!(Operation::PairwiseProduct.flop_count(10), 2000.0);
        assert_eq!(Operation::TripleStar.flop_count(10), 3000.0);
    }

    #[test]
    fn test_display() {
        assert_eq!(Operation::TripleStar.to_string(), "Star");
    }
}
