//! Tensor contractions on [`DenseTensor`](crate::DenseTensor).
//!
//! Pairwise contractions use integer labels:
//! - negative labels are contracted (summed over)
//! - positive labels are free and appear in the output, sorted by value
//!
//! # Implementations
//!
//! - `gemm`: permute, reshape to matrices, one faer `matmul` (fast path)
//! - `naive`: direct summation loops (reference)
//! - `star`: the three-operand `ji,kl,li->jkl` contraction built on `gemm`
//!
//! # Example
//!
//! ```
//! use einbench::DenseTensor;
//! use einbench::contract::{contract_gemm, contract_naive};
//! use faer::Par;
//!
//! // C[i,k] = A[i,j] * B[j,k]
//! let a = DenseTensor::<f64>::ones(&[2, 3]).unwrap();
//! let b = DenseTensor::<f64>::ones(&[3, 4]).unwrap();
//! let fast = contract_gemm(&a, &[1, -1], &b, &[-1, 2], Par::Seq).unwrap();
//! let slow = contract_naive(&a, &[1, -1], &b, &[-1, 2]).unwrap();
//! assert_eq!(fast, slow);
//! ```

mod faer_view;
mod gemm;
mod naive;
mod permute;
mod plan;
mod star;

pub use faer_view::AsFaerMat;
pub use gemm::contract_gemm;
pub use naive::{contract_naive, star_naive};
pub use permute::permutedims;
pub use plan::ContractionPlan;
pub use star::star_contract;
