//! Cross-backend agreement checks.
//!
//! Every backend receives the same seeded operands; its output is compared
//! against the faer GEMM path on the host.

use faer::Par;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::debug;

use crate::backend::{
    AcceleratedBackend, Backend, PrimaryCpuBackend, SecondaryCpuBackend, arity_mismatch,
};
use crate::case::{BackendKind, BenchmarkCase};
use crate::config::HarnessConfig;
use crate::contract::{contract_gemm, star_contract};
use crate::error::{BenchError, Result};
use crate::ops::Operation;
use crate::tensor::DenseTensor;

/// Relative error accepted between `f32` backends.
pub const DEFAULT_TOLERANCE: f64 = 1e-3;

/// `arity` seeded uniform `n x n` operands.
pub fn seeded_operands(op: Operation, n: usize, seed: u64) -> Result<Vec<DenseTensor<f32>>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..op.arity())
        .map(|_| DenseTensor::random_with_rng(&[n, n], &mut rng))
        .collect()
}

/// Host reference result for `op` on `operands`.
pub fn reference(op: Operation, operands: &[DenseTensor<f32>]) -> Result<DenseTensor<f32>> {
    match (op, operands) {
        (Operation::PairwiseProduct, [a, b]) => contract_gemm(a, &[1, -1], b, &[-1, 2], Par::Seq),
        (Operation::TripleStar, [a, b, c]) => star_contract(a, b, c, Par::Seq),
        _ => Err(arity_mismatch(op, operands.len())),
    }
}

/// Run `op` on `backend` with `operands` and return its output on the host.
pub fn evaluate<B: Backend>(
    backend: &mut B,
    op: Operation,
    operands: &[DenseTensor<f32>],
) -> Result<DenseTensor<f32>> {
    let on_device = operands
        .iter()
        .map(|t| {
            let host = backend.host_from_tensor(t)?;
            backend.to_device(host)
        })
        .collect::<Result<Vec<_>>>()?;
    let refs: Vec<_> = on_device.iter().collect();
    let output = backend.contract(op, &refs)?;
    backend.synchronize()?;
    backend.to_host(&output)
}

/// Maximum relative error of `backend` against the host reference.
pub fn cross_check<B: Backend>(backend: &mut B, op: Operation, n: usize, seed: u64) -> Result<f64> {
    let operands = seeded_operands(op, n, seed)?;
    let want = reference(op, &operands)?;
    let got = evaluate(backend, op, &operands)?;
    check_output_shape(op, n, &want)?;
    check_output_shape(op, n, &got)?;
    got.max_relative_error(&want)
        .ok_or_else(|| BenchError::ShapeMismatch {
            expected: want.len(),
            actual: got.len(),
        })
}

/// Fail unless `output` has the shape `op` produces for side `n`.
fn check_output_shape(op: Operation, n: usize, output: &DenseTensor<f32>) -> Result<()> {
    let expected = op.output_shape(n);
    if output.shape() == expected.as_slice() {
        return Ok(());
    }
    if output.ndim() != expected.len() {
        return Err(BenchError::WrongNumberOfIndices {
            expected: expected.len(),
            actual: output.ndim(),
        });
    }
    Err(BenchError::ShapeMismatch {
        expected: expected.iter().product(),
        actual: output.len(),
    })
}

/// Cross-check the backend `case` names at the case's size.
///
/// # Errors
///
/// `Verification` if the error exceeds `tolerance`; otherwise whatever the
/// backend raises.
pub fn verify_case(case: &BenchmarkCase, config: &HarnessConfig, tolerance: f64) -> Result<f64> {
    case.validate()?;
    let (op, n, seed) = (case.operation, case.size, 0x5eed);
    let error = match case.backend {
        BackendKind::Accelerated => {
            let index = case.effective_device().unwrap_or(0);
            cross_check(&mut AcceleratedBackend::new(index), op, n, seed)?
        }
        BackendKind::CpuPrimary => cross_check(&mut PrimaryCpuBackend::new(config)?, op, n, seed)?,
        BackendKind::CpuSecondary => {
            cross_check(&mut SecondaryCpuBackend::new(config)?, op, n, seed)?
        }
    };
    debug!(name = %case.name, error, "verified");
    if error > tolerance {
        return Err(BenchError::Verification {
            name: case.name.clone(),
            error,
            tolerance,
        });
    }
    Ok(error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operands_are_reproducible() {
        let x = seeded_operands(Operation::TripleStar, 5, 42).unwrap();
        let y = seeded_operands(Operation::TripleStar, 5, 42).unwrap();
        assert_eq!(x.len(), 3);
        assert_eq!(x, y);
        assert_ne!(x[0], x[1]);
    }

    #[test]
    fn test_reference_rejects_wrong_arity() {
        let x = seeded_operands(Operation::PairwiseProduct, 3, 1).unwrap();
        assert!(reference(Operation::TripleStar, &x).is_err());
    }

    #[test]
    fn test_output_shape_is_checked() {
        let matrix = DenseTensor::<f32>::zeros(&[4, 4]).unwrap();
        assert!(check_output_shape(Operation::PairwiseProduct, 4, &matrix).is_ok());
        assert!(matches!(
            check_output_shape(Operation::TripleStar, 4, &matrix),
            Err(BenchError::WrongNumberOfIndices {
                expected: 3,
                actual: 2
            })
        ));
        assert!(matches!(
            check_output_shape(Operation::PairwiseProduct, 5, &matrix),
            Err(BenchError::ShapeMismatch {
                expected: 25,
                actual: 16
            })
        ));
    }

    #[test]
    fn test_cpu_backends_pass() {
        let config = HarnessConfig::default().with_threads(2);
        for backend in [BackendKind::CpuPrimary, BackendKind::CpuSecondary] {
            for op in Operation::ALL {
                let case = BenchmarkCase::new(op, backend, 16, 1);
                let error = verify_case(&case, &config, DEFAULT_TOLERANCE).unwrap();
                assert!(error < DEFAULT_TOLERANCE, "{backend} {op}: {error}");
            }
        }
    }

    #[test]
    fn test_exceeding_tolerance_is_an_error() {
        let config = HarnessConfig::default().with_threads(1);
        let case = BenchmarkCase::new(Operation::PairwiseProduct, BackendKind::CpuSecondary, 64, 1);
        match verify_case(&case, &config, -1.0) {
            Err(BenchError::Verification { tolerance, .. }) => assert_eq!(tolerance, -1.0),
            other => panic!("expected verification failure, got {other:?}"),
        }
    }
}
