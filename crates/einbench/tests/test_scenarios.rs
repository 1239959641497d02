//! End-to-end failure scenarios.

use einbench::{BackendKind, BenchError, BenchmarkCase, HarnessConfig, Operation, run_suite};

#[test]
fn test_missing_accelerator_yields_no_result() {
    // No machine has this many devices.
    let case = BenchmarkCase::new(Operation::PairwiseProduct, BackendKind::Accelerated, 100, 5)
        .on_device(4096);
    let mut delivered = 0;
    let err = run_suite(&[case], &HarnessConfig::default(), |_| {
        delivered += 1;
        Ok(())
    })
    .unwrap_err();

    assert!(
        matches!(err, BenchError::DeviceUnavailable { index: 4096, .. }),
        "{err}"
    );
    assert_eq!(delivered, 0);
}

#[cfg(not(feature = "cuda"))]
#[test]
fn test_default_device_unavailable_without_cuda() {
    let case = BenchmarkCase::new(Operation::TripleStar, BackendKind::Accelerated, 8, 1);
    let err = einbench::run_case(&case, &HarnessConfig::default()).unwrap_err();
    assert!(matches!(err, BenchError::DeviceUnavailable { index: 0, .. }));
    assert!(!err.is_configuration());
}

#[test]
fn test_error_stops_suite() {
    let config = HarnessConfig::default().with_threads(1);
    let ok = BenchmarkCase::new(Operation::PairwiseProduct, BackendKind::CpuSecondary, 4, 1);
    let gpu = BenchmarkCase::new(Operation::PairwiseProduct, BackendKind::Accelerated, 4, 1)
        .on_device(4096);
    let mut names = Vec::new();
    let result = run_suite(&[ok.clone(), gpu, ok], &config, |r| {
        names.push(r.case().name.clone());
        Ok(())
    });

    assert!(result.is_err());
    assert_eq!(names, ["NPCPU"]);
}

#[test]
fn test_oversized_case_is_an_allocation_error() {
    let config = HarnessConfig::default().with_threads(1);
    for backend in [BackendKind::CpuPrimary, BackendKind::CpuSecondary] {
        // N * N overflows usize.
        let case = BenchmarkCase::new(Operation::PairwiseProduct, backend, 1 << 32, 1);
        let err = einbench::run_case(&case, &config).unwrap_err();
        assert!(
            matches!(err, BenchError::Allocation { .. }),
            "{backend}: {err}"
        );
    }
}
