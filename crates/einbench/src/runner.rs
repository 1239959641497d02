//! Timing loop.
//!
//! Each repetition times the full pipeline: allocate a fresh random
//! operand, move it to the backend, contract it with itself `arity` times,
//! and for device backends wait on the synchronization barrier before the
//! clock stops. Device backends get one untimed warm-up iteration first.

use std::hint::black_box;
use std::time::{Duration, Instant};

use tracing::{debug, debug_span};

use crate::backend::{AcceleratedBackend, Backend, PrimaryCpuBackend, SecondaryCpuBackend};
use crate::case::{BackendKind, BenchmarkCase, BenchmarkResult};
use crate::config::HarnessConfig;
use crate::error::{BenchError, Result};

/// Source of monotonic time.
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Runs cases one at a time against a clock.
#[derive(Debug, Default)]
pub struct Runner<C = MonotonicClock> {
    clock: C,
}

impl Runner<MonotonicClock> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: Clock> Runner<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock }
    }

    /// Time `case` on `backend`.
    ///
    /// # Errors
    ///
    /// Configuration errors (bad case, backend mismatch, unsupported
    /// operation) are returned before anything runs. Any failure during
    /// warm-up or a repetition aborts the case without a result.
    pub fn run<B: Backend>(
        &mut self,
        case: &BenchmarkCase,
        backend: &mut B,
    ) -> Result<BenchmarkResult> {
        case.validate()?;
        if backend.kind() != case.backend {
            return Err(BenchError::InvalidCase {
                reason: format!(
                    "{}: case targets {} but backend is {}",
                    case.name,
                    case.backend,
                    backend.kind()
                ),
            });
        }
        if !backend.supports(case.operation) {
            return Err(BenchError::Unsupported {
                operation: case.operation.display_name(),
                backend: case.backend.label(),
            });
        }

        let _span = debug_span!(
            "case",
            name = %case.name,
            op = %case.operation,
            size = case.size
        )
        .entered();

        if case.backend.is_device_based() {
            iteration(case, backend)?;
            debug!("warm-up done");
        }

        let mut total = Duration::ZERO;
        for _ in 0..case.repetitions {
            let start = self.clock.now();
            iteration(case, backend)?;
            total += self.clock.now().saturating_sub(start);
        }

        let result = BenchmarkResult::new(case.clone(), total.as_secs_f64());
        debug!(mean_seconds = result.mean_seconds(), "case done");
        Ok(result)
    }
}

fn iteration<B: Backend>(case: &BenchmarkCase, backend: &mut B) -> Result<()> {
    let host = backend.allocate_random_tensor(case.size)?;
    let operand = backend.to_device(host)?;
    let operands = vec![&operand; case.operation.arity()];
    let output = backend.contract(case.operation, &operands)?;
    if case.backend.is_device_based() {
        backend.synchronize()?;
    }
    black_box(output);
    Ok(())
}

/// Time `case` on a freshly built backend of the kind it names.
pub fn run_case(case: &BenchmarkCase, config: &HarnessConfig) -> Result<BenchmarkResult> {
    case.validate()?;
    let mut runner = Runner::new();
    match case.backend {
        BackendKind::Accelerated => {
            let index = case.effective_device().unwrap_or(0);
            runner.run(case, &mut AcceleratedBackend::new(index))
        }
        BackendKind::CpuPrimary => runner.run(case, &mut PrimaryCpuBackend::new(config)?),
        BackendKind::CpuSecondary => runner.run(case, &mut SecondaryCpuBackend::new(config)?),
    }
}

/// Run `cases` in order, handing each result to `on_result` as it lands.
///
/// Stops at the first error; results already delivered stay delivered.
pub fn run_suite(
    cases: &[BenchmarkCase],
    config: &HarnessConfig,
    mut on_result: impl FnMut(&BenchmarkResult) -> Result<()>,
) -> Result<Vec<BenchmarkResult>> {
    let mut results = Vec::with_capacity(cases.len());
    for case in cases {
        let result = run_case(case, config)?;
        on_result(&result)?;
        results.push(result);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::Operation;
    use crate::tensor::DenseTensor;
    use approx::assert_relative_eq;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// Clock that only moves when the mock backend says so.
    #[derive(Clone, Default)]
    struct ManualClock(Rc<Cell<Duration>>);

    impl Clock for ManualClock {
        fn now(&self) -> Duration {
            self.0.get()
        }
    }

    /// Each contraction advances the clock by the next scripted latency.
    struct ScriptedBackend {
        kind: BackendKind,
        clock: ManualClock,
        latencies: VecDeque<u64>,
        calls: Rc<RefCell<Vec<&'static str>>>,
        fail_on: Option<usize>,
        contractions: usize,
    }

    impl ScriptedBackend {
        fn new(kind: BackendKind, clock: &ManualClock, latencies: &[u64]) -> Self {
            Self {
                kind,
                clock: clock.clone(),
                latencies: latencies.iter().copied().collect(),
                calls: Rc::default(),
                fail_on: None,
                contractions: 0,
            }
        }
    }

    impl Backend for ScriptedBackend {
        type Host = ();
        type Device = ();
        type Output = ();

        fn kind(&self) -> BackendKind {
            self.kind
        }

        fn allocate_random_tensor(&mut self, _n: usize) -> Result<()> {
            self.calls.borrow_mut().push("allocate");
            Ok(())
        }

        fn host_from_tensor(&mut self, _tensor: &DenseTensor<f32>) -> Result<()> {
            Ok(())
        }

        fn to_device(&mut self, _host: ()) -> Result<()> {
            self.calls.borrow_mut().push("to_device");
            Ok(())
        }

        fn contract(&mut self, _op: Operation, _operands: &[&()]) -> Result<()> {
            self.calls.borrow_mut().push("contract");
            self.contractions += 1;
            if self.fail_on == Some(self.contractions) {
                return Err(BenchError::Device {
                    reason: "launch failed".to_string(),
                });
            }
            let secs = self.latencies.pop_front().unwrap_or(0);
            let clock = &self.clock.0;
            clock.set(clock.get() + Duration::from_secs(secs));
            Ok(())
        }

        fn synchronize(&mut self) -> Result<()> {
            self.calls.borrow_mut().push("synchronize");
            Ok(())
        }

        fn to_host(&mut self, _output: &()) -> Result<DenseTensor<f32>> {
            DenseTensor::zeros(&[1])
        }
    }

    fn case(backend: BackendKind, reps: usize) -> BenchmarkCase {
        BenchmarkCase::new(Operation::PairwiseProduct, backend, 4, reps)
    }

    #[test]
    fn test_warm_up_is_excluded() {
        let clock = ManualClock::default();
        let mut backend = ScriptedBackend::new(BackendKind::Accelerated, &clock, &[10, 1, 1, 1]);
        let result = Runner::with_clock(clock)
            .run(&case(BackendKind::Accelerated, 3), &mut backend)
            .unwrap();

        assert_eq!(result.repetitions_completed(), 3);
        assert_relative_eq!(result.mean_seconds(), 1.0);
        assert_relative_eq!(result.total_seconds(), 3.0);
    }

    #[test]
    fn test_host_backend_has_no_warm_up() {
        let clock = ManualClock::default();
        let mut backend = ScriptedBackend::new(BackendKind::CpuPrimary, &clock, &[10, 1, 1]);
        let result = Runner::with_clock(clock)
            .run(&case(BackendKind::CpuPrimary, 3), &mut backend)
            .unwrap();

        assert_relative_eq!(result.mean_seconds(), 4.0);
        assert!(!backend.calls.borrow().contains(&"synchronize"));
    }

    #[test]
    fn test_device_iteration_order() {
        let clock = ManualClock::default();
        let mut backend = ScriptedBackend::new(BackendKind::Accelerated, &clock, &[]);
        Runner::with_clock(clock)
            .run(&case(BackendKind::Accelerated, 1), &mut backend)
            .unwrap();

        let one = ["allocate", "to_device", "contract", "synchronize"];
        let expected: Vec<_> = one.iter().chain(one.iter()).copied().collect();
        assert_eq!(*backend.calls.borrow(), expected);
    }

    #[test]
    fn test_configuration_errors_run_nothing() {
        let clock = ManualClock::default();
        let mut backend = ScriptedBackend::new(BackendKind::CpuSecondary, &clock, &[]);
        let mut runner = Runner::with_clock(clock);

        let mismatched = runner.run(&case(BackendKind::CpuPrimary, 2), &mut backend);
        assert!(mismatched.unwrap_err().is_configuration());

        let zero_reps = runner.run(&case(BackendKind::CpuSecondary, 0), &mut backend);
        assert!(zero_reps.unwrap_err().is_configuration());

        assert!(backend.calls.borrow().is_empty());
    }

    #[test]
    fn test_failure_mid_run_yields_no_result() {
        let clock = ManualClock::default();
        let mut backend = ScriptedBackend::new(BackendKind::CpuPrimary, &clock, &[1, 1, 1]);
        backend.fail_on = Some(2);
        let err = Runner::with_clock(clock)
            .run(&case(BackendKind::CpuPrimary, 3), &mut backend)
            .unwrap_err();
        assert!(matches!(err, BenchError::Device { .. }));
        assert_eq!(backend.contractions, 2);
    }

    #[test]
    fn test_run_case_cpu() {
        let config = HarnessConfig::default().with_threads(1);
        let case = BenchmarkCase::new(Operation::TripleStar, BackendKind::CpuSecondary, 8, 2);
        let result = run_case(&case, &config).unwrap();
        assert_eq!(result.repetitions_completed(), 2);
        assert!(result.mean_seconds() >= 0.0);
    }

    #[test]
    fn test_run_suite_stops_at_first_error() {
        let config = HarnessConfig::default().with_threads(1);
        let good = BenchmarkCase::new(Operation::PairwiseProduct, BackendKind::CpuPrimary, 4, 1);
        let bad = BenchmarkCase::new(Operation::PairwiseProduct, BackendKind::CpuPrimary, 0, 1);
        let mut seen = 0;
        let err = run_suite(&[good.clone(), bad, good], &config, |_| {
            seen += 1;
            Ok(())
        })
        .unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(seen, 1);
    }
}
