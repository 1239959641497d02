//! Benchmark cases and their results.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BenchError, Result};
use crate::ops::Operation;

/// Which compute library executes a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// CUDA device.
    Accelerated,
    /// Dense tensors with faer GEMM.
    CpuPrimary,
    /// ndarray.
    CpuSecondary,
}

impl BackendKind {
    /// All backends, in report order.
    pub const ALL: [BackendKind; 3] = [
        BackendKind::Accelerated,
        BackendKind::CpuPrimary,
        BackendKind::CpuSecondary,
    ];

    /// Short label used as the default case name.
    pub fn label(self) -> &'static str {
        match self {
            Self::Accelerated => "GPU",
            Self::CpuPrimary => "CPU",
            Self::CpuSecondary => "NPCPU",
        }
    }

    /// Device-based backends get a warm-up iteration and a synchronization
    /// barrier before each clock stop.
    pub fn is_device_based(self) -> bool {
        matches!(self, Self::Accelerated)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for BackendKind {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gpu" | "cuda" | "accelerated" => Ok(Self::Accelerated),
            "cpu" | "primary" | "faer" => Ok(Self::CpuPrimary),
            "npcpu" | "secondary" | "ndarray" => Ok(Self::CpuSecondary),
            other => Err(BenchError::Config {
                reason: format!("unknown backend '{other}' (expected gpu, cpu or npcpu)"),
            }),
        }
    }
}

/// One configuration to time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkCase {
    pub name: String,
    pub operation: Operation,
    pub backend: BackendKind,
    /// Side length N of every operand.
    pub size: usize,
    /// Accelerator ordinal; only meaningful for device-based backends.
    pub device_index: Option<usize>,
    pub repetitions: usize,
}

impl BenchmarkCase {
    /// A case named after its backend label, on the default device.
    ///
    /// ```
    /// use einbench::{BackendKind, BenchmarkCase, Operation};
    ///
    /// let case = BenchmarkCase::new(Operation::TripleStar, BackendKind::CpuSecondary, 64, 10);
    /// assert_eq!(case.name, "NPCPU");
    /// assert!(case.validate().is_ok());
    /// ```
    pub fn new(operation: Operation, backend: BackendKind, size: usize, repetitions: usize) -> Self {
        Self {
            name: backend.label().to_string(),
            operation,
            backend,
            size,
            device_index: None,
            repetitions,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn on_device(mut self, index: usize) -> Self {
        self.device_index = Some(index);
        self
    }

    /// Check the case before any timing starts.
    ///
    /// # Errors
    ///
    /// `BenchError::InvalidCase` for a zero size, zero repetitions, or a
    /// device index on a host-only backend.
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(self.invalid("size must be positive"));
        }
        if self.repetitions == 0 {
            return Err(self.invalid("repetitions must be positive"));
        }
        if self.device_index.is_some() && !self.backend.is_device_based() {
            return Err(self.invalid("device index given for a host-only backend"));
        }
        Ok(())
    }

    /// Device ordinal the case runs on, `None` for host-only backends.
    pub fn effective_device(&self) -> Option<usize> {
        self.backend
            .is_device_based()
            .then(|| self.device_index.unwrap_or(0))
    }

    fn invalid(&self, what: &str) -> BenchError {
        BenchError::InvalidCase {
            reason: format!("{}: {what}", self.name),
        }
    }
}

/// Outcome of a fully completed case.
///
/// Only the runner builds these, and only after every repetition finished.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkResult {
    case: BenchmarkCase,
    mean_seconds: f64,
    total_seconds: f64,
    repetitions_completed: usize,
}

impl BenchmarkResult {
    pub(crate) fn new(case: BenchmarkCase, total_seconds: f64) -> Self {
        let repetitions_completed = case.repetitions;
        Self {
            mean_seconds: total_seconds / repetitions_completed as f64,
            case,
            total_seconds,
            repetitions_completed,
        }
    }

    pub fn case(&self) -> &BenchmarkCase {
        &self.case
    }

    /// Mean wall-clock seconds per repetition.
    pub fn mean_seconds(&self) -> f64 {
        self.mean_seconds
    }

    pub fn total_seconds(&self) -> f64 {
        self.total_seconds
    }

    pub fn repetitions_completed(&self) -> usize {
        self.repetitions_completed
    }

    /// Throughput implied by the mean latency, if it is non-zero.
    pub fn gflops(&self) -> Option<f64> {
        (self.mean_seconds > 0.0)
            .then(|| self.case.operation.flop_count(self.case.size) / self.mean_seconds / 1e9)
    }
}
