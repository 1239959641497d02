//! einbench - latency harness for einsum-style tensor contractions
//!
//! Times two contractions over `N x N` operands on three backends:
//!
//! | Operation | Pattern         |
//! |-----------|-----------------|
//! | Matmul    | `ij,jk->ik`     |
//! | Star      | `ji,kl,li->jkl` |
//!
//! | Label   | Backend                                  |
//! |---------|------------------------------------------|
//! | `GPU`   | CUDA through cudarc (cargo feature `cuda`) |
//! | `CPU`   | [`DenseTensor`] with faer GEMM           |
//! | `NPCPU` | ndarray                                  |
//!
//! # Architecture
//!
//! ```text
//! runner      → Runner<Clock>, run_case, run_suite
//!     ↓
//! backend     → Backend trait: allocate, to_device, contract, synchronize
//!     ↓
//! contract    → label contraction on DenseTensor (GEMM and naive)
//! device      → lazily opened accelerator contexts
//! ```
//!
//! # Example
//!
//! ```
//! use einbench::{BackendKind, BenchmarkCase, HarnessConfig, Operation, run_case};
//! use einbench::report::format_line;
//!
//! let config = HarnessConfig::default().with_threads(1);
//! let case = BenchmarkCase::new(Operation::PairwiseProduct, BackendKind::CpuPrimary, 16, 3);
//! let result = run_case(&case, &config).unwrap();
//!
//! assert_eq!(result.repetitions_completed(), 3);
//! assert!(format_line(&result).starts_with("CPU: Matmul 16 "));
//! ```

pub mod backend;
pub mod case;
pub mod config;
pub mod contract;
pub mod device;
pub mod error;
pub mod ops;
pub mod random;
pub mod report;
pub mod runner;
pub mod scalar;
pub mod tensor;
pub mod verify;

pub use backend::Backend;
pub use case::{BackendKind, BenchmarkCase, BenchmarkResult};
pub use config::HarnessConfig;
pub use error::{BenchError, Result};
pub use ops::Operation;
pub use report::{OutputFormat, Reporter};
pub use runner::{Clock, MonotonicClock, Runner, run_case, run_suite};
pub use scalar::Scalar;
pub use tensor::DenseTensor;
