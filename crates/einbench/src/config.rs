//! Harness-wide settings.
//!
//! Values come from the environment first; the command line overrides them
//! field by field.

use faer::Par;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{BenchError, Result};
use crate::report::OutputFormat;

/// Environment variable pinning CPU backend parallelism.
pub const THREADS_ENV: &str = "EINBENCH_NUM_THREADS";
/// Checked when [`THREADS_ENV`] is unset.
pub const FALLBACK_THREADS_ENV: &str = "OMP_NUM_THREADS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HarnessConfig {
    /// Worker threads for the CPU backends; `None` lets rayon decide.
    pub num_threads: Option<usize>,
    pub format: OutputFormat,
}

impl HarnessConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let num_threads = match lookup(THREADS_ENV).or_else(|| lookup(FALLBACK_THREADS_ENV)) {
            Some(raw) => Some(parse_threads(&raw)?),
            None => None,
        };
        Ok(Self {
            num_threads,
            ..Self::default()
        })
    }

    pub fn with_threads(mut self, n: usize) -> Self {
        self.num_threads = Some(n);
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// faer parallelism matching the thread setting.
    pub fn par(&self) -> Par {
        match self.num_threads {
            Some(1) => Par::Seq,
            Some(n) => Par::rayon(n),
            None => Par::rayon(0),
        }
    }

    /// A dedicated rayon pool sized by the thread setting.
    pub fn thread_pool(&self) -> Result<ThreadPool> {
        ThreadPoolBuilder::new()
            .num_threads(self.num_threads.unwrap_or(0))
            .thread_name(|i| format!("einbench-worker-{i}"))
            .build()
            .map_err(|e| BenchError::Config {
                reason: format!("cannot build thread pool: {e}"),
            })
    }
}

fn parse_threads(raw: &str) -> Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(BenchError::Config {
            reason: format!("thread count must be a positive integer, got '{raw}'"),
        }),
    }
}
