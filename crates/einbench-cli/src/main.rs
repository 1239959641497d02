//! `einbench` command-line front end.

use std::io::{self, Write};
use std::num::NonZeroUsize;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use einbench::verify::{DEFAULT_TOLERANCE, verify_case};
use einbench::{
    BackendKind, BenchError, BenchmarkCase, BenchmarkResult, HarnessConfig, Operation,
    OutputFormat, Reporter, run_case,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Time einsum-style contractions across compute backends
#[derive(Parser, Debug)]
#[command(name = "einbench")]
#[command(version)]
struct Cli {
    /// Operations to time (matmul, star); all by default
    #[arg(long, value_delimiter = ',')]
    ops: Vec<Operation>,

    /// Backends to time (gpu, cpu, npcpu); all by default
    #[arg(long, value_delimiter = ',')]
    backends: Vec<BackendKind>,

    /// Operand side lengths
    #[arg(long, value_delimiter = ',', default_value = "100")]
    sizes: Vec<usize>,

    /// Repetitions per case
    ///
    /// Defaults to 10000 for matmul and 100 for star.
    #[arg(short = 'n', long)]
    repetitions: Option<usize>,

    /// Accelerator ordinal for the gpu backend
    #[arg(long)]
    device: Option<usize>,

    /// CPU worker threads; overrides EINBENCH_NUM_THREADS and OMP_NUM_THREADS
    #[arg(short, long)]
    threads: Option<NonZeroUsize>,

    /// Output format
    #[arg(long, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Skip gpu cases whose device cannot be opened instead of failing
    #[arg(long)]
    skip_unavailable: bool,

    /// Check each backend against the host reference before timing
    #[arg(long)]
    verify: bool,
}

impl Cli {
    fn cases(&self) -> Vec<BenchmarkCase> {
        let ops = if self.ops.is_empty() {
            Operation::ALL.to_vec()
        } else {
            self.ops.clone()
        };
        let backends = if self.backends.is_empty() {
            BackendKind::ALL.to_vec()
        } else {
            self.backends.clone()
        };

        let mut cases = Vec::new();
        for &size in &self.sizes {
            for &op in &ops {
                let reps = self.repetitions.unwrap_or(op.default_repetitions());
                for &backend in &backends {
                    let case = BenchmarkCase::new(op, backend, size, reps);
                    cases.push(match self.device {
                        Some(index) if backend.is_device_based() => case.on_device(index),
                        _ => case,
                    });
                }
            }
        }
        cases
    }

    fn config(&self) -> Result<HarnessConfig> {
        let mut config = HarnessConfig::from_env().context("invalid environment")?;
        if let Some(n) = self.threads {
            config = config.with_threads(n.get());
        }
        Ok(config.with_format(self.format))
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.config().and_then(|config| run(&cli, config, io::stdout().lock())) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run<W: Write>(cli: &Cli, config: HarnessConfig, out: W) -> Result<()> {
    let cases = cli.cases();
    info!(cases = cases.len(), threads = ?config.num_threads, "starting");

    let mut reporter = Reporter::new(out, config.format);
    for case in &cases {
        match run_one(case, &config, cli.verify) {
            Ok(result) => reporter.report(&result)?,
            Err(BenchError::DeviceUnavailable { index, reason }) if cli.skip_unavailable => {
                warn!(name = %case.name, index, %reason, "skipping case, device unavailable");
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("{}: {} {}", case.name, case.operation, case.size)
                });
            }
        }
    }
    Ok(())
}

fn run_one(
    case: &BenchmarkCase,
    config: &HarnessConfig,
    verify: bool,
) -> einbench::Result<BenchmarkResult> {
    if verify {
        verify_case(case, config, DEFAULT_TOLERANCE)?;
    }
    run_case(case, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("einbench").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_default_suite() {
        let cases = parse(&[]).cases();
        assert_eq!(cases.len(), 6);
        let names: Vec<_> = cases.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["GPU", "CPU", "NPCPU", "GPU", "CPU", "NPCPU"]);
        assert!(cases.iter().all(|c| c.size == 100));
        assert_eq!(cases[0].repetitions, 10_000);
        assert_eq!(cases[3].repetitions, 100);
    }

    #[test]
    fn test_selection() {
        let cli = parse(&[
            "--ops", "star", "--backends", "gpu,npcpu", "--sizes", "8,16", "-n", "3", "--device",
            "1",
        ]);
        let cases = cli.cases();
        assert_eq!(cases.len(), 4);
        assert!(cases.iter().all(|c| c.operation == Operation::TripleStar));
        assert!(cases.iter().all(|c| c.repetitions == 3));
        assert_eq!(cases[0].device_index, Some(1));
        assert_eq!(cases[1].device_index, None);
        assert_eq!(cases[3].size, 16);
        assert!(cases.iter().all(|c| c.validate().is_ok()));
    }

    #[test]
    fn test_rejects_unknown_values() {
        let bad = |args: &[&str]| {
            Cli::try_parse_from(std::iter::once("einbench").chain(args.iter().copied())).is_err()
        };
        assert!(bad(&["--ops", "conv"]));
        assert!(bad(&["--backends", "tpu"]));
        assert!(bad(&["--threads", "0"]));
        assert!(bad(&["--format", "csv"]));
    }

    #[cfg(not(feature = "cuda"))]
    #[test]
    fn test_skip_unavailable_device() {
        let cli = parse(&["--backends", "gpu", "--sizes", "8", "-n", "1", "--skip-unavailable"]);
        let mut out = Vec::new();
        run(&cli, HarnessConfig::default(), &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[cfg(not(feature = "cuda"))]
    #[test]
    fn test_unavailable_device_fails_without_skip() {
        let cli = parse(&["--backends", "gpu", "--sizes", "8", "-n", "1"]);
        let mut out = Vec::new();
        let err = run(&cli, HarnessConfig::default(), &mut out).unwrap_err();
        assert!(matches!(
            err.root_cause().downcast_ref::<BenchError>(),
            Some(BenchError::DeviceUnavailable { index: 0, .. })
        ));
        assert!(err.to_string().starts_with("GPU: Matmul 8"), "{err:#}");
        assert!(out.is_empty());
    }

    #[test]
    fn test_report_goes_to_writer() {
        let cli = parse(&["--ops", "matmul", "--backends", "npcpu", "--sizes", "4", "-n", "2"]);
        let mut out = Vec::new();
        run(&cli, HarnessConfig::default().with_threads(1), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("NPCPU: Matmul 4 "), "{text}");
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_threads_flag_overrides() {
        let config = parse(&["--threads", "3", "--format", "json"]).config().unwrap();
        assert_eq!(config.num_threads, Some(3));
        assert_eq!(config.format, OutputFormat::Json);
    }
}
