//! Report lines.
//!
//! Text lines read `<name>: <op> <size> <mean>s`, for example
//! `CPU: Matmul 100 1.23e-04s`. JSON output writes one [`ReportRow`] per
//! line instead.

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::case::BenchmarkResult;
use crate::error::{BenchError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Json => "json",
        })
    }
}

impl FromStr for OutputFormat {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(BenchError::Config {
                reason: format!("unknown output format '{other}' (expected text or json)"),
            }),
        }
    }
}

/// Seconds with two decimals and a signed, two-digit exponent: `1.23e-04`.
///
/// ```
/// use einbench::report::format_seconds;
///
/// assert_eq!(format_seconds(0.000123), "1.23e-04");
/// assert_eq!(format_seconds(2.5), "2.50e+00");
/// ```
pub fn format_seconds(seconds: f64) -> String {
    let s = format!("{seconds:.2e}");
    let Some((mantissa, exponent)) = s.split_once('e') else {
        return s;
    };
    let (sign, digits) = match exponent.strip_prefix('-') {
        Some(digits) => ('-', digits),
        None => ('+', exponent),
    };
    format!("{mantissa}e{sign}{digits:0>2}")
}

/// One human-readable line for `result`.
pub fn format_line(result: &BenchmarkResult) -> String {
    let case = result.case();
    format!(
        "{}: {} {} {}s",
        case.name,
        case.operation.display_name(),
        case.size,
        format_seconds(result.mean_seconds())
    )
}

/// Machine-readable form of a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub name: String,
    pub operation: String,
    pub pattern: String,
    pub backend: String,
    pub size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<usize>,
    pub repetitions: usize,
    pub mean_seconds: f64,
    pub total_seconds: f64,
    pub gflops: Option<f64>,
}

impl From<&BenchmarkResult> for ReportRow {
    fn from(result: &BenchmarkResult) -> Self {
        let case = result.case();
        Self {
            name: case.name.clone(),
            operation: case.operation.display_name().to_string(),
            pattern: case.operation.index_pattern().to_string(),
            backend: case.backend.label().to_string(),
            size: case.size,
            device: case.effective_device(),
            repetitions: result.repetitions_completed(),
            mean_seconds: result.mean_seconds(),
            total_seconds: result.total_seconds(),
            gflops: result.gflops(),
        }
    }
}

/// Writes one line per result in the chosen format.
pub struct Reporter<W> {
    out: W,
    format: OutputFormat,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self { out, format }
    }

    pub fn report(&mut self, result: &BenchmarkResult) -> Result<()> {
        match self.format {
            OutputFormat::Text => writeln!(self.out, "{}", format_line(result))?,
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.out, &ReportRow::from(result))?;
                writeln!(self.out)?;
            }
        }
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
