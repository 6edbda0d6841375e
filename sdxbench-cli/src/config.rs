//! Run options and `sdxbench.toml` loading
//!
//! Options start from compiled defaults. An `sdxbench.toml`, discovered by
//! walking up from the current directory, may override any of them.

use crate::RunError;
use regex::Regex;
use sdxbench_ipc::BenchmarkConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the configuration file looked up by [`SdxConfig::discover`]
pub const CONFIG_FILE_NAME: &str = "sdxbench.toml";

/// How much the driver prints
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Verbosity {
    /// Report lines only
    Quiet,
    /// Banner, progress bar and summary
    Normal,
    /// Everything, including one line per iteration
    #[default]
    Extra,
}

/// Where forks run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum IsolationMode {
    /// A fresh worker process per fork
    #[default]
    Process,
    /// Sequentially inside the driver; for debugging and tests
    InProcess,
}

impl IsolationMode {
    /// Whether this mode provides process isolation
    pub fn is_isolated(self) -> bool {
        matches!(self, IsolationMode::Process)
    }
}

/// Everything a run needs to know besides the operations themselves
#[derive(Debug, Clone, PartialEq)]
pub struct BenchOptions {
    /// Length of one warmup window
    pub warmup_time: Duration,
    /// Length of one measurement window
    pub measurement_time: Duration,
    /// Warmup windows per fork
    pub warmup_iterations: u32,
    /// Measurement windows per fork
    pub measurement_iterations: u32,
    /// Forks per operation
    pub forks: u32,
    /// Console output level
    pub verbosity: Verbosity,
    /// Regex an operation label must match to run
    pub include: String,
    /// Fork placement
    pub isolation: IsolationMode,
    /// Report destination, truncated on write
    pub result_path: PathBuf,
}

impl Default for BenchOptions {
    fn default() -> Self {
        Self {
            warmup_time: Duration::from_millis(1000),
            measurement_time: Duration::from_millis(1000),
            warmup_iterations: 5,
            measurement_iterations: 5,
            forks: 5,
            verbosity: Verbosity::default(),
            include: ".*".to_string(),
            isolation: IsolationMode::default(),
            result_path: PathBuf::from(sdxbench_report::DEFAULT_RESULT_PATH),
        }
    }
}

impl BenchOptions {
    /// Defaults overlaid with the discovered `sdxbench.toml`, if any
    pub fn load() -> Result<Self, RunError> {
        let mut options = Self::default();
        if let Some(config) = SdxConfig::discover()? {
            options.apply(&config)?;
        }
        Ok(options)
    }

    /// Overlay every value `config` sets
    pub fn apply(&mut self, config: &SdxConfig) -> Result<(), RunError> {
        let runner = &config.runner;
        if let Some(s) = &runner.warmup_time {
            self.warmup_time = parse_duration(s)?;
        }
        if let Some(s) = &runner.measurement_time {
            self.measurement_time = parse_duration(s)?;
        }
        if let Some(n) = runner.warmup_iterations {
            self.warmup_iterations = n;
        }
        if let Some(n) = runner.measurement_iterations {
            self.measurement_iterations = n;
        }
        if let Some(n) = runner.forks {
            self.forks = n;
        }
        if let Some(v) = runner.verbosity {
            self.verbosity = v;
        }
        if let Some(include) = &runner.include {
            self.include = include.clone();
        }
        if let Some(isolation) = runner.isolation {
            self.isolation = isolation;
        }
        if let Some(path) = &config.output.result_path {
            self.result_path = PathBuf::from(path);
        }
        Ok(())
    }

    /// Check every constraint and compile the include filter.
    pub fn validate(&self) -> Result<Regex, RunError> {
        if self.forks == 0 {
            return Err(RunError::Configuration("forks must be at least 1".into()));
        }
        if self.measurement_iterations == 0 {
            return Err(RunError::Configuration(
                "measurement_iterations must be at least 1".into(),
            ));
        }
        if self.measurement_time.is_zero() {
            return Err(RunError::Configuration(
                "measurement_time must be greater than zero".into(),
            ));
        }
        if self.warmup_iterations > 0 && self.warmup_time.is_zero() {
            return Err(RunError::Configuration(
                "warmup_time must be greater than zero when warmup_iterations > 0".into(),
            ));
        }

        Regex::new(&self.include)
            .map_err(|e| RunError::Configuration(format!("invalid include pattern: {e}")))
    }

    /// Per-fork settings sent to workers
    pub fn to_benchmark_config(&self) -> BenchmarkConfig {
        BenchmarkConfig {
            warmup_time_ns: saturating_nanos(self.warmup_time),
            warmup_iterations: self.warmup_iterations,
            measurement_time_ns: saturating_nanos(self.measurement_time),
            measurement_iterations: self.measurement_iterations,
        }
    }
}

fn saturating_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

/// Contents of `sdxbench.toml`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SdxConfig {
    /// Measurement settings
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Report settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// `[runner]` table; unset keys keep their defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RunnerConfig {
    /// Warmup window, e.g. `"1s"`
    pub warmup_time: Option<String>,
    /// Measurement window, e.g. `"500ms"`
    pub measurement_time: Option<String>,
    /// Warmup windows per fork
    pub warmup_iterations: Option<u32>,
    /// Measurement windows per fork
    pub measurement_iterations: Option<u32>,
    /// Fresh worker processes per operation
    pub forks: Option<u32>,
    /// `quiet`, `normal` or `extra`
    pub verbosity: Option<Verbosity>,
    /// Label filter regex
    pub include: Option<String>,
    /// `process` or `in-process`
    pub isolation: Option<IsolationMode>,
}

/// `[output]` table
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Where the report is written, default `./result.txt`
    pub result_path: Option<String>,
}

impl SdxConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RunError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RunError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        toml::from_str(&content)
            .map_err(|e| RunError::Configuration(format!("invalid {}: {e}", path.display())))
    }

    /// Walk up from the current directory looking for `sdxbench.toml`.
    pub fn discover() -> Result<Option<Self>, RunError> {
        let Ok(mut dir) = std::env::current_dir() else {
            return Ok(None);
        };
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.is_file() {
                tracing::debug!(path = %config_path.display(), "loading configuration");
                return Self::load(&config_path).map(Some);
            }
            if !dir.pop() {
                return Ok(None);
            }
        }
    }
}

/// Parse a duration such as `"3s"`, `"500ms"` or `"2m"`; a bare number is
/// seconds.
pub fn parse_duration(s: &str) -> Result<Duration, RunError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(RunError::Configuration("empty duration".into()));
    }

    let (num_part, unit_part) = s
        .char_indices()
        .find(|(_, c)| c.is_alphabetic() || *c == 'µ')
        .map(|(i, _)| s.split_at(i))
        .unwrap_or((s, "s"));

    let value: f64 = num_part
        .trim()
        .parse()
        .map_err(|_| RunError::Configuration(format!("invalid duration number: {num_part}")))?;
    if !value.is_finite() || value < 0.0 {
        return Err(RunError::Configuration(format!("invalid duration: {s}")));
    }

    let multiplier: f64 = match unit_part.to_lowercase().as_str() {
        "ns" => 1.0,
        "us" | "µs" => 1e3,
        "ms" => 1e6,
        "s" => 1e9,
        "m" | "min" => 60e9,
        _ => {
            return Err(RunError::Configuration(format!(
                "unknown duration unit: {unit_part}"
            )))
        }
    };

    Ok(Duration::from_nanos((value * multiplier) as u64))
}
