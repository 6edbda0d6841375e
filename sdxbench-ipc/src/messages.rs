//! Wire Messages
//!
//! Everything that crosses the supervisor/worker pipe. All types derive rkyv
//! with byte checking so a corrupt frame is rejected instead of trusted.

use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};

/// One timed invocation (16 bytes).
///
/// `iteration` is the measurement iteration that produced the sample, which
/// lets the supervisor confirm every iteration contributed at least once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
#[repr(C, align(8))]
pub struct Sample {
    /// Wall-clock duration of a single invocation in nanoseconds
    pub duration_nanos: u64,
    /// Zero-based measurement iteration index
    pub iteration: u32,
}

impl Sample {
    /// Create a sample for the given iteration
    #[inline]
    pub fn new(duration_nanos: u64, iteration: u32) -> Self {
        Self {
            duration_nanos,
            iteration,
        }
    }

    /// Duration in milliseconds, the unit every report uses
    #[inline]
    pub fn as_millis_f64(&self) -> f64 {
        self.duration_nanos as f64 / 1_000_000.0
    }
}

/// A chunk of measurement samples
#[derive(Debug, Clone, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub struct SampleBatch {
    /// Monotonic per-fork counter; a gap means a lost frame
    pub batch_sequence: u32,
    /// Samples in invocation order
    pub samples: Vec<Sample>,
}

/// Which half of a fork's life an iteration belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub enum Phase {
    /// Timings are discarded
    Warmup,
    /// Timings are recorded
    Measurement,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Warmup => write!(f, "Warmup"),
            Phase::Measurement => write!(f, "Measurement"),
        }
    }
}

/// Host details a worker reports on start-up
#[derive(Debug, Clone, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub struct WorkerCapabilities {
    /// Must equal [`crate::PROTOCOL_VERSION`]
    pub protocol_version: u32,
    /// OS process id of the worker
    pub pid: u32,
}

impl Default for WorkerCapabilities {
    fn default() -> Self {
        Self {
            protocol_version: crate::PROTOCOL_VERSION,
            pid: std::process::id(),
        }
    }
}

/// Messages sent from worker to supervisor
#[derive(Debug, Clone, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub enum WorkerMessage {
    /// Handshake, always the first frame
    Hello(WorkerCapabilities),

    /// One warmup or measurement iteration finished
    IterationComplete {
        /// Phase the iteration ran in
        phase: Phase,
        /// Zero-based index within the phase
        index: u32,
        /// Invocations that fit in the window
        invocations: u64,
        /// Actual iteration length, overshoot included
        elapsed_nanos: u64,
    },

    /// All warmup iterations are done
    WarmupComplete {
        /// Warmup iterations performed
        iterations: u32,
        /// Invocations across all warmup iterations
        invocations: u64,
    },

    /// Measurement samples
    SampleBatch(SampleBatch),

    /// Measurement finished and every batch has been sent
    Complete {
        /// Invocations across all measurement iterations
        total_invocations: u64,
        /// Sum of every recorded sample
        total_duration_nanos: u64,
    },

    /// The fork cannot continue
    Failure {
        /// Error category
        kind: FailureKind,
        /// Human-readable description
        message: String,
    },
}

/// Why a worker gave up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub enum FailureKind {
    /// The label is not registered in the worker binary
    UnknownLabel,
    /// Constructing the operation failed
    Setup,
    /// An invocation returned an error
    Operation,
    /// An invocation panicked
    Panic,
    /// The command was malformed
    Protocol,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FailureKind::UnknownLabel => "unknown label",
            FailureKind::Setup => "setup failed",
            FailureKind::Operation => "operation failed",
            FailureKind::Panic => "panic",
            FailureKind::Protocol => "protocol error",
        };
        f.write_str(s)
    }
}

/// Commands sent from supervisor to worker
#[derive(Debug, Clone, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub enum SupervisorCommand {
    /// Run one fork of the labelled operation
    Run {
        /// Operation label
        label: String,
        /// Window and iteration settings
        config: BenchmarkConfig,
    },

    /// Exit cleanly
    Shutdown,
}

/// Window and iteration settings for one fork
#[derive(Debug, Clone, PartialEq, Eq, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub struct BenchmarkConfig {
    /// Length of each warmup iteration in nanoseconds
    pub warmup_time_ns: u64,
    /// Number of warmup iterations (may be 0)
    pub warmup_iterations: u32,
    /// Length of each measurement iteration in nanoseconds
    pub measurement_time_ns: u64,
    /// Number of measurement iterations
    pub measurement_iterations: u32,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            warmup_time_ns: 1_000_000_000,
            warmup_iterations: 5,
            measurement_time_ns: 1_000_000_000,
            measurement_iterations: 5,
        }
    }
}

impl BenchmarkConfig {
    /// Validate configuration values, returning a description of the first error found.
    pub fn validate(&self) -> Result<(), String> {
        if self.measurement_iterations == 0 {
            return Err("measurement_iterations must be >= 1".to_string());
        }
        if self.measurement_time_ns == 0 {
            return Err("measurement_time must be > 0".to_string());
        }
        if self.warmup_iterations > 0 && self.warmup_time_ns == 0 {
            return Err("warmup_time must be > 0 when warmup iterations are requested".to_string());
        }
        Ok(())
    }

    /// Total wall-clock time one fork spends in warmup
    pub fn warmup_total_ns(&self) -> u64 {
        self.warmup_time_ns
            .saturating_mul(u64::from(self.warmup_iterations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_millis() {
        let sample = Sample::new(2_500_000, 3);
        assert_eq!(sample.as_millis_f64(), 2.5);
        assert_eq!(sample.iteration, 3);
    }

    #[test]
    fn test_benchmark_config_validate_default() {
        assert!(BenchmarkConfig::default().validate().is_ok());
    }

    #[test]
    fn test_benchmark_config_rejects_zero_iterations() {
        let config = BenchmarkConfig {
            measurement_iterations: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_benchmark_config_rejects_zero_measurement_window() {
        let config = BenchmarkConfig {
            measurement_time_ns: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_benchmark_config_allows_no_warmup() {
        let config = BenchmarkConfig {
            warmup_time_ns: 0,
            warmup_iterations: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.warmup_total_ns(), 0);
    }

    #[test]
    fn test_warmup_total() {
        let config = BenchmarkConfig {
            warmup_time_ns: 40_000_000,
            warmup_iterations: 3,
            ..Default::default()
        };
        assert_eq!(config.warmup_total_ns(), 120_000_000);
    }

    #[test]
    fn test_worker_capabilities_default() {
        let caps = WorkerCapabilities::default();
        assert_eq!(caps.protocol_version, crate::PROTOCOL_VERSION);
        assert_eq!(caps.pid, std::process::id());
    }
}
