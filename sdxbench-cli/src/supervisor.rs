//! Supervisor Process
//!
//! Spawns one worker process per fork and drives it through the fork
//! protocol. Every state transition is checked; a message that does not fit
//! the current state aborts the fork.
//!
//! ```text
//! Spawned --Run--> Warming --WarmupComplete--> Measuring --Complete--> Drained --exit 0--> Exited
//! ```
//!
//! Reads block without a deadline. A worker that dies shows up as end of
//! stream on its message pipe.

use sdxbench_core::PhaseEvent;
use sdxbench_ipc::{
    BenchmarkConfig, FailureKind, FrameError, FrameReader, FrameWriter, IPC_FD_ENV,
    PROTOCOL_VERSION, Phase, Sample, SupervisorCommand, WorkerCapabilities, WorkerMessage,
};
use std::env;
use std::fmt;
use std::os::unix::io::{FromRawFd, RawFd};
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use thiserror::Error;
use tracing::{debug, trace};

/// Command-line flag that turns the benchmark binary into a worker
pub const WORKER_FLAG: &str = "--sdx-worker";

/// Where a fork currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkState {
    /// Process started and said hello
    Spawned,
    /// `Run` sent, warmup windows in progress
    Warming,
    /// Warmup done, measurement windows in progress
    Measuring,
    /// All samples received
    Drained,
    /// Process exited cleanly
    Exited,
}

impl fmt::Display for ForkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ForkState::Spawned => "spawned",
            ForkState::Warming => "warming",
            ForkState::Measuring => "measuring",
            ForkState::Drained => "drained",
            ForkState::Exited => "exited",
        };
        f.write_str(name)
    }
}

/// Why a fork could not be completed
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The worker process could not be started
    #[error("failed to spawn worker: {0}")]
    Spawn(#[from] std::io::Error),

    /// A frame could not be sent or decoded
    #[error("IPC error: {0}")]
    Ipc(#[from] FrameError),

    /// The message pipe closed before the fork finished
    #[error("worker exited while {0}")]
    Crashed(ForkState),

    /// The worker sent a message that does not fit the current state
    #[error("worker protocol error while {state}: unexpected {got}")]
    Protocol {
        /// State the fork was in
        state: ForkState,
        /// The offending message
        got: String,
    },

    /// The hello carried another protocol version
    #[error("worker speaks protocol version {got}, expected {expected}")]
    Version {
        /// Version the worker announced
        got: u32,
        /// Version this supervisor speaks
        expected: u32,
    },

    /// The worker exited with a nonzero status after its fork
    #[error("worker exited with {0}")]
    Exit(ExitStatus),

    /// The worker reported a failure
    #[error("{kind}: {message}")]
    Failure {
        /// What failed
        kind: FailureKind,
        /// Error chain, outermost first
        message: String,
    },
}

impl SupervisorError {
    /// Whether the operation itself failed, as opposed to the process plumbing
    pub fn is_operation_failure(&self) -> bool {
        matches!(
            self,
            SupervisorError::Failure {
                kind: FailureKind::Setup | FailureKind::Operation | FailureKind::Panic,
                ..
            }
        )
    }
}

/// What a finished fork hands back
#[derive(Debug, Clone, Default)]
pub struct ForkOutcome {
    /// One sample per measured call, in call order
    pub samples: Vec<Sample>,
    /// Calls made during warmup
    pub warmup_invocations: u64,
    /// Calls made during measurement
    pub invocations: u64,
}

/// Lowest descriptor a pipe end may occupy in the supervisor. The child's
/// fd 3 and 4 are `dup2` targets, so no source end may already sit there.
const FIRST_PIPE_FD: RawFd = 10;

/// Create a pipe pair, returning (read_fd, write_fd).
///
/// Both ends are close-on-exec and numbered at or above [`FIRST_PIPE_FD`];
/// the child re-enables inheritance on fd 3 and 4 only.
fn create_pipe() -> Result<(RawFd, RawFd), std::io::Error> {
    let mut fds = [0 as RawFd; 2];
    let ret = unsafe { libc::pipe(fds.as_mut_ptr()) };
    if ret != 0 {
        return Err(std::io::Error::last_os_error());
    }
    let read = match relocate_fd(fds[0]) {
        Ok(fd) => fd,
        Err(e) => {
            close_fd(fds[1]);
            return Err(e);
        }
    };
    let write = match relocate_fd(fds[1]) {
        Ok(fd) => fd,
        Err(e) => {
            close_fd(read);
            return Err(e);
        }
    };
    Ok((read, write))
}

/// Move `fd` to the lowest free descriptor at or above [`FIRST_PIPE_FD`],
/// close-on-exec. The original descriptor is closed either way.
fn relocate_fd(fd: RawFd) -> Result<RawFd, std::io::Error> {
    let moved = unsafe { libc::fcntl(fd, libc::F_DUPFD_CLOEXEC, FIRST_PIPE_FD) };
    let err = std::io::Error::last_os_error();
    close_fd(fd);
    if moved < 0 {
        return Err(err);
    }
    Ok(moved)
}

fn close_fd(fd: RawFd) {
    unsafe {
        libc::close(fd);
    }
}

/// One worker process and its pipe pair
pub struct WorkerHandle {
    child: Child,
    reader: FrameReader<std::fs::File>,
    writer: FrameWriter<std::fs::File>,
    capabilities: WorkerCapabilities,
    state: ForkState,
}

impl WorkerHandle {
    /// Re-execute the current binary as a worker.
    pub fn spawn() -> Result<Self, SupervisorError> {
        let binary = env::current_exe()?;
        Self::spawn_binary(&binary)
    }

    /// Start `binary` as a worker and wait for its hello.
    pub fn spawn_binary(binary: &Path) -> Result<Self, SupervisorError> {
        // cmd pipe: supervisor writes, worker reads on fd 3
        let (cmd_read, cmd_write) = create_pipe()?;
        // msg pipe: worker writes on fd 4, supervisor reads
        let (msg_read, msg_write) = match create_pipe() {
            Ok(fds) => fds,
            Err(e) => {
                close_fd(cmd_read);
                close_fd(cmd_write);
                return Err(SupervisorError::Spawn(e));
            }
        };

        let mut command = Command::new(binary);
        command
            .arg(WORKER_FLAG)
            .env(IPC_FD_ENV, "3,4")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit());

        unsafe {
            command.pre_exec(move || {
                // Every source end sits above fd 4, so neither dup2 can
                // clobber a descriptor that is closed afterwards.
                if libc::dup2(cmd_read, 3) < 0 || libc::dup2(msg_write, 4) < 0 {
                    return Err(std::io::Error::last_os_error());
                }
                for fd in [cmd_read, cmd_write, msg_read, msg_write] {
                    libc::close(fd);
                }
                Ok(())
            });
        }

        let mut child = match command.spawn() {
            Ok(c) => c,
            Err(e) => {
                for fd in [cmd_read, cmd_write, msg_read, msg_write] {
                    close_fd(fd);
                }
                return Err(SupervisorError::Spawn(e));
            }
        };

        close_fd(cmd_read);
        close_fd(msg_write);

        let writer_file = unsafe { std::fs::File::from_raw_fd(cmd_write) };
        let reader_file = unsafe { std::fs::File::from_raw_fd(msg_read) };
        let mut reader = FrameReader::new(reader_file);

        let hello = match reader.recv::<WorkerMessage>() {
            Ok(WorkerMessage::Hello(caps)) if caps.protocol_version == PROTOCOL_VERSION => Ok(caps),
            Ok(WorkerMessage::Hello(caps)) => Err(SupervisorError::Version {
                got: caps.protocol_version,
                expected: PROTOCOL_VERSION,
            }),
            Ok(other) => Err(SupervisorError::Protocol {
                state: ForkState::Spawned,
                got: describe(&other),
            }),
            Err(FrameError::Closed) => Err(SupervisorError::Crashed(ForkState::Spawned)),
            Err(e) => Err(e.into()),
        };
        let capabilities = match hello {
            Ok(caps) => caps,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e);
            }
        };
        debug!(pid = capabilities.pid, "worker started");

        Ok(Self {
            child,
            reader,
            writer: FrameWriter::new(writer_file),
            capabilities,
            state: ForkState::Spawned,
        })
    }

    /// What the worker reported in its hello
    pub fn capabilities(&self) -> &WorkerCapabilities {
        &self.capabilities
    }

    /// Current protocol state
    pub fn state(&self) -> ForkState {
        self.state
    }

    /// Run `label` once on this worker, forwarding window progress to
    /// `on_progress` as it arrives.
    pub fn run_fork<F>(
        &mut self,
        label: &str,
        config: &BenchmarkConfig,
        mut on_progress: F,
    ) -> Result<ForkOutcome, SupervisorError>
    where
        F: FnMut(PhaseEvent),
    {
        if self.state != ForkState::Spawned {
            return Err(SupervisorError::Protocol {
                state: self.state,
                got: "second Run".to_string(),
            });
        }

        self.writer.send(&SupervisorCommand::Run {
            label: label.to_string(),
            config: config.clone(),
        })?;
        self.state = ForkState::Warming;

        let mut outcome = ForkOutcome::default();
        let mut next_batch = 0u32;

        while self.state != ForkState::Drained {
            let message = match self.reader.recv::<WorkerMessage>() {
                Ok(message) => message,
                Err(FrameError::Closed) => return Err(SupervisorError::Crashed(self.state)),
                Err(e) => return Err(e.into()),
            };
            trace!(state = %self.state, message = %describe(&message), "worker message");

            match (self.state, message) {
                (
                    ForkState::Warming,
                    WorkerMessage::IterationComplete {
                        phase: Phase::Warmup,
                        index,
                        invocations,
                        elapsed_nanos,
                    },
                )
                | (
                    ForkState::Measuring,
                    WorkerMessage::IterationComplete {
                        phase: Phase::Measurement,
                        index,
                        invocations,
                        elapsed_nanos,
                    },
                ) => {
                    let phase = if self.state == ForkState::Warming {
                        Phase::Warmup
                    } else {
                        Phase::Measurement
                    };
                    on_progress(PhaseEvent::IterationComplete {
                        phase,
                        index,
                        invocations,
                        elapsed_nanos,
                    });
                }
                (
                    ForkState::Warming,
                    WorkerMessage::WarmupComplete {
                        iterations,
                        invocations,
                    },
                ) => {
                    outcome.warmup_invocations = invocations;
                    on_progress(PhaseEvent::WarmupComplete {
                        iterations,
                        invocations,
                    });
                    self.state = ForkState::Measuring;
                }
                (ForkState::Measuring, WorkerMessage::SampleBatch(batch)) => {
                    if batch.batch_sequence != next_batch {
                        return Err(SupervisorError::Protocol {
                            state: self.state,
                            got: format!(
                                "sample batch {} (expected {next_batch})",
                                batch.batch_sequence
                            ),
                        });
                    }
                    next_batch += 1;
                    outcome.samples.extend(batch.samples);
                }
                (
                    ForkState::Measuring,
                    WorkerMessage::Complete {
                        total_invocations, ..
                    },
                ) => {
                    if total_invocations != outcome.samples.len() as u64 {
                        return Err(SupervisorError::Protocol {
                            state: self.state,
                            got: format!(
                                "completion after {total_invocations} calls with {} samples",
                                outcome.samples.len()
                            ),
                        });
                    }
                    outcome.invocations = total_invocations;
                    self.state = ForkState::Drained;
                }
                (_, WorkerMessage::Failure { kind, message }) => {
                    return Err(SupervisorError::Failure { kind, message });
                }
                (state, other) => {
                    return Err(SupervisorError::Protocol {
                        state,
                        got: describe(&other),
                    });
                }
            }
        }

        Ok(outcome)
    }

    /// Ask the worker to exit and wait for it; anything but a zero exit
    /// status fails the fork.
    pub fn shutdown(mut self) -> Result<(), SupervisorError> {
        // A worker that already hung up is judged on its exit status alone.
        let _ = self.writer.send(&SupervisorCommand::Shutdown);
        let status = self.child.wait()?;
        if !status.success() {
            return Err(SupervisorError::Exit(status));
        }
        self.state = ForkState::Exited;
        Ok(())
    }

    /// Check if the worker process is still running
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        if self.is_alive() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

fn describe(message: &WorkerMessage) -> String {
    match message {
        WorkerMessage::Hello(_) => "Hello".to_string(),
        WorkerMessage::IterationComplete { phase, index, .. } => {
            format!("{phase} IterationComplete #{index}")
        }
        WorkerMessage::WarmupComplete { .. } => "WarmupComplete".to_string(),
        WorkerMessage::SampleBatch(batch) => {
            format!("SampleBatch #{} ({} samples)", batch.batch_sequence, batch.samples.len())
        }
        WorkerMessage::Complete { .. } => "Complete".to_string(),
        WorkerMessage::Failure { kind, .. } => format!("Failure ({kind})"),
    }
}

/// Runs forks one after another, each in a fresh worker process
pub struct Supervisor {
    config: BenchmarkConfig,
    binary: Option<std::path::PathBuf>,
}

impl Supervisor {
    /// Supervisor that re-executes the current binary
    pub fn new(config: BenchmarkConfig) -> Self {
        Self {
            config,
            binary: None,
        }
    }

    /// Supervisor that spawns `binary` instead of the current executable
    pub fn with_binary(config: BenchmarkConfig, binary: impl Into<std::path::PathBuf>) -> Self {
        Self {
            config,
            binary: Some(binary.into()),
        }
    }

    /// Spawn a worker, run one fork of `label` and shut the worker down.
    pub fn run_fork<F>(&self, label: &str, on_progress: F) -> Result<ForkOutcome, SupervisorError>
    where
        F: FnMut(PhaseEvent),
    {
        let mut worker = match &self.binary {
            Some(binary) => WorkerHandle::spawn_binary(binary)?,
            None => WorkerHandle::spawn()?,
        };
        let outcome = worker.run_fork(label, &self.config, on_progress)?;
        worker.shutdown()?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdxbench_ipc::{SampleBatch, WorkerCapabilities};

    #[test]
    fn test_operation_failures_are_distinguished() {
        let op = SupervisorError::Failure {
            kind: FailureKind::Operation,
            message: "GET 404".to_string(),
        };
        assert!(op.is_operation_failure());

        let unknown = SupervisorError::Failure {
            kind: FailureKind::UnknownLabel,
            message: "Baseline".to_string(),
        };
        assert!(!unknown.is_operation_failure());
        assert!(!SupervisorError::Crashed(ForkState::Measuring).is_operation_failure());
    }

    #[test]
    fn test_error_messages_name_the_state() {
        let err = SupervisorError::Crashed(ForkState::Warming);
        assert_eq!(err.to_string(), "worker exited while warming");

        let err = SupervisorError::Protocol {
            state: ForkState::Spawned,
            got: "Complete".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "worker protocol error while spawned: unexpected Complete"
        );
    }

    #[test]
    fn test_describe() {
        assert_eq!(
            describe(&WorkerMessage::Hello(WorkerCapabilities::default())),
            "Hello"
        );
        assert_eq!(
            describe(&WorkerMessage::SampleBatch(SampleBatch {
                batch_sequence: 2,
                samples: vec![Sample::new(1, 0)],
            })),
            "SampleBatch #2 (1 samples)"
        );
    }

    #[test]
    fn test_pipe_ends_stay_clear_of_worker_fds() {
        let pipes = [create_pipe().unwrap(), create_pipe().unwrap()];
        for (read, write) in pipes {
            assert!(read >= FIRST_PIPE_FD, "read end on fd {read}");
            assert!(write >= FIRST_PIPE_FD, "write end on fd {write}");
            let flags = unsafe { libc::fcntl(read, libc::F_GETFD) };
            assert_ne!(flags & libc::FD_CLOEXEC, 0);
        }
        for (read, write) in pipes {
            close_fd(read);
            close_fd(write);
        }
    }

    #[test]
    fn test_missing_binary_is_a_spawn_error() {
        let result = WorkerHandle::spawn_binary(Path::new("/nonexistent/sdxbench-worker"));
        assert!(matches!(result, Err(SupervisorError::Spawn(_))));
    }
}
