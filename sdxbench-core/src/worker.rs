//! Worker Process Entry Point
//!
//! The child side of a fork. On Unix the supervisor hands over a pipe pair on
//! fd 3/4 and announces it through `SDX_IPC_FD`; elsewhere, or when the
//! variable is absent, stdin/stdout are used.
//!
//! Protocol, per process:
//!
//! ```text
//! worker                      supervisor
//!   Hello  ------------------>
//!          <------------------  Run { label, config }
//!   IterationComplete* ------>
//!   WarmupComplete ---------->
//!   IterationComplete* ------>
//!   SampleBatch* ------------>
//!   Complete | Failure ------>
//!          <------------------  Shutdown
//! ```

use crate::bencher::{PhaseError, PhaseEvent, run_fork};
use crate::measure::{current_cpu, pin_to_cpu};
use crate::{OperationDef, find_operation};
use sdxbench_ipc::{
    BenchmarkConfig, FailureKind, FrameError, FrameReader, FrameWriter, IPC_FD_ENV, SampleBatcher,
    SupervisorCommand, WorkerCapabilities, WorkerMessage,
};
use std::io::{Read, Write};

#[cfg(unix)]
use std::os::unix::io::FromRawFd;

/// IPC transport: either inherited fd pair or stdin/stdout fallback.
enum IpcTransport {
    #[cfg(unix)]
    Fds { read_fd: i32, write_fd: i32 },
    Stdio,
}

fn detect_transport() -> IpcTransport {
    #[cfg(unix)]
    if let Ok(val) = std::env::var(IPC_FD_ENV) {
        if let Some((r, w)) = val.split_once(',') {
            if let (Ok(read_fd), Ok(write_fd)) = (r.trim().parse(), w.trim().parse()) {
                return IpcTransport::Fds { read_fd, write_fd };
            }
        }
        eprintln!(
            "sdxbench: warning: invalid {IPC_FD_ENV}={val:?} (expected <read_fd>,<write_fd>), using stdio"
        );
    }
    IpcTransport::Stdio
}

/// Worker main loop
pub struct WorkerMain<'a, R: Read, W: Write> {
    operations: &'a [OperationDef],
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
}

impl<'a> WorkerMain<'a, Box<dyn Read>, Box<dyn Write>> {
    /// Create a worker over the inherited transport.
    pub fn new(operations: &'a [OperationDef]) -> Self {
        match detect_transport() {
            #[cfg(unix)]
            IpcTransport::Fds { read_fd, write_fd } => {
                // SAFETY: the supervisor dup2'ed both ends onto these fds
                // before exec and nothing else in this process owns them.
                let read_file = unsafe { std::fs::File::from_raw_fd(read_fd) };
                let write_file = unsafe { std::fs::File::from_raw_fd(write_fd) };
                Self::with_io(operations, Box::new(read_file), Box::new(write_file))
            }
            IpcTransport::Stdio => Self::with_io(
                operations,
                Box::new(std::io::stdin()),
                Box::new(std::io::stdout()),
            ),
        }
    }
}

impl<'a, R: Read, W: Write> WorkerMain<'a, R, W> {
    /// Create a worker over an explicit reader/writer pair.
    pub fn with_io(operations: &'a [OperationDef], reader: R, writer: W) -> Self {
        Self {
            operations,
            reader: FrameReader::new(reader),
            writer: FrameWriter::new(writer),
        }
    }

    /// Serve commands until `Shutdown` or the supervisor hangs up.
    pub fn run(&mut self) -> anyhow::Result<()> {
        self.writer
            .send(&WorkerMessage::Hello(WorkerCapabilities::default()))?;

        // The starting core is always in our affinity mask; a fixed core
        // such as 0 may not be under a restricted cpuset. Forks run one at
        // a time, so they never contend for it. Unpinned on failure.
        if let Ok(cpu) = current_cpu() {
            let _ = pin_to_cpu(cpu);
        }

        loop {
            match self.reader.recv::<SupervisorCommand>() {
                Ok(SupervisorCommand::Run { label, config }) => self.run_one(&label, &config)?,
                Ok(SupervisorCommand::Shutdown) | Err(FrameError::Closed) => break,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }

    fn run_one(&mut self, label: &str, config: &BenchmarkConfig) -> anyhow::Result<()> {
        if let Err(message) = config.validate() {
            return self.fail(FailureKind::Protocol, message);
        }

        let Some(def) = find_operation(self.operations, label) else {
            return self.fail(
                FailureKind::UnknownLabel,
                format!("no operation registered as {label:?}"),
            );
        };

        let writer = &mut self.writer;
        let outcome = run_fork(def, config, |event| {
            let message = match event {
                PhaseEvent::IterationComplete {
                    phase,
                    index,
                    invocations,
                    elapsed_nanos,
                } => WorkerMessage::IterationComplete {
                    phase,
                    index,
                    invocations,
                    elapsed_nanos,
                },
                PhaseEvent::WarmupComplete {
                    iterations,
                    invocations,
                } => WorkerMessage::WarmupComplete {
                    iterations,
                    invocations,
                },
            };
            writer.send(&message)?;
            Ok(())
        });

        match outcome {
            Ok(result) => {
                let mut batcher = SampleBatcher::new();
                for sample in result.samples {
                    if let Some(batch) = batcher.push(sample) {
                        self.writer.send(&WorkerMessage::SampleBatch(batch))?;
                    }
                }
                if let Some(batch) = batcher.flush() {
                    self.writer.send(&WorkerMessage::SampleBatch(batch))?;
                }

                self.writer.send(&WorkerMessage::Complete {
                    total_invocations: result.invocations,
                    total_duration_nanos: result.total_time_ns,
                })?;
                Ok(())
            }
            Err(PhaseError::Sink(e)) => Err(e),
            Err(e @ PhaseError::Setup(_)) => self.fail(FailureKind::Setup, e.to_string()),
            Err(e @ PhaseError::Operation { .. }) => {
                self.fail(FailureKind::Operation, e.to_string())
            }
            Err(PhaseError::Panic(message)) => self.fail(FailureKind::Panic, message),
        }
    }

    fn fail(&mut self, kind: FailureKind, message: String) -> anyhow::Result<()> {
        self.writer.send(&WorkerMessage::Failure { kind, message })?;
        Ok(())
    }
}
