#![warn(missing_docs)]
//! SdxBench IPC Protocol
//!
//! rkyv-framed messages between the benchmark supervisor and its fork
//! workers: run commands go down, iteration progress and samples come back.

mod batcher;
mod framing;
mod messages;

pub use batcher::SampleBatcher;
pub use framing::{FrameError, FrameReader, FrameWriter, MAX_FRAME_SIZE, read_frame, write_frame};
pub use messages::{
    BenchmarkConfig, FailureKind, Phase, Sample, SampleBatch, SupervisorCommand,
    WorkerCapabilities, WorkerMessage,
};

/// Protocol version for compatibility checking
pub const PROTOCOL_VERSION: u32 = 1;

/// Maximum samples per batch
pub const MAX_BATCH_SIZE: usize = 10_000;

/// Environment variable carrying the worker's `read_fd,write_fd` pair
pub const IPC_FD_ENV: &str = "SDX_IPC_FD";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_size() {
        assert_eq!(std::mem::size_of::<Sample>(), 16);
    }

    #[test]
    fn test_sample_alignment() {
        assert_eq!(std::mem::align_of::<Sample>(), 8);
    }

    #[test]
    fn test_full_batch_fits_in_a_frame() {
        assert!(MAX_BATCH_SIZE * std::mem::size_of::<Sample>() < MAX_FRAME_SIZE);
    }
}
